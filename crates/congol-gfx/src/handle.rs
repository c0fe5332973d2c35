//! [`ResourceHandle`]: ownership of exactly one device object.
//!
//! A handle allocates its object when constructed and releases it when
//! dropped. Copying a handle ([`ResourceHandle::try_clone`]) allocates a new
//! object and never aliases; moving it ([`ResourceHandle::take`]) transfers
//! the object name and leaves the source unallocated.

use std::rc::Rc;

use congol_device::{GLenum, GLuint, ResourceKind, UNALLOCATED};

use crate::context::RenderContext;
use crate::error::{GfxError, Result};

pub struct ResourceHandle {
    ctx: Rc<RenderContext>,
    kind: ResourceKind,
    target: GLenum,
    /// Indexed binding slot, shader-storage buffers only.
    slot: Option<GLuint>,
    id: GLuint,
    /// Bytes transmitted by the last full upload.
    capacity: usize,
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("slot", &self.slot)
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ResourceHandle {
    /// Allocate an object of `kind` bound at the kind's default target.
    pub fn new(ctx: &Rc<RenderContext>, kind: ResourceKind) -> Result<Self> {
        Self::with_target(ctx, kind, kind.default_target())
    }

    /// Allocate an object of `kind` bound at an explicit `target`, e.g. a
    /// buffer used as `GL_ELEMENT_ARRAY_BUFFER`.
    pub fn with_target(
        ctx: &Rc<RenderContext>,
        kind: ResourceKind,
        target: GLenum,
    ) -> Result<Self> {
        let mut handle = Self::unallocated(ctx, kind, target);
        handle.allocate()?;
        Ok(handle)
    }

    /// Allocate a shader-storage buffer attached to binding `slot` after
    /// every upload.
    ///
    /// Shader-storage handles built through [`ResourceHandle::new`] use
    /// slot 0.
    pub fn storage(ctx: &Rc<RenderContext>, slot: GLuint) -> Result<Self> {
        let kind = ResourceKind::ShaderStorageBuffer;
        let mut handle = Self::unallocated(ctx, kind, kind.default_target());
        handle.slot = Some(slot);
        handle.allocate()?;
        Ok(handle)
    }

    fn unallocated(ctx: &Rc<RenderContext>, kind: ResourceKind, target: GLenum) -> Self {
        Self {
            ctx: Rc::clone(ctx),
            kind,
            target,
            slot: (kind == ResourceKind::ShaderStorageBuffer).then_some(0),
            id: UNALLOCATED,
            capacity: 0,
        }
    }

    /// Kind of the owned object.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Binding point used by [`ResourceHandle::bind`] and uploads.
    pub fn target(&self) -> GLenum {
        self.target
    }

    /// Indexed shader-storage slot, `None` for every other kind.
    pub fn slot(&self) -> Option<GLuint> {
        self.slot
    }

    /// Object name, [`UNALLOCATED`] when the handle owns nothing.
    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn is_allocated(&self) -> bool {
        self.id != UNALLOCATED
    }

    /// Bytes sent by the most recent full upload.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Context the object was allocated in.
    pub fn context(&self) -> &Rc<RenderContext> {
        &self.ctx
    }

    /// Request a fresh object from the device, releasing any current one.
    pub fn allocate(&mut self) -> Result<()> {
        self.free();
        let id = self
            .ctx
            .device()
            .create(self.kind)
            .map_err(|source| GfxError::Allocation {
                kind: self.kind,
                source,
            })?;
        tracing::trace!(kind = ?self.kind, id, "allocated");
        self.id = id;
        Ok(())
    }

    /// Release the object. Calling this on an unallocated handle does nothing.
    pub fn free(&mut self) {
        if self.id == UNALLOCATED {
            return;
        }
        tracing::trace!(kind = ?self.kind, id = self.id, "freed");
        self.ctx.device().delete(self.kind, self.id);
        self.id = UNALLOCATED;
        self.capacity = 0;
    }

    /// Bind the object at its target.
    pub fn bind(&self) -> Result<()> {
        self.ensure_allocated("bind")?;
        self.ctx.device().bind(self.kind, self.target, self.id);
        Ok(())
    }

    /// Bind object 0 at this handle's target.
    pub fn unbind(&self) {
        self.ctx.device().bind(self.kind, self.target, UNALLOCATED);
    }

    /// Run `f` with this object bound, unbinding afterwards.
    pub fn bound<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.bind()?;
        let result = f();
        self.unbind();
        Ok(result)
    }

    /// Replace the object's whole storage with `data`.
    pub fn upload(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_allocated("upload")?;
        self.ensure_storage("upload")?;
        let usage = self.ctx.config().usage;
        self.bound(|| self.ctx.device().buffer_data(self.target, data, usage))?;
        self.attach_slot();
        self.capacity = data.len();
        tracing::trace!(kind = ?self.kind, id = self.id, bytes = data.len(), "upload");
        Ok(())
    }

    /// Overwrite `data.len()` bytes starting at `offset` without reallocating.
    ///
    /// The range must lie within the last full upload.
    pub fn partial_update(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.ensure_allocated("partial update")?;
        self.ensure_storage("partial update")?;
        if offset + data.len() > self.capacity {
            return Err(GfxError::CapacityExceeded {
                offset,
                size: data.len(),
                capacity: self.capacity,
            });
        }
        self.bound(|| self.ctx.device().buffer_sub_data(self.target, offset, data))?;
        self.attach_slot();
        tracing::trace!(
            kind = ?self.kind,
            id = self.id,
            offset,
            bytes = data.len(),
            "partial update"
        );
        Ok(())
    }

    /// Attach a shader-storage buffer to its indexed slot.
    pub(crate) fn attach_slot(&self) {
        if let Some(slot) = self.slot {
            self.ctx.device().bind_buffer_base(self.target, slot, self.id);
        }
    }

    fn ensure_allocated(&self, operation: &'static str) -> Result<()> {
        if self.is_allocated() {
            Ok(())
        } else {
            Err(GfxError::Unallocated {
                kind: self.kind,
                operation,
            })
        }
    }

    fn ensure_storage(&self, operation: &'static str) -> Result<()> {
        if self.kind.has_storage() {
            Ok(())
        } else {
            Err(GfxError::Unsupported {
                kind: self.kind,
                operation,
            })
        }
    }

    /// Copy: a new handle of the same kind, target and slot owning a freshly
    /// allocated object.
    ///
    /// Device contents are not copied; the new object is empty until it is
    /// uploaded to.
    pub fn try_clone(&self) -> Result<Self> {
        let mut handle = Self::unallocated(&self.ctx, self.kind, self.target);
        handle.slot = self.slot;
        handle.allocate()?;
        Ok(handle)
    }

    /// Copy-assign: release the current object and allocate a new one,
    /// taking over `other`'s target and slot. Contents are not copied.
    pub fn clone_from_handle(&mut self, other: &ResourceHandle) -> Result<()> {
        self.free();
        self.kind = other.kind;
        self.target = other.target;
        self.slot = other.slot;
        self.allocate()
    }

    /// Move: transfer the object into a new handle, leaving `self`
    /// unallocated.
    pub fn take(&mut self) -> Result<Self> {
        if !self.is_allocated() {
            return Err(GfxError::MoveUnallocated { kind: self.kind });
        }
        let mut handle = Self::unallocated(&self.ctx, self.kind, self.target);
        handle.slot = self.slot;
        handle.id = std::mem::replace(&mut self.id, UNALLOCATED);
        handle.capacity = std::mem::take(&mut self.capacity);
        Ok(handle)
    }

    /// Move-assign: release the current object and take over `other`'s,
    /// leaving `other` unallocated.
    pub fn assign_from(&mut self, other: &mut ResourceHandle) -> Result<()> {
        let moved = other.take()?;
        self.free();
        self.kind = moved.kind;
        self.target = moved.target;
        self.slot = moved.slot;
        self.capacity = moved.capacity;
        self.id = moved.into_raw();
        Ok(())
    }

    /// Give up ownership of the object name without releasing it.
    fn into_raw(mut self) -> GLuint {
        std::mem::replace(&mut self.id, UNALLOCATED)
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.free();
    }
}
