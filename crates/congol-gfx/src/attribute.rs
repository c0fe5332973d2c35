//! Attribute buffers: a device buffer paired with a client-side mirror.
//!
//! [`AttributeBuffer`] keeps a `Vec<T>` mirror of one vertex-attribute stream
//! and pushes every edit to the device right away, unless the context is
//! batching. Reads are always served from the mirror.
//!
//! [`ScalarAttribute`] holds a single value for binding points that are not
//! per-vertex streams. It never talks to the device.

use std::ops::Range;
use std::rc::Rc;

use bytemuck::Pod;
use congol_device::{GLint, GLuint, ResourceKind};

use crate::collab::ShaderProgram;
use crate::context::RenderContext;
use crate::error::{GfxError, Result};
use crate::handle::ResourceHandle;

/// Where a stream is attached in the vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeBinding {
    /// A named attribute resolved against a shader program.
    Named { program: ShaderProgram, name: String },
    /// A fixed `layout(location = N)`.
    Location(GLuint),
}

/// Vertex layout remembered by an initialised buffer, so it can be applied
/// again to a new vertex array after a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub binding: AttributeBinding,
    pub components: GLint,
    pub divisor: bool,
}

/// Shared get/set capability of vector and scalar attributes.
pub trait Attribute<T> {
    fn get(&self, index: usize) -> Option<T>;
    fn set(&mut self, index: usize, value: T) -> Result<()>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Type-erased per-element operations a shape coordinates across its
/// streams.
pub trait Stream {
    fn len(&self) -> usize;
    fn erase(&mut self, index: usize) -> Result<()>;
    fn erase_range(&mut self, range: Range<usize>) -> Result<()>;
    fn reserve(&mut self, additional: usize);
    fn flush(&mut self) -> Result<()>;
    fn flush_element(&mut self, index: usize) -> Result<()>;
    /// Attach to `layout` in the vertex array bound right now and upload.
    fn initialize(&mut self, layout: AttributeLayout) -> Result<()>;
    /// Re-apply the remembered layout to the vertex array bound right now.
    fn rebind(&mut self) -> Result<()>;
    fn handle(&self) -> &ResourceHandle;
}

/// Vector-mode attribute buffer.
pub struct AttributeBuffer<T: Pod> {
    handle: ResourceHandle,
    values: Vec<T>,
    layout: Option<AttributeLayout>,
    /// The mirror changed since the last full upload in a way a single
    /// element update cannot repair.
    stale: bool,
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for AttributeBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeBuffer")
            .field("handle", &self.handle)
            .field("values", &self.values)
            .field("layout", &self.layout)
            .field("stale", &self.stale)
            .finish()
    }
}

impl<T: Pod> AttributeBuffer<T> {
    /// Empty buffer over a new array buffer.
    pub fn new(ctx: &Rc<RenderContext>) -> Result<Self> {
        Ok(Self::from_handle(ResourceHandle::new(ctx, ResourceKind::Buffer)?))
    }

    /// Empty buffer over a new object of `kind` at its default target.
    pub fn with_kind(ctx: &Rc<RenderContext>, kind: ResourceKind) -> Result<Self> {
        Ok(Self::from_handle(ResourceHandle::new(ctx, kind)?))
    }

    /// Empty buffer over an existing handle.
    pub fn from_handle(handle: ResourceHandle) -> Self {
        Self {
            handle,
            values: Vec::new(),
            layout: None,
            stale: false,
        }
    }

    /// Empty `u32` index buffer bound at `GL_ELEMENT_ARRAY_BUFFER`.
    pub fn element_buffer(ctx: &Rc<RenderContext>) -> Result<Self> {
        let handle =
            ResourceHandle::with_target(ctx, ResourceKind::Buffer, gl::ELEMENT_ARRAY_BUFFER)?;
        Ok(Self::from_handle(handle))
    }

    /// Empty buffer over a shader-storage object attached to `slot`.
    pub fn storage(ctx: &Rc<RenderContext>, slot: GLuint) -> Result<Self> {
        Ok(Self::from_handle(ResourceHandle::storage(ctx, slot)?))
    }

    /// Buffer holding one initial element.
    pub fn with_value(ctx: &Rc<RenderContext>, value: T) -> Result<Self> {
        let mut buffer = Self::new(ctx)?;
        buffer.push_back(value)?;
        Ok(buffer)
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Layout applied by the last `initialize*` call.
    pub fn layout(&self) -> Option<&AttributeLayout> {
        self.layout.as_ref()
    }

    /// Whether the device copy lags behind the mirror.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn syncing(&self) -> bool {
        !self.handle.context().is_batching()
    }

    /// Full upload outside a batch; inside one, remember that the device
    /// copy is out of date.
    fn sync_all(&mut self) -> Result<()> {
        if self.syncing() {
            self.flush()
        } else {
            self.stale = true;
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_value(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Append `value`. Outside a batch the whole mirror is re-uploaded.
    pub fn push_back(&mut self, value: T) -> Result<()> {
        self.values.push(value);
        self.sync_all()
    }

    /// Replace element `index`. Outside a batch only that element's bytes
    /// are sent.
    pub fn set_value(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(GfxError::IndexOutOfRange { index, len })?;
        *slot = value;
        if self.syncing() {
            self.flush_element(index)
        } else {
            self.stale = true;
            Ok(())
        }
    }

    /// Remove element `index`, shifting the rest down.
    pub fn erase(&mut self, index: usize) -> Result<()> {
        if index >= self.values.len() {
            return Err(GfxError::IndexOutOfRange {
                index,
                len: self.values.len(),
            });
        }
        self.values.remove(index);
        self.sync_all()
    }

    /// Remove `range`. Erasing everything clears without shifting.
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.values.len())?;
        if range.start == 0 && range.end == self.values.len() {
            self.values.clear();
        } else {
            self.values.drain(range);
        }
        self.sync_all()
    }

    /// Replace the mirror. Not uploaded until [`AttributeBuffer::flush`].
    pub fn set_values(&mut self, values: &[T]) {
        self.values.clear();
        self.values.extend_from_slice(values);
        self.stale = true;
    }

    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    /// Resize with zeroed elements. Not uploaded.
    pub fn resize(&mut self, len: usize) {
        self.values.resize(len, T::zeroed());
        self.stale = true;
    }

    /// Resize, filling new slots with `value`. Not uploaded.
    pub fn resize_with_value(&mut self, len: usize, value: T) {
        self.values.resize(len, value);
        self.stale = true;
    }

    /// Upload the whole mirror.
    pub fn flush(&mut self) -> Result<()> {
        self.handle.upload(bytemuck::cast_slice(&self.values))?;
        self.stale = false;
        Ok(())
    }

    /// Upload element `index` only.
    ///
    /// Falls back to a full upload when the device copy no longer matches
    /// the mirror's layout: edits made during a batch (appends, erases,
    /// resizes) or a device buffer of a different length.
    pub fn flush_element(&mut self, index: usize) -> Result<()> {
        let value = self.values.get(index).ok_or(GfxError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })?;
        let size = std::mem::size_of::<T>();
        if self.stale || self.handle.capacity() != self.values.len() * size {
            return self.flush();
        }
        self.handle.partial_update(index * size, bytemuck::bytes_of(value))
    }

    /// Attach this buffer to the named attribute of `program` in the vertex
    /// array bound right now, then upload the mirror.
    pub fn initialize_named(
        &mut self,
        program: ShaderProgram,
        name: &str,
        divisor: bool,
        components: GLint,
    ) -> Result<()> {
        self.initialize(AttributeLayout {
            binding: AttributeBinding::Named {
                program,
                name: name.to_owned(),
            },
            components,
            divisor,
        })
    }

    /// Attach this buffer to a fixed attribute location, then upload.
    pub fn initialize_at(
        &mut self,
        location: GLuint,
        divisor: bool,
        components: GLint,
    ) -> Result<()> {
        self.initialize(AttributeLayout {
            binding: AttributeBinding::Location(location),
            components,
            divisor,
        })
    }

    /// Attach with an explicit layout, see [`AttributeBuffer::initialize_named`].
    pub fn initialize(&mut self, layout: AttributeLayout) -> Result<()> {
        if self.handle.target() == gl::ELEMENT_ARRAY_BUFFER {
            // Unbinding an element buffer detaches it from the bound vertex
            // array, so upload first and leave it bound.
            self.flush()?;
            attach_layout(&self.handle, &layout)?;
        } else {
            attach_layout(&self.handle, &layout)?;
            self.flush()?;
        }
        self.layout = Some(layout);
        Ok(())
    }

    /// Copy into a newly allocated device object and re-upload the mirror.
    ///
    /// The layout is carried over but not applied; the owner applies it
    /// inside its own vertex array with [`Stream::rebind`].
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self {
            handle: self.handle.try_clone()?,
            values: self.values.clone(),
            layout: self.layout.clone(),
            stale: true,
        };
        copy.flush()?;
        Ok(copy)
    }
}

impl<T: Pod> Attribute<T> for AttributeBuffer<T> {
    fn get(&self, index: usize) -> Option<T> {
        self.get_value(index)
    }

    fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.set_value(index, value)
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T: Pod> Stream for AttributeBuffer<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn erase(&mut self, index: usize) -> Result<()> {
        AttributeBuffer::erase(self, index)
    }

    fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        AttributeBuffer::erase_range(self, range)
    }

    fn reserve(&mut self, additional: usize) {
        AttributeBuffer::reserve(self, additional)
    }

    fn flush(&mut self) -> Result<()> {
        AttributeBuffer::flush(self)
    }

    fn flush_element(&mut self, index: usize) -> Result<()> {
        AttributeBuffer::flush_element(self, index)
    }

    fn initialize(&mut self, layout: AttributeLayout) -> Result<()> {
        AttributeBuffer::initialize(self, layout)
    }

    fn rebind(&mut self) -> Result<()> {
        match &self.layout {
            Some(layout) => attach_layout(&self.handle, layout),
            None => Ok(()),
        }
    }

    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

/// Apply `layout` to `handle` in the vertex array bound right now.
pub(crate) fn attach_layout(handle: &ResourceHandle, layout: &AttributeLayout) -> Result<()> {
    let device = handle.context().device();
    match handle.kind() {
        // Storage buffers are addressed through their slot, not a vertex
        // pointer; the slot is attached on upload.
        ResourceKind::ShaderStorageBuffer => Ok(()),
        // The element binding is vertex array state; leave it bound.
        _ if handle.target() == gl::ELEMENT_ARRAY_BUFFER => handle.bind(),
        _ => {
            let location = match &layout.binding {
                AttributeBinding::Location(location) => *location,
                AttributeBinding::Named { program, name } => device
                    .attrib_location(program.id(), name)
                    .ok_or_else(|| GfxError::UnknownAttribute { name: name.clone() })?,
            };
            handle.bound(|| device.vertex_attrib(location, layout.components, layout.divisor))
        }
    }
}

pub(crate) fn check_range(range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(GfxError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}

/// Scalar-mode attribute: exactly one value, no device synchronisation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarAttribute<T: Copy> {
    value: T,
}

impl<T: Copy> ScalarAttribute<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get_value(&self) -> T {
        self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

/// The index is ignored: a scalar has one slot.
impl<T: Copy> Attribute<T> for ScalarAttribute<T> {
    fn get(&self, _index: usize) -> Option<T> {
        Some(self.value)
    }

    fn set(&mut self, _index: usize, value: T) -> Result<()> {
        self.value = value;
        Ok(())
    }

    fn len(&self) -> usize {
        1
    }
}
