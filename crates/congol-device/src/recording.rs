//! [`RecordingDevice`]: in-memory device that logs every command.
//!
//! Object names are handed out from a counter, buffer contents are kept per
//! object, and each call is appended to a [`Command`] log. Used to run the
//! resource layer without a GL context.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use gl::types::{GLenum, GLint, GLsizei, GLuint};

use crate::kind::{BufferUsage, ResourceKind};
use crate::GlDevice;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        kind: ResourceKind,
        id: GLuint,
    },
    Delete {
        kind: ResourceKind,
        id: GLuint,
    },
    Bind {
        kind: ResourceKind,
        target: GLenum,
        id: GLuint,
    },
    BufferData {
        target: GLenum,
        id: GLuint,
        bytes: usize,
    },
    BufferSubData {
        target: GLenum,
        id: GLuint,
        offset: usize,
        bytes: usize,
    },
    BindBufferBase {
        target: GLenum,
        slot: GLuint,
        id: GLuint,
    },
    VertexAttrib {
        vao: GLuint,
        buffer: GLuint,
        location: GLuint,
        components: GLint,
        divisor: bool,
    },
    DrawArrays {
        mode: GLenum,
        first: GLint,
        count: GLsizei,
    },
    DrawArraysInstancedBaseInstance {
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    },
    DrawElements {
        mode: GLenum,
        count: GLsizei,
        byte_offset: usize,
    },
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Command::DrawArrays { .. }
                | Command::DrawArraysInstancedBaseInstance { .. }
                | Command::DrawElements { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: Cell<GLuint>,
    fail_next_create: Cell<bool>,
    live: RefCell<HashSet<GLuint>>,
    bindings: RefCell<HashMap<GLenum, GLuint>>,
    vertex_array: Cell<GLuint>,
    contents: RefCell<HashMap<GLuint, Vec<u8>>>,
    attributes: RefCell<HashMap<(GLuint, String), GLuint>>,
    commands: RefCell<Vec<Command>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`GlDevice::create`] call fail.
    pub fn fail_next_create(&self) {
        self.fail_next_create.set(true);
    }

    /// Register a vertex attribute so `attrib_location` can resolve it.
    pub fn define_attribute(&self, program: GLuint, name: &str, location: GLuint) {
        self.attributes
            .borrow_mut()
            .insert((program, name.to_owned()), location);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.borrow_mut().clear();
    }

    /// Number of full uploads recorded.
    pub fn uploads(&self) -> usize {
        self.count(|c| matches!(c, Command::BufferData { .. }))
    }

    /// Number of sub-range updates recorded.
    pub fn partial_updates(&self) -> usize {
        self.count(|c| matches!(c, Command::BufferSubData { .. }))
    }

    /// Draw commands, in submission order.
    pub fn draws(&self) -> Vec<Command> {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.is_draw())
            .cloned()
            .collect()
    }

    /// Current device-side bytes of buffer `id`.
    pub fn contents(&self, id: GLuint) -> Option<Vec<u8>> {
        self.contents.borrow().get(&id).cloned()
    }

    pub fn is_live(&self, id: GLuint) -> bool {
        self.live.borrow().contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    /// Object currently bound at `target`, `0` when nothing is.
    pub fn bound(&self, target: GLenum) -> GLuint {
        self.bindings.borrow().get(&target).copied().unwrap_or(0)
    }

    pub fn bound_vertex_array(&self) -> GLuint {
        self.vertex_array.get()
    }

    fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, command: Command) {
        tracing::trace!(?command, "recorded");
        self.commands.borrow_mut().push(command);
    }
}

impl GlDevice for RecordingDevice {
    fn create(&self, kind: ResourceKind) -> Result<GLuint> {
        if self.fail_next_create.replace(false) {
            bail!("simulated {kind:?} allocation failure");
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.live.borrow_mut().insert(id);
        self.record(Command::Create { kind, id });
        Ok(id)
    }

    fn delete(&self, kind: ResourceKind, id: GLuint) {
        self.live.borrow_mut().remove(&id);
        self.contents.borrow_mut().remove(&id);
        self.record(Command::Delete { kind, id });
    }

    fn bind(&self, kind: ResourceKind, target: GLenum, id: GLuint) {
        match kind {
            ResourceKind::VertexArray => self.vertex_array.set(id),
            _ => {
                self.bindings.borrow_mut().insert(target, id);
            }
        }
        self.record(Command::Bind { kind, target, id });
    }

    fn buffer_data(&self, target: GLenum, data: &[u8], _usage: BufferUsage) {
        let id = self.bound(target);
        self.contents.borrow_mut().insert(id, data.to_vec());
        self.record(Command::BufferData {
            target,
            id,
            bytes: data.len(),
        });
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        let id = self.bound(target);
        {
            let mut contents = self.contents.borrow_mut();
            let storage = contents.entry(id).or_default();
            let end = offset + data.len();
            // A real driver would reject this; keep the log usable instead.
            if storage.len() < end {
                storage.resize(end, 0);
            }
            storage[offset..end].copy_from_slice(data);
        }
        self.record(Command::BufferSubData {
            target,
            id,
            offset,
            bytes: data.len(),
        });
    }

    fn bind_buffer_base(&self, target: GLenum, slot: GLuint, id: GLuint) {
        self.record(Command::BindBufferBase { target, slot, id });
    }

    fn attrib_location(&self, program: GLuint, name: &str) -> Option<GLuint> {
        self.attributes
            .borrow()
            .get(&(program, name.to_owned()))
            .copied()
    }

    fn vertex_attrib(&self, location: GLuint, components: GLint, divisor: bool) {
        self.record(Command::VertexAttrib {
            vao: self.vertex_array.get(),
            buffer: self.bound(gl::ARRAY_BUFFER),
            location,
            components,
            divisor,
        });
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        self.record(Command::DrawArrays { mode, first, count });
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    ) {
        self.record(Command::DrawArraysInstancedBaseInstance {
            mode,
            first,
            count,
            instances,
            base_instance,
        });
    }

    fn draw_elements(&self, mode: GLenum, count: GLsizei, byte_offset: usize) {
        self.record(Command::DrawElements {
            mode,
            count,
            byte_offset,
        });
    }
}
