//! [`NativeGl`]: [`GlDevice`] backed by the current OpenGL context.

use std::ffi::{c_void, CString};
use std::sync::Once;

use anyhow::{anyhow, Result};
use gl::types::{GLenum, GLint, GLsizei, GLsizeiptr, GLuint};

use crate::kind::{BufferUsage, ResourceKind};
use crate::validate::drain_errors;
use crate::GlDevice;

static GL_INIT_ONCE: Once = Once::new();

/// Device that issues real GL calls.
///
/// # Safety
///
/// All methods assume the context the function pointers were loaded for is
/// current on the calling thread. Using it anywhere else is undefined
/// behavior.
#[derive(Debug, Default)]
pub struct NativeGl {
    check_errors: bool,
}

impl NativeGl {
    /// Load GL function pointers and return a device.
    ///
    /// Function pointers are loaded exactly once per process via `gl_loader`.
    pub fn load() -> Self {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
            tracing::debug!("GL function pointers loaded");
        });

        Self::default()
    }

    /// Drain and log `glGetError` after every call.
    pub fn with_error_checks(mut self, enabled: bool) -> Self {
        self.check_errors = enabled;
        self
    }

    fn check(&self, call: &str) {
        if self.check_errors {
            unsafe {
                drain_errors(call);
            }
        }
    }
}

impl GlDevice for NativeGl {
    fn create(&self, kind: ResourceKind) -> Result<GLuint> {
        let mut id: GLuint = 0;
        unsafe {
            match kind {
                ResourceKind::Buffer | ResourceKind::ShaderStorageBuffer => {
                    gl::GenBuffers(1, &mut id)
                }
                ResourceKind::VertexArray => gl::GenVertexArrays(1, &mut id),
                ResourceKind::Texture => gl::GenTextures(1, &mut id),
                ResourceKind::Framebuffer => gl::GenFramebuffers(1, &mut id),
                ResourceKind::Renderbuffer => gl::GenRenderbuffers(1, &mut id),
            }
        }
        self.check("create");

        if id == 0 {
            return Err(anyhow!("driver returned no {kind:?} object"));
        }
        Ok(id)
    }

    fn delete(&self, kind: ResourceKind, id: GLuint) {
        unsafe {
            match kind {
                ResourceKind::Buffer | ResourceKind::ShaderStorageBuffer => {
                    gl::DeleteBuffers(1, &id)
                }
                ResourceKind::VertexArray => gl::DeleteVertexArrays(1, &id),
                ResourceKind::Texture => gl::DeleteTextures(1, &id),
                ResourceKind::Framebuffer => gl::DeleteFramebuffers(1, &id),
                ResourceKind::Renderbuffer => gl::DeleteRenderbuffers(1, &id),
            }
        }
        self.check("delete");
    }

    fn bind(&self, kind: ResourceKind, target: GLenum, id: GLuint) {
        unsafe {
            match kind {
                ResourceKind::VertexArray => gl::BindVertexArray(id),
                ResourceKind::Texture => gl::BindTexture(target, id),
                ResourceKind::Framebuffer => gl::BindFramebuffer(target, id),
                ResourceKind::Renderbuffer => gl::BindRenderbuffer(target, id),
                ResourceKind::Buffer | ResourceKind::ShaderStorageBuffer => {
                    gl::BindBuffer(target, id)
                }
            }
        }
        self.check("bind");
    }

    fn buffer_data(&self, target: GLenum, data: &[u8], usage: BufferUsage) {
        unsafe {
            gl::BufferData(
                target,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
                usage.as_gl(),
            );
        }
        self.check("buffer_data");
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target,
                offset as gl::types::GLintptr,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            );
        }
        self.check("buffer_sub_data");
    }

    fn bind_buffer_base(&self, target: GLenum, slot: GLuint, id: GLuint) {
        unsafe {
            gl::BindBufferBase(target, slot, id);
        }
        self.check("bind_buffer_base");
    }

    fn attrib_location(&self, program: GLuint, name: &str) -> Option<GLuint> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetAttribLocation(program, name.as_ptr()) };
        self.check("attrib_location");
        GLuint::try_from(location).ok()
    }

    fn vertex_attrib(&self, location: GLuint, components: GLint, divisor: bool) {
        unsafe {
            gl::EnableVertexAttribArray(location);
            gl::VertexAttribPointer(
                location,
                components,
                gl::FLOAT,
                gl::FALSE,
                0,
                std::ptr::null(),
            );
            if divisor {
                gl::VertexAttribDivisor(location, 1);
            }
        }
        self.check("vertex_attrib");
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe {
            gl::DrawArrays(mode, first, count);
        }
        self.check("draw_arrays");
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    ) {
        unsafe {
            gl::DrawArraysInstancedBaseInstance(mode, first, count, instances, base_instance);
        }
        self.check("draw_arrays_instanced_base_instance");
    }

    fn draw_elements(&self, mode: GLenum, count: GLsizei, byte_offset: usize) {
        unsafe {
            gl::DrawElements(
                mode,
                count,
                gl::UNSIGNED_INT,
                byte_offset as *const c_void,
            );
        }
        self.check("draw_elements");
    }
}
