//! Common interface for issuing resource and draw commands.

use anyhow::Result;
use gl::types::{GLenum, GLint, GLsizei, GLuint};

use crate::kind::{BufferUsage, ResourceKind};

/// The device primitives the resource layer is built on.
///
/// Implementations exist for a live OpenGL context ([`crate::NativeGl`]) and
/// for an in-memory command log ([`crate::RecordingDevice`]).
///
/// Every method executes synchronously on the calling thread. Nothing here is
/// thread-safe; a device is used from the thread that owns the context.
pub trait GlDevice {
    /// Create one object of `kind` and return its name.
    fn create(&self, kind: ResourceKind) -> Result<GLuint>;

    /// Release the object `id`. Never called with [`crate::UNALLOCATED`].
    fn delete(&self, kind: ResourceKind, id: GLuint);

    /// Bind `id` at `target`. Passing `0` unbinds.
    ///
    /// `target` is ignored for vertex arrays.
    fn bind(&self, kind: ResourceKind, target: GLenum, id: GLuint);

    /// Replace the whole storage of the buffer bound at `target`.
    fn buffer_data(&self, target: GLenum, data: &[u8], usage: BufferUsage);

    /// Overwrite `data.len()` bytes at `offset` in the buffer bound at
    /// `target`. No reallocation takes place.
    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]);

    /// Attach buffer `id` to the indexed binding `slot` of `target`.
    fn bind_buffer_base(&self, target: GLenum, slot: GLuint, id: GLuint);

    /// Look up a named vertex attribute in a linked program.
    fn attrib_location(&self, program: GLuint, name: &str) -> Option<GLuint>;

    /// Enable attribute `location` as a tightly packed float stream of
    /// `components` values, sourced from the currently bound array buffer.
    /// With `divisor` set the attribute advances once per instance.
    fn vertex_attrib(&self, location: GLuint, components: GLint, divisor: bool);

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei);

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        instances: GLsizei,
        base_instance: GLuint,
    );

    /// Draw `count` `u32` indices starting `byte_offset` bytes into the bound
    /// element buffer.
    fn draw_elements(&self, mode: GLenum, count: GLsizei, byte_offset: usize);
}
