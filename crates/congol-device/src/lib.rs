//! Device context seam for the congol graphics layer.
//!
//! This crate defines the [`GlDevice`] trait, the set of OpenGL primitives the
//! resource layer issues: object allocation, binding, data upload, attribute
//! layout and draw calls. Two implementations are provided:
//!
//! - [`NativeGl`] forwards every call to the driver through the `gl` crate and
//!   assumes a context is already current on the calling thread.
//! - [`RecordingDevice`] keeps everything in memory and logs each command,
//!   which lets the upper layers run headless.

pub mod device;
pub mod kind;
pub mod native;
pub mod recording;
pub mod validate;

pub use device::GlDevice;
pub use kind::{BufferUsage, PrimitiveMode, ResourceKind, UNALLOCATED};
pub use native::NativeGl;
pub use recording::{Command, RecordingDevice};

pub use gl::types::{GLenum, GLint, GLsizei, GLuint};
