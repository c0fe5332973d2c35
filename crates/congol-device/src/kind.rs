//! Object kinds, usage hints and draw modes.

use gl::types::{GLenum, GLuint};
use num_derive::{FromPrimitive, ToPrimitive};

/// Object name reported by a handle that owns no device object.
pub const UNALLOCATED: GLuint = 0;

/// The kinds of device object a resource handle can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    VertexArray,
    ShaderStorageBuffer,
    Texture,
    Framebuffer,
    Renderbuffer,
}

impl ResourceKind {
    /// Binding point used when no explicit target is requested.
    ///
    /// Vertex arrays have no target; they are bound with
    /// `glBindVertexArray` and report `0` here.
    pub fn default_target(self) -> GLenum {
        match self {
            ResourceKind::Buffer => gl::ARRAY_BUFFER,
            ResourceKind::VertexArray => 0,
            ResourceKind::ShaderStorageBuffer => gl::SHADER_STORAGE_BUFFER,
            ResourceKind::Texture => gl::TEXTURE_2D,
            ResourceKind::Framebuffer => gl::FRAMEBUFFER,
            ResourceKind::Renderbuffer => gl::RENDERBUFFER,
        }
    }

    /// Whether objects of this kind carry byte storage that can be uploaded.
    pub fn has_storage(self) -> bool {
        matches!(
            self,
            ResourceKind::Buffer | ResourceKind::ShaderStorageBuffer
        )
    }
}

/// Usage hint passed along with every full buffer upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

impl BufferUsage {
    pub fn as_gl(self) -> GLenum {
        match self {
            BufferUsage::StaticDraw => gl::STATIC_DRAW,
            BufferUsage::DynamicDraw => gl::DYNAMIC_DRAW,
            BufferUsage::StreamDraw => gl::STREAM_DRAW,
        }
    }
}

/// Primitive topology for draw calls.
///
/// Discriminants are the GL enum values, so a raw mode coming from a
/// collaborator converts with [`num_traits::FromPrimitive::from_u32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum PrimitiveMode {
    Points = gl::POINTS,
    Lines = gl::LINES,
    LineLoop = gl::LINE_LOOP,
    LineStrip = gl::LINE_STRIP,
    Triangles = gl::TRIANGLES,
    TriangleStrip = gl::TRIANGLE_STRIP,
    TriangleFan = gl::TRIANGLE_FAN,
}

impl PrimitiveMode {
    pub fn as_gl(self) -> GLenum {
        self as GLenum
    }
}
