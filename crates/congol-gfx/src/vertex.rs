//! Element types that can feed a float vertex attribute.

use bytemuck::Pod;
use congol_device::GLint;
use glam::{Vec2, Vec3, Vec4};

use crate::color::Color;

/// A `Pod` value made of `COMPONENTS` tightly packed `f32`s.
pub trait VertexAttribute: Pod {
    const COMPONENTS: GLint;
}

impl VertexAttribute for f32 {
    const COMPONENTS: GLint = 1;
}

impl VertexAttribute for Vec2 {
    const COMPONENTS: GLint = 2;
}

impl VertexAttribute for Vec3 {
    const COMPONENTS: GLint = 3;
}

impl VertexAttribute for Vec4 {
    const COMPONENTS: GLint = 4;
}

impl VertexAttribute for Color {
    const COMPONENTS: GLint = Color::COMPONENTS;
}

impl<const N: usize> VertexAttribute for [f32; N]
where
    [f32; N]: Pod,
{
    const COMPONENTS: GLint = N as GLint;
}
