//! A single shape held as plain values: one position, one size, and a
//! vertex array set up by the caller.

use std::rc::Rc;

use congol_device::{GLsizei, PrimitiveMode, ResourceKind};

use crate::attribute::ScalarAttribute;
use crate::collab::{Camera, ShaderProgram};
use crate::context::RenderContext;
use crate::error::Result;
use crate::handle::ResourceHandle;
use crate::vertex::VertexAttribute;

pub struct ScalarShape<V: VertexAttribute> {
    vao: ResourceHandle,
    position: ScalarAttribute<V>,
    size: ScalarAttribute<V>,
    camera: Rc<dyn Camera>,
    shader: ShaderProgram,
}

impl<V: VertexAttribute> ScalarShape<V> {
    pub fn new(
        ctx: &Rc<RenderContext>,
        camera: Rc<dyn Camera>,
        shader: ShaderProgram,
        position: V,
        size: V,
    ) -> Result<Self> {
        Ok(Self {
            vao: ResourceHandle::new(ctx, ResourceKind::VertexArray)?,
            position: ScalarAttribute::new(position),
            size: ScalarAttribute::new(size),
            camera,
            shader,
        })
    }

    pub fn context(&self) -> &Rc<RenderContext> {
        self.vao.context()
    }

    pub fn vertex_array(&self) -> &ResourceHandle {
        &self.vao
    }

    pub fn position(&self) -> V {
        self.position.get_value()
    }

    pub fn set_position(&mut self, position: V) {
        self.position.set_value(position);
    }

    pub fn size(&self) -> V {
        self.size.get_value()
    }

    pub fn set_size(&mut self, size: V) {
        self.size.set_value(size);
    }

    pub fn shader(&self) -> ShaderProgram {
        self.shader
    }

    pub fn set_shader(&mut self, shader: ShaderProgram) {
        self.shader = shader;
    }

    pub fn camera(&self) -> &Rc<dyn Camera> {
        &self.camera
    }

    pub fn delta_time(&self) -> f32 {
        self.camera.delta_time()
    }

    /// Bind the vertex array, draw `count` vertices from the start, unbind.
    pub fn draw(&self, mode: PrimitiveMode, count: GLsizei) -> Result<()> {
        let device = self.context().device();
        self.vao.bound(|| device.draw_arrays(mode.as_gl(), 0, count))
    }

    /// Copy into a new vertex array. Position and size are plain values.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            vao: self.vao.try_clone()?,
            position: self.position,
            size: self.size,
            camera: Rc::clone(&self.camera),
            shader: self.shader,
        })
    }
}

impl<V: VertexAttribute + std::fmt::Debug> std::fmt::Debug for ScalarShape<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarShape")
            .field("vao", &self.vao)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("shader", &self.shader)
            .finish()
    }
}
