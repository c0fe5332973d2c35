//! Free vertices drawn through an index buffer.

use std::rc::Rc;

use congol_device::{GLsizei, PrimitiveMode};

use crate::attribute::{AttributeBuffer, Stream};
use crate::collab::{Camera, ShaderProgram};
use crate::color::Color;
use crate::context::RenderContext;
use crate::error::{GfxError, Result};
use crate::shape::plan::{DrawPlan, IndexSelection};
use crate::shape::{CompositeShape, PositionColor, StreamSet};
use crate::vertex::VertexAttribute;

/// Position + color vertices with a `u32` element buffer kept in the same
/// vertex array.
#[derive(Debug)]
pub struct VertexShape<V: VertexAttribute> {
    shape: CompositeShape<PositionColor<V>>,
    indices: AttributeBuffer<u32>,
}

impl<V: VertexAttribute> VertexShape<V> {
    pub fn new(
        ctx: &Rc<RenderContext>,
        camera: Rc<dyn Camera>,
        shader: ShaderProgram,
    ) -> Result<Self> {
        Ok(Self {
            shape: CompositeShape::new(ctx, camera, shader)?,
            indices: AttributeBuffer::element_buffer(ctx)?,
        })
    }

    pub fn shape(&self) -> &CompositeShape<PositionColor<V>> {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut CompositeShape<PositionColor<V>> {
        &mut self.shape
    }

    pub fn indices(&self) -> &AttributeBuffer<u32> {
        &self.indices
    }

    pub fn indices_mut(&mut self) -> &mut AttributeBuffer<u32> {
        &mut self.indices
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn push_vertex(&mut self, position: V, color: Color) -> Result<()> {
        self.shape.push_back((position, color))
    }

    pub fn erase_vertex(&mut self, index: usize) -> Result<()> {
        self.shape.erase(index)
    }

    pub fn push_index(&mut self, index: u32) -> Result<()> {
        self.indices.push_back(index)
    }

    /// Replace the index list and upload it.
    pub fn set_indices(&mut self, indices: &[u32]) -> Result<()> {
        self.indices.set_values(indices);
        self.indices.flush()
    }

    /// Upload vertices and indices in full.
    pub fn flush(&mut self) -> Result<()> {
        self.shape.flush()?;
        self.indices.flush()
    }

    /// Attach the vertex streams to `position`/`color` and the element
    /// buffer to the vertex array.
    pub fn initialize(&mut self, instanced: bool) -> Result<()> {
        let shader = self.shape.shader();
        let indices = &mut self.indices;
        self.shape.with_vertex_array(|streams| {
            streams.initialize(shader, instanced)?;
            indices.initialize_at(0, false, 1)
        })
    }

    /// Draw the index range picked by `selection`, one `glDrawElements`
    /// per planned call, with the vertex array bound.
    pub fn draw_indexed(
        &self,
        mode: PrimitiveMode,
        selection: IndexSelection,
        single_draw_amount: u32,
    ) -> Result<()> {
        let index_count = u32::try_from(self.indices.len()).map_err(|_| {
            GfxError::CountOverflow {
                what: "index buffer length",
            }
        })?;
        let plan = DrawPlan::resolve(selection, single_draw_amount, index_count)?;
        tracing::trace!(?plan, "draw indexed");
        let calls = plan
            .calls()
            .into_iter()
            .map(|call| {
                let count = GLsizei::try_from(call.count).map_err(|_| GfxError::CountOverflow {
                    what: "indexed draw count",
                })?;
                Ok((count, call.byte_offset()))
            })
            .collect::<Result<Vec<_>>>()?;
        let device = self.shape.context().device();
        self.shape.vertex_array().bound(|| {
            for (count, offset) in calls {
                device.draw_elements(mode.as_gl(), count, offset);
            }
        })
    }

    /// Copy into new device objects, re-attaching the element buffer to
    /// the new vertex array.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self {
            shape: self.shape.try_clone()?,
            indices: self.indices.try_clone()?,
        };
        let indices = &mut copy.indices;
        copy.shape.with_vertex_array(|_| indices.rebind())?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::FixedStepCamera;
    use congol_device::{Command, RecordingDevice, ResourceKind};
    use glam::Vec2;

    fn setup() -> (Rc<RecordingDevice>, VertexShape<Vec2>) {
        let device = Rc::new(RecordingDevice::new());
        device.define_attribute(1, "position", 0);
        device.define_attribute(1, "color", 1);
        let ctx = RenderContext::new(device.clone());
        let shape = VertexShape::new(
            &ctx,
            Rc::new(FixedStepCamera::default()),
            ShaderProgram::new(1),
        )
        .unwrap();
        (device, shape)
    }

    fn element_draws(device: &RecordingDevice) -> Vec<(i32, usize)> {
        device
            .draws()
            .into_iter()
            .filter_map(|c| match c {
                Command::DrawElements {
                    count, byte_offset, ..
                } => Some((count, byte_offset)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn initialize_leaves_element_buffer_in_vao() {
        let (device, mut shape) = setup();
        shape.push_vertex(Vec2::ZERO, Color::WHITE).unwrap();
        shape.set_indices(&[0, 0, 0]).unwrap();
        device.clear_commands();

        shape.initialize(false).unwrap();
        let vao = shape.shape().vertex_array().id();
        let ebo = shape.indices().handle().id();
        let commands = device.commands();
        let attach = commands.iter().position(|c| {
            *c == Command::Bind {
                kind: ResourceKind::Buffer,
                target: gl::ELEMENT_ARRAY_BUFFER,
                id: ebo,
            }
        });
        let vao_off = commands.iter().rposition(|c| {
            *c == Command::Bind {
                kind: ResourceKind::VertexArray,
                target: 0,
                id: 0,
            }
        });
        assert!(attach.unwrap() < vao_off.unwrap());
        assert_eq!(
            commands.last(),
            Some(&Command::Bind {
                kind: ResourceKind::VertexArray,
                target: 0,
                id: 0,
            })
        );
        assert_ne!(vao, 0);
        assert_eq!(device.contents(ebo).unwrap().len(), 12);
    }

    #[test]
    fn draw_indexed_follows_plan() {
        let (device, mut shape) = setup();
        shape.set_indices(&(0..10).collect::<Vec<u32>>()).unwrap();

        shape
            .draw_indexed(PrimitiveMode::Triangles, IndexSelection::all(), 3)
            .unwrap();
        assert_eq!(element_draws(&device), vec![(10, 0)]);
        device.clear_commands();

        shape
            .draw_indexed(PrimitiveMode::Triangles, IndexSelection::batch(2), 3)
            .unwrap();
        assert_eq!(element_draws(&device), vec![(3, 24)]);
        device.clear_commands();

        shape
            .draw_indexed(PrimitiveMode::LineStrip, IndexSelection::chunked(4), 3)
            .unwrap();
        assert_eq!(element_draws(&device), vec![(4, 0), (4, 16), (2, 32)]);
        assert_eq!(device.bound_vertex_array(), 0);
    }

    #[test]
    fn clone_reattaches_indices() {
        let (device, mut shape) = setup();
        shape.push_vertex(Vec2::ONE, Color::BLACK).unwrap();
        shape.set_indices(&[0]).unwrap();
        shape.initialize(false).unwrap();
        device.clear_commands();

        let copy = shape.try_clone().unwrap();
        let ebo = copy.indices().handle().id();
        assert_ne!(ebo, shape.indices().handle().id());
        assert_eq!(device.contents(ebo), Some(vec![0, 0, 0, 0]));
        assert!(device.commands().contains(&Command::Bind {
            kind: ResourceKind::Buffer,
            target: gl::ELEMENT_ARRAY_BUFFER,
            id: ebo,
        }));
        assert_eq!(copy.shape().position(0), Some(Vec2::ONE));
    }

    #[test]
    fn draw_indexed_reports_overflowing_batches() {
        let (device, mut shape) = setup();
        shape.set_indices(&[0, 1, 2, 3, 4, 5]).unwrap();
        device.clear_commands();

        let result = shape.draw_indexed(
            PrimitiveMode::Triangles,
            IndexSelection::batch(1_000_000_000),
            6,
        );
        assert!(matches!(result, Err(GfxError::CountOverflow { .. })));

        let result = shape.draw_indexed(
            PrimitiveMode::Triangles,
            IndexSelection::up_to(1 << 30),
            2,
        );
        assert!(matches!(
            result,
            Err(GfxError::CountOverflow {
                what: "indexed draw count"
            })
        ));
        assert!(device.commands().is_empty());
    }
}
