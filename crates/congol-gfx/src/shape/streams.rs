//! Stream sets for the two shape families: position + size (rectangles,
//! squares, circles drawn per instance) and position + color (free vertices).

use std::rc::Rc;

use crate::attribute::{AttributeBuffer, Stream};
use crate::collab::ShaderProgram;
use crate::color::Color;
use crate::context::RenderContext;
use crate::error::Result;
use crate::shape::{CompositeShape, StreamSet};
use crate::vertex::VertexAttribute;

#[derive(Debug)]
pub struct PositionSize<V: VertexAttribute> {
    pub(crate) position: AttributeBuffer<V>,
    pub(crate) size: AttributeBuffer<V>,
}

impl<V: VertexAttribute> PositionSize<V> {
    pub fn positions(&self) -> &AttributeBuffer<V> {
        &self.position
    }

    pub fn sizes(&self) -> &AttributeBuffer<V> {
        &self.size
    }
}

impl<V: VertexAttribute> StreamSet for PositionSize<V> {
    type Element = (V, V);

    fn allocate(ctx: &Rc<RenderContext>) -> Result<Self> {
        Ok(Self {
            position: AttributeBuffer::new(ctx)?,
            size: AttributeBuffer::new(ctx)?,
        })
    }

    fn streams(&self) -> Vec<(&'static str, &dyn Stream)> {
        vec![
            ("position", &self.position as &dyn Stream),
            ("size", &self.size as &dyn Stream),
        ]
    }

    fn streams_mut(&mut self) -> Vec<(&'static str, &mut dyn Stream)> {
        vec![
            ("position", &mut self.position as &mut dyn Stream),
            ("size", &mut self.size as &mut dyn Stream),
        ]
    }

    fn push(&mut self, (position, size): (V, V)) -> Result<()> {
        self.position.push_back(position)?;
        self.size.push_back(size)
    }

    fn get(&self, index: usize) -> Option<(V, V)> {
        Some((self.position.get_value(index)?, self.size.get_value(index)?))
    }

    fn resize(&mut self, len: usize) {
        self.position.resize(len);
        self.size.resize(len);
    }

    fn initialize(&mut self, shader: ShaderProgram, instanced: bool) -> Result<()> {
        self.position
            .initialize_named(shader, "position", instanced, V::COMPONENTS)?;
        self.size
            .initialize_named(shader, "size", instanced, V::COMPONENTS)
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            position: self.position.try_clone()?,
            size: self.size.try_clone()?,
        })
    }
}

#[derive(Debug)]
pub struct PositionColor<V: VertexAttribute> {
    pub(crate) position: AttributeBuffer<V>,
    pub(crate) color: AttributeBuffer<Color>,
    /// Fill used for slots added by [`StreamSet::resize`].
    pub(crate) fill: Color,
}

impl<V: VertexAttribute> PositionColor<V> {
    pub fn positions(&self) -> &AttributeBuffer<V> {
        &self.position
    }

    pub fn colors(&self) -> &AttributeBuffer<Color> {
        &self.color
    }

    /// Color given to slots added by a resize.
    pub fn fill(&self) -> Color {
        self.fill
    }
}

impl<V: VertexAttribute> StreamSet for PositionColor<V> {
    type Element = (V, Color);

    fn allocate(ctx: &Rc<RenderContext>) -> Result<Self> {
        Ok(Self {
            position: AttributeBuffer::new(ctx)?,
            color: AttributeBuffer::new(ctx)?,
            fill: Color::WHITE,
        })
    }

    fn streams(&self) -> Vec<(&'static str, &dyn Stream)> {
        vec![
            ("position", &self.position as &dyn Stream),
            ("color", &self.color as &dyn Stream),
        ]
    }

    fn streams_mut(&mut self) -> Vec<(&'static str, &mut dyn Stream)> {
        vec![
            ("position", &mut self.position as &mut dyn Stream),
            ("color", &mut self.color as &mut dyn Stream),
        ]
    }

    fn push(&mut self, (position, color): (V, Color)) -> Result<()> {
        self.position.push_back(position)?;
        self.color.push_back(color)
    }

    fn get(&self, index: usize) -> Option<(V, Color)> {
        Some((self.position.get_value(index)?, self.color.get_value(index)?))
    }

    fn resize(&mut self, len: usize) {
        self.position.resize(len);
        self.color.resize_with_value(len, self.fill);
    }

    fn initialize(&mut self, shader: ShaderProgram, instanced: bool) -> Result<()> {
        self.position
            .initialize_named(shader, "position", instanced, V::COMPONENTS)?;
        self.color
            .initialize_named(shader, "color", instanced, Color::COMPONENTS)
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            position: self.position.try_clone()?,
            color: self.color.try_clone()?,
            fill: self.fill,
        })
    }
}

/// Per-element accessors. Setters send only the touched element unless the
/// context is batching.
impl<V: VertexAttribute> CompositeShape<PositionSize<V>> {
    /// Position of element `index`, from the mirror.
    pub fn position(&self, index: usize) -> Option<V> {
        self.streams.position.get_value(index)
    }

    pub fn set_position(&mut self, index: usize, position: V) -> Result<()> {
        self.streams.position.set_value(index, position)
    }

    /// Size of element `index`, from the mirror.
    pub fn size(&self, index: usize) -> Option<V> {
        self.streams.size.get_value(index)
    }

    pub fn set_size(&mut self, index: usize, size: V) -> Result<()> {
        self.streams.size.set_value(index, size)
    }
}

impl<V: VertexAttribute> CompositeShape<PositionColor<V>> {
    pub fn position(&self, index: usize) -> Option<V> {
        self.streams.position.get_value(index)
    }

    /// Move vertex `index`. Its color is left alone.
    pub fn set_position(&mut self, index: usize, position: V) -> Result<()> {
        self.streams.position.set_value(index, position)
    }

    pub fn color(&self, index: usize) -> Option<Color> {
        self.streams.color.get_value(index)
    }

    /// Recolor vertex `index`. Its position is left alone.
    pub fn set_color(&mut self, index: usize, color: Color) -> Result<()> {
        self.streams.color.set_value(index, color)
    }

    /// Resize, filling new color slots with `color`. Not uploaded.
    pub fn resize_with_color(&mut self, len: usize, color: Color) {
        self.streams.fill = color;
        self.resize(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::FixedStepCamera;
    use congol_device::RecordingDevice;
    use glam::Vec2;

    #[test]
    fn resize_fills_colors() {
        let ctx = RenderContext::new(Rc::new(RecordingDevice::new()));
        let mut shape = CompositeShape::<PositionColor<Vec2>>::new(
            &ctx,
            Rc::new(FixedStepCamera::default()),
            ShaderProgram::new(1),
        )
        .unwrap();
        shape.resize_with_color(3, Color::BLACK);
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.color(2), Some(Color::BLACK));
        assert_eq!(shape.position(2), Some(Vec2::ZERO));
        assert_eq!(shape.get(1), Some((Vec2::ZERO, Color::BLACK)));
        assert_eq!(shape.streams().fill(), Color::BLACK);
    }

    #[test]
    fn setters_leave_other_stream_and_length_alone() {
        let ctx = RenderContext::new(Rc::new(RecordingDevice::new()));
        let mut shape = CompositeShape::<PositionSize<Vec2>>::new(
            &ctx,
            Rc::new(FixedStepCamera::default()),
            ShaderProgram::new(1),
        )
        .unwrap();
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        shape.set_position(0, Vec2::splat(5.0)).unwrap();
        assert!(shape.set_size(1, Vec2::ZERO).is_err());

        assert_eq!(shape.streams().positions().values(), &[Vec2::splat(5.0)]);
        assert_eq!(shape.streams().sizes().values(), &[Vec2::ONE]);
        assert_eq!(shape.len(), 1);
    }
}
