//! Color lists: one list of colors per element, expanded on upload so each
//! color covers every vertex of the quad it paints.

use std::ops::Range;
use std::rc::Rc;

use congol_device::ResourceKind;

use crate::attribute::{attach_layout, check_range, AttributeBinding, AttributeLayout, Stream};
use crate::collab::ShaderProgram;
use crate::color::Color;
use crate::context::RenderContext;
use crate::error::{GfxError, Result};
use crate::handle::ResourceHandle;

/// Vertices per quad when drawn as two triangles.
pub const QUAD_VERTICES: usize = 6;

/// A stream whose elements are variable-length color lists.
///
/// The device copy holds every color repeated `vertices_per_color` times,
/// in element order. Element `i` therefore starts after the expanded colors
/// of all elements before it.
#[derive(Debug)]
pub struct ColorListBuffer {
    handle: ResourceHandle,
    lists: Vec<Vec<Color>>,
    vertices_per_color: usize,
    layout: Option<AttributeLayout>,
    stale: bool,
}

impl ColorListBuffer {
    /// Empty buffer expanding each color to [`QUAD_VERTICES`] vertices.
    pub fn new(ctx: &Rc<RenderContext>) -> Result<Self> {
        Self::with_vertices_per_color(ctx, QUAD_VERTICES)
    }

    pub fn with_vertices_per_color(
        ctx: &Rc<RenderContext>,
        vertices_per_color: usize,
    ) -> Result<Self> {
        Ok(Self {
            handle: ResourceHandle::new(ctx, ResourceKind::Buffer)?,
            lists: Vec::new(),
            vertices_per_color,
            layout: None,
            stale: false,
        })
    }

    /// Buffer holding one initial list, uploaded right away.
    pub fn with_list(ctx: &Rc<RenderContext>, list: Vec<Color>) -> Result<Self> {
        let mut buffer = Self::new(ctx)?;
        buffer.lists.push(list);
        buffer.flush()?;
        Ok(buffer)
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn layout(&self) -> Option<&AttributeLayout> {
        self.layout.as_ref()
    }

    pub fn vertices_per_color(&self) -> usize {
        self.vertices_per_color
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of elements, not colors.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[Color]> {
        self.lists.get(index).map(Vec::as_slice)
    }

    pub fn lists(&self) -> &[Vec<Color>] {
        &self.lists
    }

    fn syncing(&self) -> bool {
        !self.handle.context().is_batching()
    }

    fn sync_all(&mut self) -> Result<()> {
        if self.syncing() {
            self.flush()
        } else {
            self.stale = true;
            Ok(())
        }
    }

    fn expand(&self, colors: &[Color]) -> Vec<Color> {
        colors
            .iter()
            .flat_map(|&color| std::iter::repeat(color).take(self.vertices_per_color))
            .collect()
    }

    /// The device layout: every list, every color repeated per vertex.
    pub fn expanded(&self) -> Vec<Color> {
        self.lists.iter().flat_map(|list| self.expand(list)).collect()
    }

    /// Byte offset of element `index` in the device copy.
    pub fn byte_offset(&self, index: usize) -> usize {
        let colors: usize = self.lists[..index.min(self.lists.len())]
            .iter()
            .map(Vec::len)
            .sum();
        colors * self.vertices_per_color * std::mem::size_of::<Color>()
    }

    pub fn push_back(&mut self, list: Vec<Color>) -> Result<()> {
        self.lists.push(list);
        self.sync_all()
    }

    /// Replace the list of element `index`.
    ///
    /// A list of the same length is sent on its own; a different length
    /// moves every later element, so the whole buffer is uploaded.
    pub fn set(&mut self, index: usize, list: Vec<Color>) -> Result<()> {
        let len = self.lists.len();
        let slot = self
            .lists
            .get_mut(index)
            .ok_or(GfxError::IndexOutOfRange { index, len })?;
        let resized = slot.len() != list.len();
        *slot = list;
        if resized {
            self.stale = true;
        }
        if self.syncing() {
            self.flush_element(index)
        } else {
            self.stale = true;
            Ok(())
        }
    }

    pub fn erase(&mut self, index: usize) -> Result<()> {
        if index >= self.lists.len() {
            return Err(GfxError::IndexOutOfRange {
                index,
                len: self.lists.len(),
            });
        }
        self.lists.remove(index);
        self.sync_all()
    }

    pub fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.lists.len())?;
        self.lists.drain(range);
        self.sync_all()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.lists.reserve(additional);
    }

    /// Resize with empty lists. Not uploaded.
    pub fn resize(&mut self, len: usize) {
        self.lists.resize_with(len, Vec::new);
        self.stale = true;
    }

    /// Upload every list, expanded.
    pub fn flush(&mut self) -> Result<()> {
        let expanded = self.expanded();
        self.handle.upload(bytemuck::cast_slice(&expanded))?;
        self.stale = false;
        Ok(())
    }

    /// Upload the expanded list of element `index` at its prefix offset.
    pub fn flush_element(&mut self, index: usize) -> Result<()> {
        let list = self.lists.get(index).ok_or(GfxError::IndexOutOfRange {
            index,
            len: self.lists.len(),
        })?;
        let total: usize = self.lists.iter().map(Vec::len).sum();
        let expected = total * self.vertices_per_color * std::mem::size_of::<Color>();
        if self.stale || self.handle.capacity() != expected {
            return self.flush();
        }
        let expanded = self.expand(list);
        if expanded.is_empty() {
            return Ok(());
        }
        self.handle
            .partial_update(self.byte_offset(index), bytemuck::cast_slice(&expanded))
    }

    /// Attach to the `vec4` attribute `name` of `program`, then upload.
    pub fn initialize_named(
        &mut self,
        program: ShaderProgram,
        name: &str,
        divisor: bool,
    ) -> Result<()> {
        self.initialize(AttributeLayout {
            binding: AttributeBinding::Named {
                program,
                name: name.to_owned(),
            },
            components: Color::COMPONENTS,
            divisor,
        })
    }

    pub fn initialize(&mut self, layout: AttributeLayout) -> Result<()> {
        attach_layout(&self.handle, &layout)?;
        self.flush()?;
        self.layout = Some(layout);
        Ok(())
    }

    /// Copy into a new device object and upload the lists there.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self {
            handle: self.handle.try_clone()?,
            lists: self.lists.clone(),
            vertices_per_color: self.vertices_per_color,
            layout: self.layout.clone(),
            stale: true,
        };
        copy.flush()?;
        Ok(copy)
    }
}

impl Stream for ColorListBuffer {
    fn len(&self) -> usize {
        self.lists.len()
    }

    fn erase(&mut self, index: usize) -> Result<()> {
        ColorListBuffer::erase(self, index)
    }

    fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        ColorListBuffer::erase_range(self, range)
    }

    fn reserve(&mut self, additional: usize) {
        ColorListBuffer::reserve(self, additional)
    }

    fn flush(&mut self) -> Result<()> {
        ColorListBuffer::flush(self)
    }

    fn flush_element(&mut self, index: usize) -> Result<()> {
        ColorListBuffer::flush_element(self, index)
    }

    fn initialize(&mut self, layout: AttributeLayout) -> Result<()> {
        ColorListBuffer::initialize(self, layout)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeBuffer;
    use crate::collab::FixedStepCamera;
    use crate::shape::{CompositeShape, StreamSet};
    use congol_device::{Command, RecordingDevice};
    use glam::Vec2;

    const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    fn setup() -> (Rc<RecordingDevice>, Rc<RenderContext>) {
        let device = Rc::new(RecordingDevice::new());
        let ctx = RenderContext::new(device.clone());
        (device, ctx)
    }

    fn device_colors(device: &RecordingDevice, buffer: &ColorListBuffer) -> Vec<Color> {
        let bytes = device.contents(buffer.handle().id()).unwrap();
        bytemuck::pod_collect_to_vec::<u8, Color>(&bytes)
    }

    #[test]
    fn upload_repeats_each_color_per_vertex() {
        let (device, ctx) = setup();
        let mut buffer = ColorListBuffer::with_list(&ctx, vec![RED, GREEN]).unwrap();
        buffer.push_back(vec![BLUE]).unwrap();

        let colors = device_colors(&device, &buffer);
        assert_eq!(colors.len(), 3 * QUAD_VERTICES);
        assert!(colors[..6].iter().all(|&c| c == RED));
        assert!(colors[6..12].iter().all(|&c| c == GREEN));
        assert!(colors[12..].iter().all(|&c| c == BLUE));
        assert_eq!(buffer.get(0), Some(&[RED, GREEN][..]));
    }

    #[test]
    fn element_update_lands_after_earlier_lists() {
        let (device, ctx) = setup();
        let mut buffer = ColorListBuffer::new(&ctx).unwrap();
        buffer.push_back(vec![RED, RED, RED]).unwrap();
        buffer.push_back(vec![GREEN]).unwrap();
        buffer.push_back(vec![BLUE, BLUE]).unwrap();
        device.clear_commands();

        buffer.set(2, vec![GREEN, RED]).unwrap();
        assert_eq!(device.uploads(), 0);
        assert!(device.commands().contains(&Command::BufferSubData {
            target: gl::ARRAY_BUFFER,
            id: buffer.handle().id(),
            offset: 4 * QUAD_VERTICES * 16,
            bytes: 2 * QUAD_VERTICES * 16,
        }));
        let colors = device_colors(&device, &buffer);
        assert_eq!(colors[24..30], [GREEN; 6]);
        assert_eq!(colors[30..], [RED; 6]);
    }

    #[test]
    fn resized_list_uploads_everything() {
        let (device, ctx) = setup();
        let mut buffer = ColorListBuffer::new(&ctx).unwrap();
        buffer.push_back(vec![RED]).unwrap();
        buffer.push_back(vec![BLUE]).unwrap();
        device.clear_commands();

        buffer.set(0, vec![GREEN, GREEN]).unwrap();
        assert_eq!(device.uploads(), 1);
        assert_eq!(device.partial_updates(), 0);
        let colors = device_colors(&device, &buffer);
        assert_eq!(colors.len(), 18);
        assert_eq!(colors[12..], [BLUE; 6]);
    }

    #[test]
    fn batched_erase_then_set_replaces_stale_tail() {
        let (device, ctx) = setup();
        let mut buffer = ColorListBuffer::with_vertices_per_color(&ctx, 1).unwrap();
        for color in [RED, GREEN, BLUE] {
            buffer.push_back(vec![color]).unwrap();
        }
        ctx.run_batched(|| buffer.erase(0).unwrap());
        buffer.set(0, vec![RED]).unwrap();
        assert_eq!(device_colors(&device, &buffer), vec![RED, BLUE]);
        assert!(buffer.set(2, vec![RED]).is_err());
    }

    struct Gradients {
        position: AttributeBuffer<Vec2>,
        colors: ColorListBuffer,
    }

    impl StreamSet for Gradients {
        type Element = (Vec2, Vec<Color>);

        fn allocate(ctx: &Rc<RenderContext>) -> Result<Self> {
            Ok(Self {
                position: AttributeBuffer::new(ctx)?,
                colors: ColorListBuffer::new(ctx)?,
            })
        }

        fn streams(&self) -> Vec<(&'static str, &dyn Stream)> {
            vec![
                ("position", &self.position as &dyn Stream),
                ("color", &self.colors as &dyn Stream),
            ]
        }

        fn streams_mut(&mut self) -> Vec<(&'static str, &mut dyn Stream)> {
            vec![
                ("position", &mut self.position as &mut dyn Stream),
                ("color", &mut self.colors as &mut dyn Stream),
            ]
        }

        fn push(&mut self, (position, colors): Self::Element) -> Result<()> {
            self.position.push_back(position)?;
            self.colors.push_back(colors)
        }

        fn get(&self, index: usize) -> Option<Self::Element> {
            Some((
                self.position.get_value(index)?,
                self.colors.get(index)?.to_vec(),
            ))
        }

        fn resize(&mut self, len: usize) {
            self.position.resize(len);
            self.colors.resize(len);
        }

        fn initialize(&mut self, shader: ShaderProgram, instanced: bool) -> Result<()> {
            self.position
                .initialize_named(shader, "position", instanced, 2)?;
            self.colors.initialize_named(shader, "color", instanced)
        }

        fn try_clone(&self) -> Result<Self> {
            Ok(Self {
                position: self.position.try_clone()?,
                colors: self.colors.try_clone()?,
            })
        }
    }

    #[test]
    fn color_lists_stay_aligned_inside_a_shape() {
        let (device, ctx) = setup();
        device.define_attribute(1, "position", 0);
        device.define_attribute(1, "color", 1);
        let mut shape = CompositeShape::<Gradients>::new(
            &ctx,
            Rc::new(FixedStepCamera::default()),
            ShaderProgram::new(1),
        )
        .unwrap();
        shape.push_back((Vec2::ZERO, vec![RED, GREEN])).unwrap();
        shape.push_back((Vec2::ONE, vec![BLUE])).unwrap();
        shape.initialize(false).unwrap();

        shape.erase(0).unwrap();
        assert_eq!(shape.len(), 1);
        assert_eq!(shape.get(0), Some((Vec2::ONE, vec![BLUE])));
        let colors = device_colors(&device, &shape.streams().colors);
        assert_eq!(colors, vec![BLUE; QUAD_VERTICES]);

        let copy = shape.try_clone().unwrap();
        let copied = device_colors(&device, &copy.streams().colors);
        assert_eq!(copied, colors);
    }
}
