//! Composite shapes: several attribute streams sharing one vertex array.
//!
//! A [`CompositeShape`] owns a vertex array and a [`StreamSet`], the ordered
//! list of per-element attribute buffers that make up one drawable type (all
//! rectangles, all vertices of a line batch, ...). Every structural edit goes
//! through the shape so the streams always hold the same number of elements.
//!
//! Per-element value edits (`set_*`) touch a single stream and send only that
//! stream's bytes; they never change the element count. Callers never get
//! mutable access to the streams themselves.
//!
//! ```compile_fail
//! # use std::rc::Rc;
//! # use congol_device::RecordingDevice;
//! # use congol_gfx::{CompositeShape, FixedStepCamera, PositionSize, RenderContext, ShaderProgram};
//! # let ctx = RenderContext::new(Rc::new(RecordingDevice::new()));
//! # let camera = Rc::new(FixedStepCamera::default());
//! let mut shape =
//!     CompositeShape::<PositionSize<glam::Vec2>>::new(&ctx, camera, ShaderProgram::new(1))?;
//! shape.streams_mut().position.push_back(glam::Vec2::ZERO)?;
//! # Ok::<(), congol_gfx::GfxError>(())
//! ```

mod plan;
mod scalar;
mod streams;
mod vertex;

use std::ops::Range;
use std::rc::Rc;

use congol_device::{GLsizei, GLuint, PrimitiveMode, ResourceKind};

use crate::attribute::{check_range, AttributeLayout, Stream};
use crate::collab::{Camera, ShaderProgram};
use crate::context::RenderContext;
use crate::error::{GfxError, Result};
use crate::handle::ResourceHandle;

pub use plan::{DrawPlan, IndexSelection, IndexedCall};
pub use scalar::ScalarShape;
pub use streams::{PositionColor, PositionSize};
pub use vertex::VertexShape;

/// The constituents of a composite shape.
///
/// Implementations list their streams in a fixed order under fixed names and
/// know how to append one element to all of them.
pub trait StreamSet: Sized {
    /// One element, as one value per stream.
    type Element;

    fn allocate(ctx: &Rc<RenderContext>) -> Result<Self>;

    fn streams(&self) -> Vec<(&'static str, &dyn Stream)>;

    /// Mutable streams. Only the owning shape calls this, so edits stay
    /// aligned.
    fn streams_mut(&mut self) -> Vec<(&'static str, &mut dyn Stream)>;

    /// Append `element`, one value to every stream.
    fn push(&mut self, element: Self::Element) -> Result<()>;

    fn get(&self, index: usize) -> Option<Self::Element>;

    /// Resize every mirror to `len`. Not uploaded.
    fn resize(&mut self, len: usize);

    /// Attach every stream to its default attribute in `shader`. Called with
    /// the shape's vertex array bound.
    fn initialize(&mut self, shader: ShaderProgram, instanced: bool) -> Result<()>;

    fn try_clone(&self) -> Result<Self>;
}

/// Named streams of a shape, handed to [`CompositeShape::initialize_with`]
/// while its vertex array is bound. Layouts are the only thing that can be
/// changed through it.
pub struct LayoutScope<'a> {
    streams: Vec<(&'static str, &'a mut dyn Stream)>,
}

impl<'a> LayoutScope<'a> {
    pub fn names(&self) -> impl Iterator<Item = &'static str> + use<'_, 'a> {
        self.streams.iter().map(|(name, _)| *name)
    }

    /// Attach the stream called `name` to `layout` and upload it.
    pub fn attach(&mut self, name: &str, layout: AttributeLayout) -> Result<()> {
        let (_, stream) = self
            .streams
            .iter_mut()
            .find(|(stream_name, _)| *stream_name == name)
            .ok_or_else(|| GfxError::UnknownStream {
                name: name.to_owned(),
            })?;
        stream.initialize(layout)
    }
}

pub struct CompositeShape<S: StreamSet> {
    vao: ResourceHandle,
    streams: S,
    camera: Rc<dyn Camera>,
    shader: ShaderProgram,
}

impl<S: StreamSet> CompositeShape<S> {
    pub fn new(
        ctx: &Rc<RenderContext>,
        camera: Rc<dyn Camera>,
        shader: ShaderProgram,
    ) -> Result<Self> {
        Ok(Self {
            vao: ResourceHandle::new(ctx, ResourceKind::VertexArray)?,
            streams: S::allocate(ctx)?,
            camera,
            shader,
        })
    }

    /// Shape holding one initial element.
    pub fn with_element(
        ctx: &Rc<RenderContext>,
        camera: Rc<dyn Camera>,
        shader: ShaderProgram,
        element: S::Element,
    ) -> Result<Self> {
        let mut shape = Self::new(ctx, camera, shader)?;
        shape.push_back(element)?;
        Ok(shape)
    }

    pub fn context(&self) -> &Rc<RenderContext> {
        self.vao.context()
    }

    pub fn vertex_array(&self) -> &ResourceHandle {
        &self.vao
    }

    /// Read access to the constituents.
    pub fn streams(&self) -> &S {
        &self.streams
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

    /// Seconds since the previous frame, as reported by the camera.
    pub fn delta_time(&self) -> f32 {
        self.camera.delta_time()
    }

    pub fn len(&self) -> usize {
        let streams = self.streams.streams();
        let len = streams.first().map_or(0, |(_, s)| s.len());
        debug_assert!(
            streams.iter().all(|(_, s)| s.len() == len),
            "streams out of alignment"
        );
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<S::Element> {
        self.streams.get(index)
    }

    /// Append one element to every stream. Each stream uploads on its own
    /// unless the context is batching.
    pub fn push_back(&mut self, element: S::Element) -> Result<()> {
        self.streams.push(element)?;
        self.debug_check_alignment();
        Ok(())
    }

    pub fn erase(&mut self, index: usize) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(GfxError::IndexOutOfRange { index, len });
        }
        self.for_each_stream(|stream| stream.erase(index))
    }

    pub fn erase_range(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.len())?;
        self.for_each_stream(|stream| stream.erase_range(range.clone()))
    }

    pub fn reserve(&mut self, additional: usize) {
        for (_, stream) in self.streams.streams_mut() {
            stream.reserve(additional);
        }
    }

    /// Resize every stream. Not uploaded; call [`CompositeShape::flush`].
    pub fn resize(&mut self, len: usize) {
        self.streams.resize(len);
        self.debug_check_alignment();
    }

    /// Upload every stream in full.
    pub fn flush(&mut self) -> Result<()> {
        self.for_each_stream(|stream| stream.flush())
    }

    /// Upload the streams named in `names` in full.
    pub fn write_data(&mut self, names: &[&str]) -> Result<()> {
        for (name, stream) in self.streams.streams_mut() {
            if names.contains(&name) {
                stream.flush()?;
            }
        }
        Ok(())
    }

    /// Upload element `index` of the streams named in `names`.
    pub fn edit_data(&mut self, index: usize, names: &[&str]) -> Result<()> {
        for (name, stream) in self.streams.streams_mut() {
            if names.contains(&name) {
                stream.flush_element(index)?;
            }
        }
        Ok(())
    }

    /// Run `f` inside a batch session, then upload every stream once.
    ///
    /// When the call is itself nested in an outer batch the upload is left to
    /// whoever ends that batch.
    pub fn run_batched<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R> {
        let ctx = Rc::clone(self.context());
        let result = {
            let _session = ctx.batch();
            f(self)
        };
        if !ctx.is_batching() {
            self.flush()?;
        }
        Ok(result)
    }

    /// Attach every stream to its default attribute name in the shader.
    pub fn initialize(&mut self, instanced: bool) -> Result<()> {
        let shader = self.shader;
        self.with_vertex_array(|streams| streams.initialize(shader, instanced))
    }

    /// Set up the vertex layout by hand, with the vertex array bound.
    pub fn initialize_with(
        &mut self,
        f: impl FnOnce(&mut LayoutScope<'_>) -> Result<()>,
    ) -> Result<()> {
        self.with_vertex_array(|streams| {
            let mut scope = LayoutScope {
                streams: streams.streams_mut(),
            };
            f(&mut scope)
        })
    }

    /// Run `f` on the streams with the vertex array bound.
    fn with_vertex_array<R>(&mut self, f: impl FnOnce(&mut S) -> Result<R>) -> Result<R> {
        self.vao.bind()?;
        let result = f(&mut self.streams);
        self.vao.unbind();
        result
    }

    /// Bind the vertex array, draw, unbind.
    ///
    /// With `single` set exactly that one instance is drawn, starting at
    /// instance `single`. Otherwise `instances * count` vertices are drawn
    /// from the start of the streams.
    pub fn draw(
        &self,
        mode: PrimitiveMode,
        count: GLsizei,
        instances: GLsizei,
        single: Option<GLuint>,
    ) -> Result<()> {
        let total = instances
            .checked_mul(count)
            .ok_or(GfxError::CountOverflow {
                what: "instance vertex count",
            })?;
        let device = self.context().device();
        self.vao.bound(|| match single {
            Some(index) => {
                device.draw_arrays_instanced_base_instance(mode.as_gl(), 0, count, 1, index)
            }
            None => device.draw_arrays(mode.as_gl(), 0, total),
        })
    }

    /// Copy into new device objects.
    ///
    /// Handle copies start out empty, so every stream is uploaded again and
    /// its remembered layout is applied to the new vertex array.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self {
            vao: self.vao.try_clone()?,
            streams: self.streams.try_clone()?,
            camera: Rc::clone(&self.camera),
            shader: self.shader,
        };
        copy.with_vertex_array(|streams| {
            streams
                .streams_mut()
                .into_iter()
                .try_for_each(|(_, stream)| stream.rebind())
        })?;
        Ok(copy)
    }

    fn for_each_stream(
        &mut self,
        mut f: impl FnMut(&mut dyn Stream) -> Result<()>,
    ) -> Result<()> {
        for (_, stream) in self.streams.streams_mut() {
            f(stream)?;
        }
        self.debug_check_alignment();
        Ok(())
    }

    fn debug_check_alignment(&self) {
        if cfg!(debug_assertions) {
            let _ = self.len();
        }
    }
}

impl<S: StreamSet> std::fmt::Debug for CompositeShape<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeShape")
            .field("vao", &self.vao)
            .field("len", &self.len())
            .field("shader", &self.shader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeBinding;
    use crate::collab::FixedStepCamera;
    use crate::color::Color;
    use congol_device::{Command, RecordingDevice};
    use glam::Vec2;

    type Rects = CompositeShape<PositionSize<Vec2>>;

    fn setup() -> (Rc<RecordingDevice>, Rc<RenderContext>) {
        let device = Rc::new(RecordingDevice::new());
        let ctx = RenderContext::new(device.clone());
        (device, ctx)
    }

    fn rects(ctx: &Rc<RenderContext>) -> Rects {
        Rects::new(ctx, Rc::new(FixedStepCamera::default()), ShaderProgram::new(1)).unwrap()
    }

    #[test]
    fn push_and_erase_keep_streams_aligned() {
        let (_device, ctx) = setup();
        let mut shape = rects(&ctx);
        let check = |shape: &Rects| {
            let p = shape.streams().position.len();
            let s = shape.streams().size.len();
            assert_eq!(p, s);
        };

        for i in 0..6 {
            shape
                .push_back((Vec2::splat(i as f32), Vec2::ONE))
                .unwrap();
            check(&shape);
        }
        shape.erase(2).unwrap();
        check(&shape);
        shape.erase_range(1..3).unwrap();
        check(&shape);
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.position(0), Some(Vec2::ZERO));
        assert_eq!(shape.position(1), Some(Vec2::splat(4.0)));

        assert!(shape.erase(3).is_err());
        assert!(shape.erase_range(2..5).is_err());
        check(&shape);
        assert_eq!(shape.len(), 3);
    }

    #[test]
    fn each_stream_uploads_per_push() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        assert_eq!(device.uploads(), 2);
    }

    #[test]
    fn run_batched_uploads_each_stream_once() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        let pushed = shape
            .run_batched(|shape| {
                for i in 0..10 {
                    shape.push_back((Vec2::splat(i as f32), Vec2::ONE)).unwrap();
                }
                shape.len()
            })
            .unwrap();

        assert_eq!(pushed, 10);
        assert_eq!(device.uploads(), 2);
        assert!(!ctx.is_batching());

        let position = shape.streams().position.handle().id();
        let bytes = device.contents(position).unwrap();
        assert_eq!(bytes.len(), 10 * std::mem::size_of::<Vec2>());
    }

    #[test]
    fn nested_run_batched_defers_to_outer_batch() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        let session = ctx.batch();
        shape
            .run_batched(|shape| shape.push_back((Vec2::ZERO, Vec2::ONE)))
            .unwrap()
            .unwrap();
        assert!(ctx.is_batching());
        assert_eq!(device.uploads(), 0);
        drop(session);
        shape.flush().unwrap();
        assert_eq!(device.uploads(), 2);
    }

    #[test]
    fn set_touches_only_one_stream() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        device.clear_commands();

        shape.set_size(0, Vec2::splat(3.0)).unwrap();
        let size_id = shape.streams().size.handle().id();
        let updates: Vec<Command> = device
            .commands()
            .into_iter()
            .filter(|c| matches!(c, Command::BufferSubData { .. }))
            .collect();
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], Command::BufferSubData { id, .. } if id == size_id));
    }

    #[test]
    fn write_and_edit_data_select_streams_by_name() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        device.clear_commands();

        shape.write_data(&["position"]).unwrap();
        assert_eq!(device.uploads(), 1);
        shape.edit_data(0, &["position", "size"]).unwrap();
        assert_eq!(device.partial_updates(), 2);
        shape.write_data(&["unknown"]).unwrap();
        assert_eq!(device.uploads(), 1);
    }

    #[test]
    fn draw_single_instance() {
        let (device, ctx) = setup();
        let shape = rects(&ctx);
        let vao = shape.vertex_array().id();
        device.clear_commands();

        shape.draw(PrimitiveMode::TriangleFan, 4, 1, Some(2)).unwrap();
        assert_eq!(
            device.commands(),
            vec![
                Command::Bind {
                    kind: ResourceKind::VertexArray,
                    target: 0,
                    id: vao,
                },
                Command::DrawArraysInstancedBaseInstance {
                    mode: gl::TRIANGLE_FAN,
                    first: 0,
                    count: 4,
                    instances: 1,
                    base_instance: 2,
                },
                Command::Bind {
                    kind: ResourceKind::VertexArray,
                    target: 0,
                    id: 0,
                },
            ]
        );
        assert_eq!(device.bound_vertex_array(), 0);
    }

    #[test]
    fn draw_full_range() {
        let (device, ctx) = setup();
        let shape = rects(&ctx);
        shape.draw(PrimitiveMode::Triangles, 6, 5, None).unwrap();
        assert_eq!(
            device.draws(),
            vec![Command::DrawArrays {
                mode: gl::TRIANGLES,
                first: 0,
                count: 30,
            }]
        );
    }

    #[test]
    fn initialize_attaches_streams_inside_vao() {
        let (device, ctx) = setup();
        device.define_attribute(1, "position", 0);
        device.define_attribute(1, "size", 1);
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        shape.initialize(true).unwrap();

        let vao = shape.vertex_array().id();
        let attribs: Vec<(GLuint, GLuint)> = device
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::VertexAttrib {
                    vao: bound,
                    location,
                    divisor: true,
                    ..
                } if bound == vao => Some((bound, location)),
                _ => None,
            })
            .collect();
        assert_eq!(attribs, vec![(vao, 0), (vao, 1)]);
        assert_eq!(device.bound_vertex_array(), 0);
    }

    #[test]
    fn clone_reuploads_and_rebinds() {
        let (device, ctx) = setup();
        device.define_attribute(1, "position", 0);
        device.define_attribute(1, "size", 1);
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::new(1.0, 2.0), Vec2::ONE)).unwrap();
        shape.initialize(false).unwrap();
        device.clear_commands();

        let copy = shape.try_clone().unwrap();
        assert_ne!(copy.vertex_array().id(), shape.vertex_array().id());
        assert_eq!(copy.position(0), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(
            device.contents(copy.streams().position.handle().id()),
            device.contents(shape.streams().position.handle().id())
        );
        let copy_vao = copy.vertex_array().id();
        let rebinds = device
            .commands()
            .into_iter()
            .filter(|c| matches!(c, Command::VertexAttrib { vao, .. } if *vao == copy_vao))
            .count();
        assert_eq!(rebinds, 2);
    }

    #[test]
    fn initialize_with_attaches_by_stream_name() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        shape.push_back((Vec2::ZERO, Vec2::ONE)).unwrap();
        shape
            .initialize_with(|scope| {
                assert_eq!(scope.names().collect::<Vec<_>>(), vec!["position", "size"]);
                scope.attach(
                    "size",
                    AttributeLayout {
                        binding: AttributeBinding::Location(3),
                        components: 2,
                        divisor: false,
                    },
                )
            })
            .unwrap();

        let vao = shape.vertex_array().id();
        let size = shape.streams().sizes().handle().id();
        assert!(device.commands().contains(&Command::VertexAttrib {
            vao,
            buffer: size,
            location: 3,
            components: 2,
            divisor: false,
        }));
        assert_eq!(shape.len(), 1);
        assert_eq!(device.bound_vertex_array(), 0);
    }

    #[test]
    fn initialize_with_rejects_unknown_stream() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        let result = shape.initialize_with(|scope| {
            scope.attach(
                "color",
                AttributeLayout {
                    binding: AttributeBinding::Location(0),
                    components: 4,
                    divisor: false,
                },
            )
        });
        assert!(matches!(result, Err(GfxError::UnknownStream { name }) if name == "color"));
        assert_eq!(device.bound_vertex_array(), 0);
    }

    #[test]
    fn draw_rejects_overflowing_vertex_count() {
        let (device, ctx) = setup();
        let shape = rects(&ctx);
        device.clear_commands();

        let result = shape.draw(PrimitiveMode::Triangles, 6, GLsizei::MAX, None);
        assert!(matches!(result, Err(GfxError::CountOverflow { .. })));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn draw_after_vertex_array_freed_is_refused() {
        let (device, ctx) = setup();
        let mut shape = rects(&ctx);
        shape.vao.free();
        device.clear_commands();

        let result = shape.draw(PrimitiveMode::Triangles, 6, 1, None);
        assert!(matches!(
            result,
            Err(GfxError::Unallocated {
                kind: ResourceKind::VertexArray,
                ..
            })
        ));
        assert!(device.draws().is_empty());
    }

    #[test]
    fn delta_time_comes_from_camera() {
        let (_device, ctx) = setup();
        let shape = CompositeShape::<PositionColor<Vec2>>::with_element(
            &ctx,
            Rc::new(FixedStepCamera::new(0.25)),
            ShaderProgram::new(1),
            (Vec2::ZERO, Color::WHITE),
        )
        .unwrap();
        assert_eq!(shape.delta_time(), 0.25);
        assert_eq!(shape.len(), 1);
    }
}
