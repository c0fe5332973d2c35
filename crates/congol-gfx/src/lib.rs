//! GPU resource layer for the congol renderer.
//!
//! Everything here sits on top of a [`congol_device::GlDevice`] reached
//! through a shared [`RenderContext`]:
//!
//! - [`ResourceHandle`] owns one device object and frees it on drop.
//! - [`AttributeBuffer`] mirrors one vertex-attribute stream on the client
//!   and keeps the device copy in sync; [`ScalarAttribute`] is its
//!   single-value counterpart.
//! - [`CompositeShape`] groups several streams behind one vertex array and
//!   keeps them aligned. [`VertexShape`] adds an element buffer and indexed
//!   draws. [`ScalarShape`] is the single-shape form with plain values.
//! - [`ColorListBuffer`] is a stream of per-element color lists, expanded to
//!   one color per vertex on upload.
//!
//! Edits upload immediately unless the context is batching. Open a
//! [`BatchSession`] with [`RenderContext::batch`] (or call
//! [`CompositeShape::run_batched`]) to coalesce many edits into one upload
//! per stream.

pub mod attribute;
pub mod collab;
pub mod color;
pub mod color_list;
pub mod context;
pub mod error;
pub mod handle;
pub mod logging;
pub mod shape;
pub mod vertex;

pub use attribute::{
    Attribute, AttributeBinding, AttributeBuffer, AttributeLayout, ScalarAttribute, Stream,
};
pub use collab::{Camera, FixedStepCamera, ShaderProgram};
pub use color::Color;
pub use color_list::{ColorListBuffer, QUAD_VERTICES};
pub use context::{BatchSession, ContextConfig, RenderContext};
pub use error::{GfxError, Result};
pub use handle::ResourceHandle;
pub use logging::{init_logging, LoggingConfig};
pub use shape::{
    CompositeShape, DrawPlan, IndexSelection, IndexedCall, LayoutScope, PositionColor,
    PositionSize, ScalarShape, StreamSet, VertexShape,
};
pub use vertex::VertexAttribute;

pub use congol_device::{BufferUsage, GlDevice, PrimitiveMode, ResourceKind};
