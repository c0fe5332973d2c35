//! Error type for the resource layer.

use congol_device::ResourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GfxError {
    /// The driver could not create a device object. Nothing retries this.
    #[error("failed to allocate {kind:?} object")]
    Allocation {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    /// A handle that owns no device object was moved.
    #[error("attempting to move unallocated {kind:?} handle")]
    MoveUnallocated { kind: ResourceKind },

    /// A handle that owns no device object was bound or written to.
    #[error("{operation} on unallocated {kind:?} handle")]
    Unallocated {
        kind: ResourceKind,
        operation: &'static str,
    },

    /// Element access past the end of a mirror.
    #[error("index {index} out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    /// Range erase reaching past the end of a mirror, or with `start > end`.
    #[error("range {start}..{end} out of bounds for {len} elements")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// A partial update reached past the storage of the last full upload.
    #[error("update of {size} bytes at offset {offset} exceeds capacity of {capacity} bytes")]
    CapacityExceeded {
        offset: usize,
        size: usize,
        capacity: usize,
    },

    /// Data upload on a kind without buffer storage.
    #[error("{operation} is not supported on {kind:?} objects")]
    Unsupported {
        kind: ResourceKind,
        operation: &'static str,
    },

    /// A named shader attribute has no location in the program.
    #[error("shader has no vertex attribute named `{name}`")]
    UnknownAttribute { name: String },

    /// A layout was attached to a stream name the shape does not have.
    #[error("shape has no stream named `{name}`")]
    UnknownStream { name: String },

    /// A vertex or index count does not fit the type the draw call takes.
    #[error("{what} overflows the draw call range")]
    CountOverflow { what: &'static str },
}

pub type Result<T, E = GfxError> = std::result::Result<T, E>;
