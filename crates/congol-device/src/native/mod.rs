//! Native OpenGL device.
//!
//! Commands are forwarded to the driver of the context that is current on the
//! calling thread. Creating the context and making it current is the job of
//! the windowing layer.

mod device;

pub use device::NativeGl;
