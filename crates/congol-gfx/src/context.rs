//! The render context shared by every resource, and the batching flag.
//!
//! A [`RenderContext`] owns the device and the batching flag that decides
//! whether attribute edits reach the device immediately. It is created once
//! per GL context and handed around as `Rc<RenderContext>`.

use std::cell::Cell;
use std::rc::Rc;

use congol_device::{BufferUsage, GlDevice};

/// Tunables for a [`RenderContext`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Usage hint sent with every full upload.
    pub usage: BufferUsage,
    /// Drain GL errors after each native call.
    pub check_errors: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            usage: BufferUsage::StaticDraw,
            check_errors: cfg!(debug_assertions),
        }
    }
}

pub struct RenderContext {
    device: Rc<dyn GlDevice>,
    config: ContextConfig,
    batching: Cell<bool>,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("config", &self.config)
            .field("batching", &self.batching.get())
            .finish()
    }
}

impl RenderContext {
    pub fn new(device: Rc<dyn GlDevice>) -> Rc<Self> {
        Self::with_config(device, ContextConfig::default())
    }

    pub fn with_config(device: Rc<dyn GlDevice>, config: ContextConfig) -> Rc<Self> {
        Rc::new(Self {
            device,
            config,
            batching: Cell::new(false),
        })
    }

    /// Context over the GL context current on this thread.
    pub fn native(config: ContextConfig) -> Rc<Self> {
        let device = congol_device::NativeGl::load().with_error_checks(config.check_errors);
        Self::with_config(Rc::new(device), config)
    }

    pub fn device(&self) -> &dyn GlDevice {
        self.device.as_ref()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Whether attribute edits are currently held back from the device.
    pub fn is_batching(&self) -> bool {
        self.batching.get()
    }

    pub fn begin_batch(&self) {
        tracing::debug!("batch begin");
        self.batching.set(true);
    }

    /// Clear the batching flag.
    ///
    /// Edits made during the batch are not sent anywhere by this call; flush
    /// the affected buffers or shapes afterwards.
    pub fn end_batch(&self) {
        tracing::debug!("batch end");
        self.batching.set(false);
    }

    /// Run `f` with batching enabled, then clear the flag.
    ///
    /// The flag is a plain boolean, not a counter: nesting `run_batched`
    /// calls behaves as one flat batch and the innermost return already
    /// clears it. Use [`RenderContext::batch`] for sessions that nest.
    pub fn run_batched<R>(&self, f: impl FnOnce() -> R) -> R {
        self.begin_batch();
        let result = f();
        self.end_batch();
        result
    }

    /// Start a scoped batch. Dropping the session puts the flag back to the
    /// state it had when the session was opened.
    pub fn batch(&self) -> BatchSession<'_> {
        let previous = self.batching.replace(true);
        tracing::debug!(nested = previous, "batch session begin");
        BatchSession {
            ctx: self,
            previous,
        }
    }
}

/// Scoped acquisition of the batching flag, see [`RenderContext::batch`].
#[must_use = "the batch ends as soon as the session is dropped"]
pub struct BatchSession<'a> {
    ctx: &'a RenderContext,
    previous: bool,
}

impl Drop for BatchSession<'_> {
    fn drop(&mut self) {
        tracing::debug!(restored = self.previous, "batch session end");
        self.ctx.batching.set(self.previous);
    }
}
