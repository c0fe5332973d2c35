//! Subscriber setup for the `tracing` output of the resource layer.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Logger configuration.
///
/// `env_filter` follows the `EnvFilter` directive syntax (e.g. "info",
/// "congol_gfx=trace,congol_device=debug"). When unset, `RUST_LOG` is
/// consulted, then `info`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    fn filter(&self) -> EnvFilter {
        if let Some(directives) = &self.env_filter {
            return EnvFilter::new(directives);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

static INIT: Once = Once::new();

/// Install the global `fmt` subscriber once.
///
/// Subsequent calls are ignored, as is the case where another subscriber
/// was already installed by the host application.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(config.filter())
            .with_ansi(config.ansi)
            .try_init();

        match installed {
            Ok(()) => tracing::debug!("logging initialized"),
            Err(err) => tracing::debug!("logging already initialized: {err}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let config = LoggingConfig {
            env_filter: Some("congol_gfx=trace".into()),
            ansi: false,
        };
        init_logging(config.clone());
        init_logging(config);
    }
}
