//! # Structured Logging
//!
//! Console tracing setup shared by the CLI and tests, plus a stage-scoped
//! logging helper so every pipeline stage reports progress in the same shape.

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber once. `RUST_LOG` wins over the
/// verbosity-derived level when set.
pub fn init(verbosity: u8) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

        // try_init so an embedding test harness that already installed a
        // subscriber does not panic.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}

/// Log one pipeline stage operation in a uniform structured shape.
pub fn log_stage_operation(stage: &str, resource: &str, status: &str, detail: Option<&str>) {
    tracing::info!(
        stage = %stage,
        resource = %resource,
        status = %status,
        detail = detail,
        "stage operation"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_reentrant() {
        init(0);
        init(2);
        log_stage_operation("queue", "demo-queue", "valid", None);
    }
}
