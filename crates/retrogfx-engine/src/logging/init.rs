use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// Filter precedence: `env_filter`, then `RUST_LOG`, then `default_level`.
/// `env_filter` follows the `env_logger` filter syntax (e.g.
/// "retrogfx_engine=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    /// Caps `wgpu_core`/`wgpu_hal` at `warn` when no explicit filter is given.
    pub quiet_gpu: bool,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: LevelFilter::Info,
            quiet_gpu: true,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Debug output from this crate, captured per test.
    pub fn for_tests() -> Self {
        Self {
            env_filter: Some("retrogfx_engine=debug".into()),
            is_test: true,
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored, as is a logger installed by someone
/// else first. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(config.default_level);
                if config.quiet_gpu {
                    builder.filter_module("wgpu_core", LevelFilter::Warn);
                    builder.filter_module("wgpu_hal", LevelFilter::Warn);
                }
            }
        }

        builder.write_style(config.write_style).is_test(config.is_test);
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LoggingConfig::for_tests());
        init_logging(LoggingConfig::default());
        log::debug!("still alive");
    }
}
