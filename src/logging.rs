//! Logger initialization.
//!
//! The crate logs through the `log` facade. Binaries and demos call
//! [`init_logging`] once, early in `main`. Without an explicit filter or
//! `RUST_LOG`, only this crate logs below `warn`; wgpu and naga stay quiet.

use std::io::Write;
use std::sync::Once;

use log::LevelFilter;

/// Log target prefix of everything this crate emits.
pub const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for this crate's own targets.
    pub level: LevelFilter,
    /// Full `env_logger` filter (e.g. "wgpu_gallery=trace,wgpu_core=info").
    /// Overrides `level` and `RUST_LOG`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Map a `-v` count to this crate's level: info, debug, then trace.
    pub fn with_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    /// Filter used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_filter(&self) -> String {
        format!("warn,{CRATE_TARGET}={}", self.level.as_str().to_ascii_lowercase())
    }
}

/// Module path relative to the crate, so lines read `demo: ...` rather than
/// `wgpu_gallery::demo: ...`. Foreign targets are kept whole.
pub fn short_target(target: &str) -> &str {
    match target.strip_prefix(CRATE_TARGET) {
        Some("") => CRATE_TARGET,
        Some(rest) => rest.strip_prefix("::").unwrap_or(target),
        None => target,
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let filter = config
            .env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| config.default_filter());
        builder.parse_filters(&filter);

        builder.write_style(config.write_style);
        builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{style}{:<5}{style:#} {}: {}",
                record.level(),
                short_target(record.target()),
                record.args()
            )
        });

        // try_init: tests and embedding hosts may have installed a logger already.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized with filter '{filter}'");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LoggingConfig {
            env_filter: Some("debug".into()),
            ..Default::default()
        });
        // Second call must not panic on the already-set global logger.
        init_logging(LoggingConfig::default());
    }

    #[test]
    fn test_default_filter_targets_this_crate() {
        assert_eq!(CRATE_TARGET, "wgpu_gallery");
        assert_eq!(LoggingConfig::default().default_filter(), "warn,wgpu_gallery=info");
        assert_eq!(LoggingConfig::with_verbosity(1).default_filter(), "warn,wgpu_gallery=debug");
        assert_eq!(LoggingConfig::with_verbosity(7).level, LevelFilter::Trace);
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("wgpu_gallery::gpu::renderer"), "gpu::renderer");
        assert_eq!(short_target("wgpu_gallery"), "wgpu_gallery");
        assert_eq!(short_target("wgpu_core::device"), "wgpu_core::device");
        assert_eq!(short_target("wgpu_gallery_extra"), "wgpu_gallery_extra");
    }
}
