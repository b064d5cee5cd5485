//! Global logger setup on top of `env_logger`.
//!
//! The filter string uses `env_logger` directives: a bare level (`"info"`)
//! sets the default and `target=level` pairs override individual modules,
//! e.g. `"warn,ferrous_renderer=debug"`.

use std::io::Write;
use std::sync::Once;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives. Falls back to `RUST_LOG`, then `info`.
    pub level: Option<String>,
}

impl LoggingConfig {
    fn directives(&self) -> String {
        self.level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_owned())
    }
}

fn builder(directives: &str) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(directives)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:<5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        });
    builder
}

static INIT: Once = Once::new();

/// Installs the global logger.  Later calls are no-ops, so tests and
/// examples can call this freely.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let directives = config.directives();
        // the host application may own the logger already
        if builder(&directives).try_init().is_err() {
            log::warn!("logger already installed, ignoring `{directives}`");
            return;
        }
        log::debug!("logging initialized with `{directives}`");
    });
}
