//! Telemetry utilities for command timing and logging setup.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Install the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG` (default `info`). Setting
/// `COURIERD_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("COURIERD_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
