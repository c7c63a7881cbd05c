//! Logging setup for idlc
//!
//! The compiler itself only emits through the `log` facade; embedders pick
//! a backend. These helpers install `env_logger` the way the test suite and
//! the benchmarks want it.
//!
//! # Log Levels
//!
//! - `warn!` - internal oddities (user diagnostics go through the reporter)
//! - `info!` - one line per compilation phase of a library
//! - `debug!` - every declaration registered or compiled, graph sizes
//! - `trace!` - type instantiation, constant resolution, recursion marks
//!
//! # Environment Variable
//!
//! ```bash
//! RUST_LOG=idlc=info cargo test              # phases only
//! RUST_LOG=idlc::flat::constants=trace cargo test
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install a logger at `Warn`. Later calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Install a logger at `level`, printing the emitting module.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.module_path().unwrap_or("idlc"),
                    record.args()
                )
            })
            .init();
    });
}

/// Install a logger configured by `RUST_LOG`, defaulting to `warn`.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(Env::default().default_filter_or("warn")).init();
    });
}

/// Logger for tests: captured output, `RUST_LOG` honoured, never panics
/// when installed twice.
pub fn init_test() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Whether one of the `init*` functions above (other than `init_test`) ran
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        log::debug!("logging twice initialised");
    }
}
