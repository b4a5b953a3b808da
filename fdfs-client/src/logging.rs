//! Console logging for applications built on this crate.
//!
//! The client itself only emits through the `log` macros. Call [`init`]
//! once from `main` to see those messages.

use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};

/// Environment variable holding the log filter, e.g. `FDFS_LOG=fdfs_client=trace`.
pub const LOG_ENV: &str = "FDFS_LOG";

/// Install an `env_logger` backend with local-time timestamps.
///
/// The filter is read from `FDFS_LOG`. Without it, `verbose` selects
/// `debug` and otherwise `info`. Returns false if a logger was already
/// installed.
pub fn init(verbose: bool) -> bool {
    let default_filter = if verbose { "debug" } else { "info" };

    Builder::from_env(Env::new().filter_or(LOG_ENV, default_filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .is_ok()
}
