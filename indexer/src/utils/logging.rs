//! Logger setup
//!
//! Pipeline components log through the `log` macros directly; this module
//! only configures the backend.

use env_logger::{Builder, Env};

/// Level used when `RUST_LOG` is unset. The pipeline narrates block
/// progress at `info`; per-event detail stays at `debug`.
const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize the logger
pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER)).init();
}
