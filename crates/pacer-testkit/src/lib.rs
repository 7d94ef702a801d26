//! Pacer Testing Infrastructure
//!
//! Factories and test doubles shared by the pacer test suites: scenario and
//! result factories, a scheduler and a sleeper that record their calls into one
//! ordered log, and a scripted scenario executor.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! pacer-testkit = { path = "../pacer-testkit" }
//! ```
//!
//! ```rust,ignore
//! use pacer_testkit::*;
//!
//! let log = CallLog::new();
//! let scheduler = RecordingScheduler::shared(vec![make_scenario("a")], &log);
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod doubles;
pub mod factories;

pub use doubles::*;
pub use factories::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer fmt subscriber once per process
///
/// Honours `RUST_LOG`; defaults to `info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
