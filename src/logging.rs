//! Logging setup.
//!
//! Events go to stderr so they never mix with patch or prompt output.
//!
//! ## Environment Variables
//!
//! 1. **`GIT_SPLIT_LOG`** (highest priority). A bare level such as `debug`
//!    applies to this crate only; anything with `=` or `,` is used as is.
//! 2. **`RUST_LOG`**
//! 3. **Default**: `warn`

use std::env;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

const APP_ENV: &str = "GIT_SPLIT_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init() {
    let filter = EnvFilter::new(filter_spec(
        env::var(APP_ENV).ok(),
        env::var("RUST_LOG").ok(),
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn filter_spec(app: Option<String>, rust_log: Option<String>) -> String {
    if let Some(app) = app.filter(|s| !s.is_empty()) {
        if app.contains(['=', ',', ':']) {
            return app;
        }
        return format!("{DEFAULT_FILTER},git_split={app}");
    }
    rust_log
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}
