//! One-time process setup.

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Tracks whether process setup has run.
///
/// Owned by the caller and passed where needed, so setup runs at most once
/// per session without any global flag.
#[derive(Debug)]
pub struct Session {
    initialized: bool,
    default_filter: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new("info")
    }
}

impl Session {
    /// `default_filter` applies when `RUST_LOG` is unset.
    pub fn new(default_filter: impl Into<String>) -> Self {
        Self {
            initialized: false,
            default_filter: default_filter.into(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Install the log subscriber. Returns `true` only on the call that
    /// did the setup.
    pub fn ensure_initialized(&mut self) -> bool {
        if self.initialized {
            return false;
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_filter));

        // Another subscriber may already be installed (tests, embedding apps).
        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .is_err()
        {
            debug!("log subscriber already installed");
        }

        self.initialized = true;
        true
    }
}
