//! Test-only helpers for mutating the process environment.
//!
//! Credentials are read from `MAGENTO_*` variables by
//! [`MagentoConfig::default`](crate::MagentoConfig), so tests that touch them
//! must run serially:
//!
//! ```rust
//! use magento_async::test_support::EnvGuard;
//! use serial_test::serial;
//!
//! #[test]
//! #[serial(env)]
//! fn example() {
//!     let _clean = EnvGuard::clear_credentials();
//!     let _env = EnvGuard::set("MAGENTO_BEARER_TOKEN", "t");
//!     // ... test body ...
//! }
//! ```

use crate::config::{
    ENV_ACCESS_TOKEN_KEY, ENV_ACCESS_TOKEN_SECRET, ENV_BEARER_TOKEN, ENV_CONSUMER_KEY,
    ENV_CONSUMER_SECRET,
};

/// Every variable read by [`MagentoConfig::default`](crate::MagentoConfig)
pub const CREDENTIAL_VARS: [&str; 5] = [
    ENV_CONSUMER_KEY,
    ENV_CONSUMER_SECRET,
    ENV_ACCESS_TOKEN_KEY,
    ENV_ACCESS_TOKEN_SECRET,
    ENV_BEARER_TOKEN,
];

/// Restores one environment variable when dropped.
///
/// The variable goes back to its previous value, or is removed if it was not
/// set before.
pub struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    /// Sets `key` until the guard is dropped.
    ///
    /// # Safety
    ///
    /// `std::env::set_var` races with concurrent environment access; callers
    /// run under `#[serial(env)]`.
    #[must_use]
    pub fn set(key: &'static str, val: &str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: serialized by #[serial(env)] in every caller.
        unsafe { std::env::set_var(key, val) };
        Self { key, prev }
    }

    /// Removes `key` until the guard is dropped.
    ///
    /// # Safety
    ///
    /// Same constraint as [`EnvGuard::set`].
    #[must_use]
    pub fn remove(key: &'static str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: serialized by #[serial(env)] in every caller.
        unsafe { std::env::remove_var(key) };
        Self { key, prev }
    }

    /// Removes all credential variables until the guards are dropped.
    #[must_use]
    pub fn clear_credentials() -> Vec<Self> {
        CREDENTIAL_VARS.into_iter().map(Self::remove).collect()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.prev {
            // SAFETY: serialized by #[serial(env)] in every caller.
            Some(v) => unsafe { std::env::set_var(self.key, v) },
            // SAFETY: as above.
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
