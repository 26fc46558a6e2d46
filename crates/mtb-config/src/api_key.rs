//! Shared-secret handling for the `x-api-key` header.
//!
//! # Contract
//! - The key is resolved once at startup and passed into the daemon state.
//! - `Debug` never prints the value.
//! - Comparison is constant-time over the key bytes.

use subtle::ConstantTimeEq;

/// Placeholder shipped as the default for `MT5_BRIDGE_KEY`.
///
/// Anyone who has read the docs knows it, so a bridge running with it is
/// effectively unauthenticated.
pub const DEFAULT_API_KEY: &str = "change-me";

/// The configured shared secret. **Value is redacted in `Debug` output.**
#[derive(Clone)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"<REDACTED>").finish()
    }
}

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// True when the key is the shipped placeholder or blank.
    pub fn is_insecure_default(&self) -> bool {
        let k = self.0.trim();
        k.is_empty() || k == DEFAULT_API_KEY
    }

    /// Exact match of a caller-supplied token against the configured key.
    ///
    /// `ct_eq` on slices rejects a length mismatch immediately; only the
    /// content comparison is constant-time.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}
