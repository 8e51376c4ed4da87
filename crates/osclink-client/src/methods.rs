//! Registered method set
//!
//! Ordered set of OSC address patterns the client is interested in.
//! Consulted on every inbound message when filtering is enabled,
//! including messages nested inside bundles.

use parking_lot::Mutex;

use crate::error::{ClientError, Result};

/// Ordered, deduplicated set of address-pattern strings
#[derive(Default)]
pub struct MethodRegistry {
    patterns: Mutex<Vec<String>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address pattern. Re-registering is a no-op; insertion
    /// order is preserved.
    ///
    /// An OSC address pattern is a non-empty string beginning with `/`.
    pub fn register(&self, pattern: &str) -> Result<()> {
        if !pattern.starts_with('/') {
            return Err(ClientError::InvalidAddress(pattern.to_string()));
        }

        let mut patterns = self.patterns.lock();
        if !patterns.iter().any(|p| p == pattern) {
            patterns.push(pattern.to_string());
        }
        Ok(())
    }

    /// Remove a pattern. Removing an absent pattern is a no-op.
    pub fn unregister(&self, pattern: &str) {
        self.patterns.lock().retain(|p| p != pattern);
    }

    /// Remove all patterns
    pub fn clear(&self) {
        self.patterns.lock().clear();
    }

    /// Whether an address is registered
    pub fn contains(&self, addr: &str) -> bool {
        self.patterns.lock().iter().any(|p| p == addr)
    }

    /// Registered patterns in insertion order
    pub fn registered(&self) -> Vec<String> {
        self.patterns.lock().clone()
    }
}
