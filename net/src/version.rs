use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Version counter shared by every element of one tree.
///
/// Clones share the counter. Mutated leaves are stamped with the current
/// version; the top group increments it each time it writes a state.
#[derive(Clone, Debug)]
pub struct NetElementVersion {
    counter: Arc<AtomicU64>,
}

impl NetElementVersion {
    /// A counter starting at version 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The version stamped on changes made now.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Advances the counter and returns the new version.
    pub fn increment(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for NetElementVersion {
    fn default() -> Self {
        Self::new()
    }
}

/// Protocol level both peers agreed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetCompatibilityRules {
    /// Negotiated protocol version.
    pub version: u32,
}

impl NetCompatibilityRules {
    /// Peers running this build.
    pub const CURRENT: Self = Self { version: 2 };
    /// Peers from before optional fields were introduced.
    pub const LEGACY: Self = Self { version: 1 };

    /// Rules for an explicit protocol version.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self { version }
    }

    /// Reports whether a field introduced at `min_version` is exchanged.
    #[must_use]
    pub const fn allows(self, min_version: u32) -> bool {
        self.version >= min_version
    }
}

impl Default for NetCompatibilityRules {
    fn default() -> Self {
        Self::CURRENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_counter() {
        let version = NetElementVersion::new();
        let shared = version.clone();
        assert_eq!(version.current(), 1);
        assert_eq!(shared.increment(), 2);
        assert_eq!(version.current(), 2);
    }

    #[test]
    fn legacy_rules_skip_newer_fields() {
        assert!(NetCompatibilityRules::CURRENT.allows(2));
        assert!(!NetCompatibilityRules::LEGACY.allows(2));
        assert!(NetCompatibilityRules::LEGACY.allows(0));
    }
}
