//! Optimistic concurrency primitives.

/// A record guarded by a monotonically increasing version counter.
///
/// Every successful mutation bumps the version by exactly one; storage backends
/// use it as the compare-and-swap token for conditional writes.
pub trait Versioned {
    /// Strongly-typed record key.
    type Key: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the record key.
    fn key(&self) -> Self::Key;

    /// Current version of the record's state.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a conditional write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (administrative overwrites, migrations).
    Any,
    /// Require the stored record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// The exact version expected, if any.
    pub fn exact(self) -> Option<u64> {
        match self {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v),
        }
    }
}
