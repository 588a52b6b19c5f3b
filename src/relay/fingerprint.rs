use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content hash identifying a prompt for at-most-once processing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// First 16 hex chars of the SHA-256 of the content
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize())[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded FIFO of fingerprints already relayed; the oldest is evicted on overflow
#[derive(Debug, Clone)]
pub struct ProcessedFingerprintSet {
    capacity: usize,
    entries: IndexSet<Fingerprint>,
}

impl ProcessedFingerprintSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: IndexSet::with_capacity(capacity) }
    }

    /// Restore from persisted entries, oldest first; keeps only the newest `capacity`
    pub fn from_entries(capacity: usize, entries: impl IntoIterator<Item = Fingerprint>) -> Self {
        let mut set = Self::new(capacity);
        for fingerprint in entries {
            set.insert(fingerprint);
        }
        set
    }

    /// Insert unless present. Returns false for a fingerprint that was already processed.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        if self.entries.contains(&fingerprint) {
            return false;
        }
        while self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(fingerprint);
        true
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn entries(&self) -> Vec<Fingerprint> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = Fingerprint::of("hello");
        assert_eq!(a, Fingerprint::of("hello"));
        assert_ne!(a, Fingerprint::of("hello!"));
        assert_eq!(a.as_str().len(), 16);
        assert_eq!(a.as_str(), "2cf24dba5fb0a30e");
    }

    #[test]
    fn test_fifo_eviction() {
        let mut set = ProcessedFingerprintSet::new(2);
        assert!(set.insert(Fingerprint::of("a")));
        assert!(set.insert(Fingerprint::of("b")));
        assert!(!set.insert(Fingerprint::of("a")));
        assert!(set.insert(Fingerprint::of("c")));

        assert_eq!(set.len(), 2);
        assert!(!set.contains(&Fingerprint::of("a")));
        assert_eq!(set.entries(), vec![Fingerprint::of("b"), Fingerprint::of("c")]);
    }

    #[test]
    fn test_restore_keeps_newest() {
        let entries = ["a", "b", "c"].map(Fingerprint::of);
        let set = ProcessedFingerprintSet::from_entries(2, entries);
        assert_eq!(set.entries(), vec![Fingerprint::of("b"), Fingerprint::of("c")]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut set = ProcessedFingerprintSet::new(0);
        assert_eq!(set.capacity(), 1);
        assert!(set.insert(Fingerprint::of("a")));
        assert!(set.insert(Fingerprint::of("b")));
        assert_eq!(set.len(), 1);
    }
}
