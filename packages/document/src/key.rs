use serde::{Deserialize, Serialize};

/// Stable identity of a node within one editing session.
///
/// Keys are never serialized into a persisted document; a reload assigns
/// fresh keys. Persisted identity lives in the `database_id` field of the
/// node variants that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(u64);

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential key generator for nodes within a document session.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    count: u64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Generate the next key.
    pub fn next_key(&mut self) -> NodeKey {
        self.count += 1;
        NodeKey(self.count)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_keys() {
        let mut keys = KeyGenerator::new();

        let a = keys.next_key();
        let b = keys.next_key();
        let c = keys.next_key();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_generators_are_independent() {
        let mut g1 = KeyGenerator::new();
        let mut g2 = KeyGenerator::new();

        // Separate sessions may reuse the same key values; keys are only
        // unique within one session.
        assert_eq!(g1.next_key(), g2.next_key());
    }
}
