//! Insertion Order Module
//!
//! Tracks the order in which keys were written so enumeration is oldest-first.

use std::collections::VecDeque;

// == Insertion Order ==
/// Tracks write order for a single store.
///
/// Keys are stored in a VecDeque where:
/// - Front = Least recently written
/// - Back = Most recently written
#[derive(Debug, Default)]
pub struct InsertionOrder {
    /// Order of keys by write time
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record ==
    /// Marks a key as just written (moves to back).
    ///
    /// Rewriting an existing key re-appends it, matching replace-on-put stores.
    pub fn record(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Iterate ==
    /// Iterates keys oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = InsertionOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
        assert_eq!(order.iter().next(), None);
    }

    #[test]
    fn test_record_new_keys() {
        let mut order = InsertionOrder::new();

        order.record("a");
        order.record("b");
        order.record("c");

        assert_eq!(order.len(), 3);
        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rewrite_moves_to_back() {
        let mut order = InsertionOrder::new();

        order.record("a");
        order.record("b");
        order.record("c");
        order.record("a");

        assert_eq!(order.len(), 3);
        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove() {
        let mut order = InsertionOrder::new();

        order.record("key1");
        order.record("key2");
        order.record("key3");
        order.remove("key2");
        order.remove("nonexistent");

        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["key1", "key3"]);
    }

    #[test]
    fn test_record_same_key_repeatedly() {
        let mut order = InsertionOrder::new();

        order.record("key1");
        order.record("key1");
        order.record("key1");

        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["key1"]);
    }
}
