//! Character trie for longest-prefix lookup.

use std::collections::HashMap;

/// A trie node keyed by character.
struct TrieNode<V> {
    value: Option<V>,
    children: HashMap<char, TrieNode<V>>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }
}

/// A trie over string keys.
///
/// Supports exact lookup and longest-prefix lookup. Lookups walk at most
/// `key.chars().count()` nodes regardless of how many keys are stored.
pub struct PrefixTrie<V> {
    root: TrieNode<V>,
    len: usize,
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PrefixTrie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Whether `key` is stored exactly.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Exact lookup.
    pub fn get(&self, key: &str) -> Option<&V> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        node.value.as_ref()
    }

    /// Find the longest stored key that is a prefix of `key`.
    ///
    /// Returns the byte length of the matched prefix with its value.
    pub fn longest_prefix_match(&self, key: &str) -> Option<(usize, &V)> {
        let mut node = &self.root;
        let mut last_match = node.value.as_ref().map(|v| (0, v));

        for (i, c) in key.char_indices() {
            match node.children.get(&c) {
                Some(child) => {
                    node = child;
                    if let Some(v) = node.value.as_ref() {
                        last_match = Some((i + c.len_utf8(), v));
                    }
                }
                None => break,
            }
        }

        last_match
    }
}
