//! Ordered set of application names waiting to disappear from the list.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRemovals {
    names: Vec<String>,
}

impl PendingRemovals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the name was already pending.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.clone()
    }

    /// Returns `true` if anything was removed.
    pub fn clear(&mut self) -> bool {
        let changed = !self.names.is_empty();
        self.names.clear();
        changed
    }

    /// Keeps only the names still listed. Returns `true` if the set changed.
    pub fn retain_listed<'a, I>(&mut self, listed: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let listed: HashSet<&str> = listed.into_iter().collect();
        let before = self.names.len();
        self.names.retain(|n| listed.contains(n.as_str()));
        self.names.len() != before
    }
}
