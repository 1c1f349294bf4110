// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::{Error, NodeId};

/// An identifier to node map.
///
/// Doesn't own nodes. Entries are added on element creation and removed
/// when an element is released.
#[derive(Clone, Default)]
pub struct ResourceTable {
    map: HashMap<String, NodeId>,
}

impl ResourceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an identifier.
    ///
    /// Returns `Error::InvalidCall` when the identifier is already taken.
    pub fn insert(&mut self, key: &str, node: NodeId) -> Result<(), Error> {
        if self.map.contains_key(key) {
            return Err(Error::InvalidCall);
        }

        self.map.insert(key.to_string(), node);
        Ok(())
    }

    /// Removes an identifier.
    ///
    /// Returns a node the identifier pointed to.
    pub fn erase(&mut self, key: &str) -> Option<NodeId> {
        self.map.remove(key)
    }

    /// Finds a node by identifier.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.map.get(key).copied()
    }

    /// Checks that an identifier is registered.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Checks that a node is referenced by any identifier.
    pub fn contains_value(&self, node: NodeId) -> bool {
        self.map.values().any(|v| *v == node)
    }

    /// Returns a copy of the table.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Returns the number of registered identifiers.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Checks that the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all entries in an arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Logs all entries at the debug level.
    pub fn dump(&self) {
        let mut keys: Vec<_> = self.map.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        for (key, node) in keys {
            log::debug!("'{}' -> {:?}", key, node);
        }
    }
}

impl std::fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut keys: Vec<_> = self.map.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_map().entries(keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key() {
        let mut table = ResourceTable::new();
        table.insert("a", NodeId(1)).unwrap();
        assert!(matches!(table.insert("a", NodeId(2)), Err(Error::InvalidCall)));
        assert_eq!(table.find("a"), Some(NodeId(1)));
    }

    #[test]
    fn erase_and_scan() {
        let mut table = ResourceTable::new();
        table.insert("a", NodeId(1)).unwrap();
        table.insert("b", NodeId(2)).unwrap();
        assert!(table.contains_value(NodeId(2)));

        let copy = table.duplicate();
        assert_eq!(table.erase("b"), Some(NodeId(2)));
        assert!(!table.contains_value(NodeId(2)));
        assert_eq!(copy.find("b"), Some(NodeId(2)));
        assert_eq!(table.len(), 1);
    }
}
