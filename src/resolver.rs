//! Stale path resolution.
//!
//! A [`PathResolver`] is anchored at one captured object. It walks an old
//! relative path through the snapshot to find the object that used to live
//! there, then reports where that object lives *now* by inspecting the live
//! hierarchy. Results (including misses) are memoized for the resolver's
//! lifetime, so repeated lookups of the same path are O(1).

use std::collections::HashMap;

use crate::hierarchy::{Hierarchy, ObjectId, PATH_SEPARATOR};
use crate::snapshot::{HierarchySnapshot, SnapshotNode};

/// Memoized old-path → current-path translator anchored at one object.
#[derive(Debug)]
pub struct PathResolver<'a> {
    hierarchy: &'a Hierarchy,
    snapshot: &'a HierarchySnapshot,
    anchor: ObjectId,
    cache: HashMap<String, Option<String>>,
}

impl<'a> PathResolver<'a> {
    pub(crate) fn new(
        hierarchy: &'a Hierarchy,
        snapshot: &'a HierarchySnapshot,
        anchor: ObjectId,
    ) -> Self {
        Self {
            hierarchy,
            snapshot,
            anchor,
            cache: HashMap::new(),
        }
    }

    pub fn anchor(&self) -> ObjectId {
        self.anchor
    }

    /// Translate a path recorded before the mutation.
    ///
    /// Returns `None` ("no mapping") when some segment did not exist at
    /// snapshot time, or when the object it named has since been destroyed or
    /// moved out from under the anchor. The empty path always maps to itself.
    pub fn resolve(&mut self, path: &str) -> Option<String> {
        if path.is_empty() {
            return Some(String::new());
        }
        if let Some(cached) = self.cache.get(path) {
            return cached.clone();
        }

        let resolved = self.lookup(path);
        log::trace!("Resolved {:?} -> {:?}", path, resolved);
        self.cache.insert(path.to_string(), resolved.clone());
        resolved
    }

    fn lookup(&self, path: &str) -> Option<String> {
        let mut node = self.snapshot.node(self.anchor)?;
        for segment in path.split(PATH_SEPARATOR) {
            node = self.child_named(node, segment)?;
        }
        self.hierarchy.relative_path(self.anchor, node.id)
    }

    /// First captured child with the given name.
    fn child_named(&self, node: &SnapshotNode, name: &str) -> Option<&'a SnapshotNode> {
        let snapshot: &'a HierarchySnapshot = self.snapshot;
        node.children
            .iter()
            .filter_map(|&child| snapshot.node(child))
            .find(|child| child.name == name)
    }

    /// Number of memoized paths.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
