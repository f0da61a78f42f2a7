//! Pre-mutation capture of a hierarchy.
//!
//! A [`HierarchySnapshot`] records every object's name and child order at one
//! point in time. After the live hierarchy has been restructured, the snapshot
//! still answers "which object used to live at this path", which is what
//! [`PathResolver`] needs to translate stale paths.

use std::collections::{HashMap, HashSet};

use crate::error::RebaseError;
use crate::hierarchy::{Hierarchy, ObjectId};
use crate::resolver::PathResolver;

/// A captured object: name and children in sibling order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    pub id: ObjectId,
    pub name: String,
    pub children: Vec<ObjectId>,
}

/// Immutable record of a hierarchy's names and child order.
#[derive(Debug)]
pub struct HierarchySnapshot {
    root: ObjectId,
    nodes: HashMap<ObjectId, SnapshotNode>,
    /// Parents with at least two children sharing a name.
    ambiguous_parents: Vec<ObjectId>,
}

impl HierarchySnapshot {
    /// Capture every object under `root`, inactive ones included.
    pub fn build(hierarchy: &Hierarchy, root: ObjectId) -> Result<Self, RebaseError> {
        if !hierarchy.contains(root) {
            return Err(RebaseError::MissingRoot(root));
        }

        let objects = hierarchy.descendants(root);
        let mut child_slots: HashMap<ObjectId, Vec<Option<ObjectId>>> = objects
            .iter()
            .map(|&id| (id, vec![None; hierarchy.children(id).len()]))
            .collect();

        // Link each object into its parent's slot by sibling index. The root's
        // parent is outside the snapshot, so the root stays unlinked.
        for &id in &objects {
            let Some(parent) = hierarchy.parent(id) else {
                continue;
            };
            let Some(slots) = child_slots.get_mut(&parent) else {
                continue;
            };
            if let Some(index) = hierarchy.sibling_index(id) {
                slots[index] = Some(id);
            }
        }

        let mut nodes = HashMap::with_capacity(objects.len());
        for &id in &objects {
            let slots = child_slots.remove(&id).unwrap_or_default();
            debug_assert!(slots.iter().all(Option::is_some), "unlinked child slot");
            nodes.insert(
                id,
                SnapshotNode {
                    id,
                    name: hierarchy.name(id).unwrap_or_default().to_string(),
                    children: slots.into_iter().flatten().collect(),
                },
            );
        }

        let ambiguous_parents = find_ambiguous_parents(&objects, &nodes);
        for parent in &ambiguous_parents {
            log::warn!(
                "Children of {} share a name; paths through it resolve to the first match",
                nodes[parent].name
            );
        }

        log::debug!("Captured {} objects under {}", nodes.len(), root);

        Ok(Self {
            root,
            nodes,
            ambiguous_parents,
        })
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn node(&self, id: ObjectId) -> Option<&SnapshotNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of captured objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Objects whose children had duplicate names at capture time.
    pub fn ambiguous_parents(&self) -> &[ObjectId] {
        &self.ambiguous_parents
    }

    /// Resolver anchored at `anchor`, or `None` if `anchor` was not captured.
    pub fn create_resolver<'a>(
        &'a self,
        hierarchy: &'a Hierarchy,
        anchor: ObjectId,
    ) -> Option<PathResolver<'a>> {
        if !self.contains(anchor) {
            return None;
        }
        Some(PathResolver::new(hierarchy, self, anchor))
    }
}

fn find_ambiguous_parents(
    order: &[ObjectId],
    nodes: &HashMap<ObjectId, SnapshotNode>,
) -> Vec<ObjectId> {
    order
        .iter()
        .filter(|id| {
            let mut seen = HashSet::new();
            nodes[*id]
                .children
                .iter()
                .any(|child| !seen.insert(nodes[child].name.as_str()))
        })
        .copied()
        .collect()
}
