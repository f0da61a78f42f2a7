//! Memoized, cycle-safe clone-or-passthrough over the asset graph.
//!
//! [`GraphCloner::map_object`] walks everything reachable from an asset and
//! returns either the asset itself (nothing underneath needed rewriting) or a
//! freshly inserted copy whose references point at rewritten children. Kinds
//! with path data are handled by [`CloneRules::custom_clone`]; containers fall
//! back to a structural clone that copies the container and maps each slot.
//!
//! ## Sharing and cycles
//!
//! Every result is cached by original [`AssetId`], so an asset reachable from
//! two parents is cloned once and both parents see the same copy. A
//! structural clone allocates its duplicate before visiting its slots; a
//! reference back to a container that is still being visited resolves to that
//! duplicate. Containers that reach each other form a strongly connected
//! group which is settled as a unit when its first member finishes: if any
//! member changed, every member keeps its duplicate; otherwise all duplicates
//! are dropped and the originals are reused.

use std::collections::HashMap;

use crate::asset::{Asset, AssetData, AssetId, AssetStore, ClonePolicy};
use crate::dirty::Dirty;
use crate::error::RebaseError;

/// Containers that may be nested inside each other before traversal gives up.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Outcome of a kind-specific rewrite rule.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomClone {
    /// No dedicated rule for this kind; clone it structurally.
    NoRule,
    /// The asset is used as-is.
    Unchanged,
    /// The rule produced a candidate. When it is not flagged as changed the
    /// candidate is dropped and the original asset is used instead.
    Rewritten(Dirty<Asset>),
}

/// Kind-specific rewrite rules plugged into a [`GraphCloner`].
pub trait CloneRules {
    /// Rewrite a single asset without following its references.
    fn custom_clone(&mut self, id: AssetId, asset: &Asset) -> Result<CustomClone, RebaseError>;

    /// Name given to a structural duplicate.
    fn structural_name(&self, original: &str) -> String {
        original.to_string()
    }
}

/// Counters describing what a cloner did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneStats {
    /// Assets inserted by custom rules.
    pub rewritten: usize,
    /// Structural duplicates that were kept.
    pub duplicated: usize,
    /// Structural duplicates dropped because nothing underneath changed.
    pub discarded: usize,
}

/// Bookkeeping for a container whose group has not been settled yet.
#[derive(Debug, Clone, Copy)]
struct OpenClone {
    /// Discovery order.
    index: usize,
    /// Smallest discovery index reachable from here through open containers.
    low: usize,
    /// Length of the group stack before this container was pushed.
    depth: usize,
    duplicate: AssetId,
    changed: bool,
}

/// Generic deep cloner parameterized by its rewrite rules.
#[derive(Debug)]
pub struct GraphCloner<R> {
    rules: R,
    cache: HashMap<AssetId, AssetId>,
    open: HashMap<AssetId, OpenClone>,
    /// Containers visited but not yet settled, in discovery order.
    group_stack: Vec<AssetId>,
    /// Containers currently mapping their slots, innermost last.
    call_stack: Vec<AssetId>,
    next_index: usize,
    max_depth: usize,
    stats: CloneStats,
}

impl<R: CloneRules> GraphCloner<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            cache: HashMap::new(),
            open: HashMap::new(),
            group_stack: Vec::new(),
            call_stack: Vec::new(),
            next_index: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            stats: CloneStats::default(),
        }
    }

    /// Builder: limit how many containers may be open at once.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn stats(&self) -> CloneStats {
        self.stats
    }

    /// Cached result for an asset, if it has been mapped already.
    pub fn cached(&self, id: AssetId) -> Option<AssetId> {
        self.cache.get(&id).copied()
    }

    /// Map an asset handle to itself or to its rewritten copy.
    ///
    /// The input asset is never modified. After a failed call the cloner and
    /// any assets it inserted should be discarded.
    pub fn map_object(
        &mut self,
        store: &mut AssetStore,
        node: Option<AssetId>,
    ) -> Result<Option<AssetId>, RebaseError> {
        Ok(self.deep_clone(store, node)?.value)
    }

    /// Like [`GraphCloner::map_object`] but also reports whether the result
    /// differs from the input.
    pub fn deep_clone(
        &mut self,
        store: &mut AssetStore,
        node: Option<AssetId>,
    ) -> Result<Dirty<Option<AssetId>>, RebaseError> {
        match node {
            None => Ok(Dirty::clean(None)),
            Some(id) => Ok(self.clone_asset(store, id)?.map(Some)),
        }
    }

    fn clone_asset(&mut self, store: &mut AssetStore, id: AssetId) -> Result<Dirty<AssetId>, RebaseError> {
        let asset = store.require(id)?;
        match asset.kind().policy() {
            ClonePolicy::PassThrough => return Ok(Dirty::clean(id)),
            ClonePolicy::Reject => {
                return Err(RebaseError::UnsupportedAsset {
                    id,
                    type_name: asset.data.type_name(),
                })
            }
            ClonePolicy::Clone => {}
        }

        if let Some(&cached) = self.cache.get(&id) {
            return Ok(Dirty::new(cached, cached != id));
        }

        // Reached a container that is still mapping its slots: a cycle.
        if let Some(open) = self.open.get(&id) {
            let (index, duplicate) = (open.index, open.duplicate);
            self.lower_caller(index);
            return Ok(Dirty::clean(duplicate));
        }

        match self.rules.custom_clone(id, asset)? {
            CustomClone::Rewritten(candidate) => {
                let result = if candidate.changed {
                    self.stats.rewritten += 1;
                    store.insert(candidate.value)
                } else {
                    id
                };
                self.remember(id, result);
                Ok(Dirty::new(result, candidate.changed))
            }
            CustomClone::Unchanged => {
                self.remember(id, id);
                Ok(Dirty::clean(id))
            }
            CustomClone::NoRule => self.structural_clone(store, id),
        }
    }

    fn structural_clone(
        &mut self,
        store: &mut AssetStore,
        id: AssetId,
    ) -> Result<Dirty<AssetId>, RebaseError> {
        let original = store.require(id)?;
        let AssetData::Container(container) = &original.data else {
            return Err(RebaseError::NoStructuralClone {
                id,
                kind: original.kind(),
            });
        };
        if self.call_stack.len() >= self.max_depth {
            return Err(RebaseError::GraphTooDeep {
                id,
                limit: self.max_depth,
            });
        }
        let targets: Vec<Option<AssetId>> = container.slots.iter().map(|s| s.target).collect();

        let mut copy = original.clone();
        copy.name = self.rules.structural_name(&original.name);
        let duplicate = store.insert(copy);

        let index = self.next_index;
        self.next_index += 1;
        self.open.insert(
            id,
            OpenClone {
                index,
                low: index,
                depth: self.group_stack.len(),
                duplicate,
                changed: false,
            },
        );
        self.group_stack.push(id);
        self.call_stack.push(id);

        let mut outcome = Dirty::clean(());
        for (slot, target) in targets.into_iter().enumerate() {
            let mapped = self.deep_clone(store, target)?;
            let mapped = outcome.absorb(mapped);
            if let Some(copy) = store.container_mut(duplicate) {
                copy.slots[slot].target = mapped;
            }
        }
        self.call_stack.pop();

        let low = match self.open.get_mut(&id) {
            Some(open) => {
                open.changed |= outcome.changed;
                open.low
            }
            None => index,
        };

        if low < index {
            // Still part of a group rooted further up; settle later.
            self.lower_caller(low);
            return Ok(Dirty::new(duplicate, outcome.changed));
        }

        Ok(self.settle_group(store, id))
    }

    /// Propagate a reachable discovery index to the container mapping us.
    fn lower_caller(&mut self, index: usize) {
        if let Some(caller) = self.call_stack.last() {
            if let Some(open) = self.open.get_mut(caller) {
                open.low = open.low.min(index);
            }
        }
    }

    /// Decide clone-or-original for every container of the group rooted at
    /// `root`.
    fn settle_group(&mut self, store: &mut AssetStore, root: AssetId) -> Dirty<AssetId> {
        let depth = self.open.get(&root).map(|o| o.depth).unwrap_or(0);
        let members = self.group_stack.split_off(depth);
        let settled: Vec<(AssetId, OpenClone)> = members
            .into_iter()
            .filter_map(|m| self.open.remove(&m).map(|open| (m, open)))
            .collect();

        let changed = settled.iter().any(|(_, open)| open.changed);
        let mut root_result = root;
        for (original, open) in settled {
            let result = if changed {
                self.stats.duplicated += 1;
                open.duplicate
            } else {
                store.remove(open.duplicate);
                self.stats.discarded += 1;
                original
            };
            self.remember(original, result);
            if original == root {
                root_result = result;
            }
        }

        log::debug!(
            "Settled container {} ({}): {}",
            root,
            if changed { "rewritten" } else { "unchanged" },
            root_result
        );
        Dirty::new(root_result, changed)
    }

    fn remember(&mut self, original: AssetId, result: AssetId) {
        self.cache.insert(original, result);
        self.cache.insert(result, result);
    }
}
