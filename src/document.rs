//! JSON document holding a hierarchy, its components and an asset store.
//!
//! The document is what the command line reads and writes. Objects and
//! assets are stored as arrays whose indices are the [`ObjectId`] and
//! [`AssetId`](crate::asset::AssetId) values; `null` marks a destroyed
//! object or discarded asset so that later indices keep their meaning.
//!
//! ```json
//! {
//!   "root": 0,
//!   "objects": [
//!     { "name": "Avatar", "children": [1, 2] },
//!     { "name": "Armature", "children": [3] },
//!     { "name": "Body" },
//!     { "name": "Hips", "active": false }
//!   ],
//!   "components": [
//!     { "object": 0, "typeName": "Animator",
//!       "references": [{ "name": "controller", "asset": 1 }] }
//!   ],
//!   "assets": [
//!     { "name": "wave", "kind": "clip", "curves": [] },
//!     { "name": "FX", "kind": "container", "type": "controller",
//!       "slots": [{ "name": "motion", "target": 0 }] }
//!   ],
//!   "makeChildren": [{ "parent": 2, "children": [3] }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::asset::AssetStore;
use crate::config::RebaseConfig;
use crate::error::RebaseError;
use crate::hierarchy::{Hierarchy, ObjectId, ReferenceField};
use crate::session::{RebasePass, RebaseReport};
use crate::snapshot::HierarchySnapshot;

fn default_active() -> bool {
    true
}

/// One hierarchy object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub children: Vec<ObjectId>,
}

/// One component and its reference fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    pub object: ObjectId,
    pub type_name: String,
    #[serde(default)]
    pub references: Vec<ReferenceField>,
}

/// Reparent `children` under `parent`, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeChildrenStep {
    pub parent: ObjectId,
    pub children: Vec<ObjectId>,
}

/// Serialized rebase input and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseDocument {
    pub root: ObjectId,
    pub objects: Vec<Option<ObjectEntry>>,
    #[serde(default)]
    pub components: Vec<ComponentEntry>,
    #[serde(default)]
    pub assets: AssetStore,
    /// Mutation applied between snapshot and rebase. Cleared once applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub make_children: Vec<MakeChildrenStep>,
}

impl RebaseDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Build the live hierarchy described by the document.
    pub fn to_hierarchy(&self) -> Result<Hierarchy, RebaseError> {
        let mut hierarchy = Hierarchy::new();

        // Allocate every slot first so indices line up with handles.
        for entry in &self.objects {
            let name = entry.as_ref().map(|e| e.name.clone()).unwrap_or_default();
            let id = hierarchy.create_root(name);
            match entry {
                Some(entry) => hierarchy.set_active(id, entry.active)?,
                None => hierarchy.destroy(id)?,
            }
        }

        for (index, entry) in self.objects.iter().enumerate() {
            let Some(entry) = entry else {
                continue;
            };
            for &child in &entry.children {
                hierarchy.set_parent(child, ObjectId(index as u32))?;
            }
        }

        for entry in &self.components {
            let component = hierarchy.add_component(entry.object, entry.type_name.clone())?;
            for field in &entry.references {
                hierarchy.set_reference(component, &field.name, field.asset)?;
            }
        }

        Ok(hierarchy)
    }

    /// Replace objects and components with the state of `hierarchy`.
    pub fn sync_from(&mut self, hierarchy: &Hierarchy) {
        self.objects = (0..hierarchy.slot_count())
            .map(|index| {
                hierarchy.get(ObjectId(index as u32)).map(|object| ObjectEntry {
                    name: object.name.clone(),
                    active: object.active,
                    children: object.children().to_vec(),
                })
            })
            .collect();

        self.components = hierarchy
            .components()
            .iter()
            .map(|component| ComponentEntry {
                object: component.object,
                type_name: component.type_name.clone(),
                references: component.references.clone(),
            })
            .collect();
    }

    /// Snapshot, run the make-children steps, then rebase every component
    /// under the root. The document is updated in place on success and left
    /// unchanged on error.
    pub fn apply(&mut self, config: &RebaseConfig) -> Result<RebaseReport, RebaseError> {
        let mut hierarchy = self.to_hierarchy()?;
        let pass = RebasePass::begin(&hierarchy, self.root, config.clone())?;

        for step in &self.make_children {
            hierarchy.make_children(step.parent, &step.children)?;
        }

        let report = pass.finish(&mut hierarchy, &mut self.assets)?;
        self.sync_from(&hierarchy);
        self.make_children.clear();
        Ok(report)
    }

    /// Resolve old paths relative to `anchor` after the make-children steps.
    /// The document is left unchanged.
    pub fn resolve_paths(
        &self,
        anchor: ObjectId,
        paths: &[String],
    ) -> Result<Vec<Option<String>>, RebaseError> {
        let mut hierarchy = self.to_hierarchy()?;
        let snapshot = HierarchySnapshot::build(&hierarchy, self.root)?;

        for step in &self.make_children {
            hierarchy.make_children(step.parent, &step.children)?;
        }

        let mut resolver = snapshot
            .create_resolver(&hierarchy, anchor)
            .ok_or(RebaseError::NotCaptured(anchor))?;
        Ok(paths.iter().map(|path| resolver.resolve(path)).collect())
    }
}
