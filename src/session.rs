//! Snapshot-then-rebase orchestration.
//!
//! A [`RebasePass`] captures the hierarchy under a root before the caller
//! restructures it. [`RebasePass::finish`] then walks every component under
//! the root and rewrites each asset reference through a [`ClipRebaser`]
//! anchored at the component's object. Objects get one rebaser each, so
//! components on the same object share clones.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use regex::Regex;

use crate::asset::{AssetId, AssetStore, ClonePolicy};
use crate::clip_rebaser::ClipRebaser;
use crate::config::RebaseConfig;
use crate::error::RebaseError;
use crate::hierarchy::{ComponentId, Hierarchy, ObjectId};
use crate::snapshot::HierarchySnapshot;

/// Summary of a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseReport {
    /// Components whose references were examined.
    pub components_visited: usize,
    /// Components on objects created after the snapshot.
    pub components_skipped: usize,
    /// Reference fields that now point at a different asset.
    pub references_rewritten: usize,
    /// Assets inserted into the store (rewritten leaves and kept duplicates).
    pub assets_created: usize,
    /// Structural duplicates dropped because nothing under them changed.
    pub assets_discarded: usize,
}

/// A rebase in progress: the snapshot has been taken, the hierarchy may now
/// be mutated.
#[derive(Debug)]
pub struct RebasePass {
    root: ObjectId,
    snapshot: HierarchySnapshot,
    config: RebaseConfig,
    pass_through: Regex,
}

/// A reference field to overwrite once every rebaser is done.
struct WriteBack {
    component: ComponentId,
    field: String,
    asset: Option<AssetId>,
}

impl RebasePass {
    /// Capture the hierarchy under `root`.
    pub fn begin(hierarchy: &Hierarchy, root: ObjectId, config: RebaseConfig) -> Result<Self, RebaseError> {
        let pass_through = config.pass_through_regex()?;
        let snapshot = HierarchySnapshot::build(hierarchy, root)?;
        Ok(Self {
            root,
            snapshot,
            config,
            pass_through,
        })
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn snapshot(&self) -> &HierarchySnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &RebaseConfig {
        &self.config
    }

    /// Rewrite asset references of every component under the root.
    ///
    /// Only fields whose current value differs from the mapped one are
    /// written. An unsupported asset anywhere in a reachable graph aborts the
    /// pass: no field is written and every asset the pass inserted is removed
    /// from `store` again.
    pub fn finish(self, hierarchy: &mut Hierarchy, store: &mut AssetStore) -> Result<RebaseReport, RebaseError> {
        let mut report = RebaseReport::default();
        let mark = store.slot_count();

        let write_backs = match self.map_references(hierarchy, store, &mut report) {
            Ok(write_backs) => write_backs,
            Err(err) => {
                log::warn!(
                    "Rebase aborted, discarding {} new assets: {}",
                    store.slot_count() - mark,
                    err
                );
                store.truncate(mark);
                return Err(err);
            }
        };

        for write_back in write_backs {
            hierarchy.set_reference(write_back.component, &write_back.field, write_back.asset)?;
            report.references_rewritten += 1;
        }

        log::info!(
            "Rebased {} references across {} components ({} assets created, {} skipped components)",
            report.references_rewritten,
            report.components_visited,
            report.assets_created,
            report.components_skipped
        );

        Ok(report)
    }

    /// Map every reference under the root, collecting the fields to rewrite.
    fn map_references(
        &self,
        live: &Hierarchy,
        store: &mut AssetStore,
        report: &mut RebaseReport,
    ) -> Result<Vec<WriteBack>, RebaseError> {
        let mut write_backs = Vec::new();
        let mut rebasers: HashMap<ObjectId, ClipRebaser<'_>> = HashMap::new();

        for component_id in live.components_in_children(self.root) {
            let Some(component) = live.component(component_id) else {
                continue;
            };

            let rebaser = match rebasers.entry(component.object) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match self.snapshot.create_resolver(live, component.object) {
                    Some(resolver) => entry.insert(ClipRebaser::new(
                        resolver,
                        &self.config,
                        &self.pass_through,
                    )),
                    None => {
                        log::warn!(
                            "Skipping {} component on {}: object was created after the snapshot",
                            component.type_name,
                            component.object
                        );
                        report.components_skipped += 1;
                        continue;
                    }
                },
            };
            report.components_visited += 1;

            for field in &component.references {
                let Some(asset) = field.asset else {
                    continue;
                };
                if store.require(asset)?.kind().policy() != ClonePolicy::Clone {
                    continue;
                }

                let mapped = rebaser.map_object(store, Some(asset))?;
                if mapped != Some(asset) {
                    log::debug!(
                        "{}.{} on {}: {} -> {:?}",
                        component.type_name,
                        field.name,
                        component.object,
                        asset,
                        mapped
                    );
                    write_backs.push(WriteBack {
                        component: component_id,
                        field: field.name.clone(),
                        asset: mapped,
                    });
                }
            }
        }

        for rebaser in rebasers.values() {
            let stats = rebaser.stats();
            report.assets_created += stats.rewritten + stats.duplicated;
            report.assets_discarded += stats.discarded;
        }

        Ok(write_backs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetData, Clip, Container, ContainerKind, Curve, OpaqueCategory};

    fn clip(store: &mut AssetStore, name: &str, path: &str) -> AssetId {
        let mut clip = Clip::default();
        clip.set_curve(path, "Transform", "m_LocalScale.x", Curve::constant(0.0, 1.0, 1.0));
        store.insert(Asset::new(name, AssetData::Clip(clip)))
    }

    fn controller(store: &mut AssetStore, name: &str, motions: &[AssetId]) -> AssetId {
        let mut container = Container::new(ContainerKind::Controller);
        for (i, m) in motions.iter().enumerate() {
            container = container.with_slot(format!("motion{}", i), Some(*m));
        }
        store.insert(Asset::new(name, AssetData::Container(container)))
    }

    #[test]
    fn test_pass_rewrites_moved_references() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let armature = h.create_child(root, "Armature").unwrap();
        let hips = h.create_child(armature, "Hips").unwrap();
        let body = h.create_child(root, "Body").unwrap();

        let mut store = AssetStore::new();
        let wave = clip(&mut store, "wave", "Armature/Hips");
        let ctrl = controller(&mut store, "FX", &[wave]);
        let animator = h.add_component(root, "Animator").unwrap();
        h.set_reference(animator, "controller", Some(ctrl)).unwrap();

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        h.make_children(body, &[hips]).unwrap();
        let report = pass.finish(&mut h, &mut store).unwrap();

        assert_eq!(report.references_rewritten, 1);
        assert_eq!(report.components_visited, 1);
        assert_eq!(report.assets_created, 2);

        let new_ctrl = h.reference(animator, "controller").unwrap();
        assert_ne!(new_ctrl, ctrl);
        let new_clip = store.container(new_ctrl).unwrap().slot("motion0").unwrap();
        assert_eq!(store.clip(new_clip).unwrap().curves[0].path, "Body/Hips");
    }

    #[test]
    fn test_unchanged_pass_writes_nothing() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        h.create_child(root, "Hips").unwrap();

        let mut store = AssetStore::new();
        let idle = clip(&mut store, "idle", "Hips");
        let ctrl = controller(&mut store, "Base", &[idle]);
        let animator = h.add_component(root, "Animator").unwrap();
        h.set_reference(animator, "controller", Some(ctrl)).unwrap();
        let before = store.len();

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        let report = pass.finish(&mut h, &mut store).unwrap();

        assert_eq!(report.references_rewritten, 0);
        assert_eq!(report.assets_discarded, 1);
        assert_eq!(h.reference(animator, "controller"), Some(ctrl));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_components_on_new_objects_are_skipped() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let mut store = AssetStore::new();
        let ctrl = controller(&mut store, "FX", &[]);

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        let late = h.create_child(root, "Late").unwrap();
        let animator = h.add_component(late, "Animator").unwrap();
        h.set_reference(animator, "controller", Some(ctrl)).unwrap();

        let report = pass.finish(&mut h, &mut store).unwrap();
        assert_eq!(report.components_skipped, 1);
        assert_eq!(report.components_visited, 0);
    }

    #[test]
    fn test_non_clone_fields_are_ignored() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let mut store = AssetStore::new();
        let mesh = store.insert(Asset::new(
            "body",
            AssetData::Opaque {
                category: OpaqueCategory::Mesh,
            },
        ));
        let odd = store.insert(Asset::new(
            "odd",
            AssetData::Unsupported {
                type_name: "Cloth".to_string(),
            },
        ));
        let renderer = h.add_component(root, "SkinnedMeshRenderer").unwrap();
        h.set_reference(renderer, "mesh", Some(mesh)).unwrap();
        h.set_reference(renderer, "extra", Some(odd)).unwrap();
        h.set_reference(renderer, "empty", None).unwrap();

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        let report = pass.finish(&mut h, &mut store).unwrap();
        assert_eq!(report.references_rewritten, 0);
        assert_eq!(h.reference(renderer, "mesh"), Some(mesh));
    }

    #[test]
    fn test_unsupported_asset_aborts_pass() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let hips = h.create_child(root, "Hips").unwrap();
        let body = h.create_child(root, "Body").unwrap();

        let mut store = AssetStore::new();
        let wave = clip(&mut store, "wave", "Hips");
        let odd = store.insert(Asset::new(
            "odd",
            AssetData::Unsupported {
                type_name: "Cloth".to_string(),
            },
        ));
        let ctrl = controller(&mut store, "FX", &[wave, odd]);
        let animator = h.add_component(root, "Animator").unwrap();
        h.set_reference(animator, "controller", Some(ctrl)).unwrap();

        let before = (store.len(), store.slot_count());

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        h.set_parent(hips, body).unwrap();
        let err = pass.finish(&mut h, &mut store).unwrap_err();

        assert!(matches!(err, RebaseError::UnsupportedAsset { .. }));
        assert_eq!(h.reference(animator, "controller"), Some(ctrl));
        // The rewritten clip and controller copy are rolled back.
        assert_eq!((store.len(), store.slot_count()), before);
        assert!(store.iter().all(|(_, asset)| !asset.name.contains("rebased")));
    }

    #[test]
    fn test_components_on_one_object_share_clones() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let hips = h.create_child(root, "Hips").unwrap();
        let body = h.create_child(root, "Body").unwrap();

        let mut store = AssetStore::new();
        let wave = clip(&mut store, "wave", "Hips");
        let ctrl = controller(&mut store, "FX", &[wave]);
        let first = h.add_component(root, "Animator").unwrap();
        let second = h.add_component(root, "AnimatorLayer").unwrap();
        h.set_reference(first, "controller", Some(ctrl)).unwrap();
        h.set_reference(second, "controller", Some(ctrl)).unwrap();

        let pass = RebasePass::begin(&h, root, RebaseConfig::default()).unwrap();
        h.set_parent(hips, body).unwrap();
        let report = pass.finish(&mut h, &mut store).unwrap();

        assert_eq!(report.references_rewritten, 2);
        assert_eq!(report.assets_created, 2);
        assert_eq!(h.reference(first, "controller"), h.reference(second, "controller"));
    }

    #[test]
    fn test_begin_rejects_invalid_pattern() {
        let mut h = Hierarchy::new();
        let root = h.create_root("Avatar");
        let config = RebaseConfig {
            pass_through_pattern: "[".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RebasePass::begin(&h, root, config),
            Err(RebaseError::InvalidPattern(_))
        ));
    }
}
