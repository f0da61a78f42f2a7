//! Clip and mask rewrite rules on top of the graph cloner.
//!
//! A [`ClipRebaser`] is anchored at one hierarchy object. Clip bindings and
//! mask entries hold paths relative to that object; the rebaser sends each
//! through its [`PathResolver`] and produces a renamed copy whenever a path
//! moved. Containers have no rule of their own and are cloned structurally,
//! so a controller is only duplicated when some clip or mask beneath it was.

use regex::Regex;

use crate::asset::{Asset, AssetData, AssetId, AssetStore, Clip, Curve, Mask};
use crate::cloner::{CloneRules, CloneStats, CustomClone, GraphCloner};
use crate::config::{RebaseConfig, UnresolvedBindingPolicy};
use crate::dirty::Dirty;
use crate::error::RebaseError;
use crate::resolver::PathResolver;

/// Type and property of the curve that pins a rewritten clip's length.
const LENGTH_DUMMY_TYPE: &str = "GameObject";
const LENGTH_DUMMY_PROPERTY: &str = "m_IsActive";

/// [`CloneRules`] rewriting clip and mask paths through a resolver.
#[derive(Debug)]
pub struct ClipRules<'a> {
    resolver: PathResolver<'a>,
    config: &'a RebaseConfig,
    pass_through: &'a Regex,
}

impl<'a> ClipRules<'a> {
    pub fn resolver(&self) -> &PathResolver<'a> {
        &self.resolver
    }

    fn rebased_name(&self, name: &str) -> String {
        format!("{}{}", self.config.rebased_prefix, name)
    }

    /// New path for a clip binding. `None` means the binding is dropped.
    fn binding_path(&mut self, path: &str) -> Dirty<Option<String>> {
        match self.resolver.resolve(path) {
            Some(mapped) => {
                let changed = mapped != path;
                Dirty::new(Some(mapped), changed)
            }
            None => match self.config.unresolved_clip_bindings {
                UnresolvedBindingPolicy::Retain => Dirty::clean(Some(path.to_string())),
                UnresolvedBindingPolicy::Drop => {
                    log::debug!("Dropping clip binding at unresolved path {:?}", path);
                    Dirty::changed(None)
                }
            },
        }
    }

    fn rebase_clip(&mut self, clip: &Clip) -> Dirty<Clip> {
        let mut out = Dirty::clean(Clip {
            curves: Vec::with_capacity(clip.curves.len()),
            object_curves: Vec::with_capacity(clip.object_curves.len()),
            wrap_mode: clip.wrap_mode,
            legacy: clip.legacy,
            frame_rate: clip.frame_rate,
            local_bounds: clip.local_bounds,
            settings: clip.settings.clone(),
            high_quality_curve: clip.high_quality_curve,
        });

        for binding in &clip.curves {
            if let Some(path) = out.absorb(self.binding_path(&binding.path)) {
                out.value.set_curve(
                    path,
                    binding.type_name.clone(),
                    binding.property.clone(),
                    binding.curve.clone(),
                );
            }
        }

        for binding in &clip.object_curves {
            if let Some(path) = out.absorb(self.binding_path(&binding.path)) {
                let mut rebound = binding.clone();
                rebound.path = path;
                out.value.set_object_curve(rebound);
            }
        }

        // Fewer bindings can shorten the clip; pin it to the source length.
        let length = clip.length();
        if out.value.length() != length {
            out.value.set_curve(
                self.config.length_dummy_path.clone(),
                LENGTH_DUMMY_TYPE,
                LENGTH_DUMMY_PROPERTY,
                Curve::constant(length, length, 1.0),
            );
            out.mark_if(true);
        }

        out
    }

    fn rebase_mask(&mut self, mask: &Mask) -> Dirty<Mask> {
        let mut out = Dirty::clean(Mask {
            body_parts: mask.body_parts,
            transforms: Vec::with_capacity(mask.transforms.len()),
        });

        for entry in &mask.transforms {
            match self.resolver.resolve(&entry.path) {
                Some(path) => {
                    out.mark_if(path != entry.path);
                    out.value.push_transform(path, entry.active);
                }
                None => {
                    log::debug!("Dropping mask entry at unresolved path {:?}", entry.path);
                    out.mark_if(true);
                }
            }
        }

        out
    }
}

impl CloneRules for ClipRules<'_> {
    fn custom_clone(&mut self, id: AssetId, asset: &Asset) -> Result<CustomClone, RebaseError> {
        match &asset.data {
            AssetData::Clip(_) if self.pass_through.is_match(&asset.name) => {
                log::debug!("Passing through proxy clip {:?} ({})", asset.name, id);
                Ok(CustomClone::Unchanged)
            }
            AssetData::Clip(clip) => {
                let rebased = self.rebase_clip(clip);
                log::debug!(
                    "Clip {:?} ({}): {}",
                    asset.name,
                    id,
                    if rebased.changed { "rewritten" } else { "unchanged" }
                );
                Ok(CustomClone::Rewritten(rebased.map(|clip| {
                    Asset::new(self.rebased_name(&asset.name), AssetData::Clip(clip))
                })))
            }
            AssetData::Mask(mask) => {
                let rebased = self.rebase_mask(mask);
                Ok(CustomClone::Rewritten(rebased.map(|mask| {
                    Asset::new(self.rebased_name(&asset.name), AssetData::Mask(mask))
                })))
            }
            _ => Ok(CustomClone::NoRule),
        }
    }

    fn structural_name(&self, original: &str) -> String {
        format!("{}{}", original, self.config.container_suffix)
    }
}

/// Deep cloner for assets referenced from one anchor object.
#[derive(Debug)]
pub struct ClipRebaser<'a> {
    cloner: GraphCloner<ClipRules<'a>>,
}

impl<'a> ClipRebaser<'a> {
    /// `pass_through` is the compiled form of the config's pattern.
    pub fn new(resolver: PathResolver<'a>, config: &'a RebaseConfig, pass_through: &'a Regex) -> Self {
        Self {
            cloner: GraphCloner::new(ClipRules {
                resolver,
                config,
                pass_through,
            })
            .with_max_depth(config.max_graph_depth),
        }
    }

    /// Map an asset handle to itself or to its rebased copy.
    pub fn map_object(
        &mut self,
        store: &mut AssetStore,
        node: Option<AssetId>,
    ) -> Result<Option<AssetId>, RebaseError> {
        self.cloner.map_object(store, node)
    }

    pub fn deep_clone(
        &mut self,
        store: &mut AssetStore,
        node: Option<AssetId>,
    ) -> Result<Dirty<Option<AssetId>>, RebaseError> {
        self.cloner.deep_clone(store, node)
    }

    pub fn rules(&self) -> &ClipRules<'a> {
        self.cloner.rules()
    }

    pub fn stats(&self) -> CloneStats {
        self.cloner.stats()
    }
}
