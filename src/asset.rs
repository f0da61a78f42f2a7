//! Asset graph model.
//!
//! Assets live in an [`AssetStore`] arena and reference each other by
//! [`AssetId`]. The graph may share sub-assets between several parents and
//! may contain cycles (a state machine transition pointing back at its own
//! state, for example). Each asset carries a closed, tagged [`AssetData`]
//! payload; [`AssetKind::policy`] decides how the cloner treats each kind.
//!
//! ## Kinds
//!
//! - `Clip` and `Mask` hold hierarchy paths and get dedicated rewrite rules.
//! - `Container` aggregates references to other assets and is cloned
//!   structurally.
//! - `Opaque` and `OpaqueScriptable` are passed through untouched.
//! - `Unsupported` aborts traversal.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::RebaseError;

/// Stable identity token for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Payload-less tag of an [`AssetData`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Clip,
    Mask,
    Container,
    Opaque,
    OpaqueScriptable,
    Unsupported,
}

/// How the graph cloner treats an asset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClonePolicy {
    /// Eligible for rewriting: custom rule or structural clone.
    Clone,
    /// Returned as-is without looking inside.
    PassThrough,
    /// Reaching it aborts the rebase.
    Reject,
}

impl AssetKind {
    pub fn policy(self) -> ClonePolicy {
        match self {
            AssetKind::Clip | AssetKind::Mask | AssetKind::Container => ClonePolicy::Clone,
            AssetKind::Opaque | AssetKind::OpaqueScriptable => ClonePolicy::PassThrough,
            AssetKind::Unsupported => ClonePolicy::Reject,
        }
    }
}

/// Categories of assets that never need rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpaqueCategory {
    Texture,
    Material,
    Mesh,
    Script,
    GameObject,
}

/// Tagged asset payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssetData {
    Clip(Clip),
    Mask(Mask),
    Container(Container),
    #[serde(rename_all = "camelCase")]
    Opaque { category: OpaqueCategory },
    /// Scriptable state of a type this crate knows nothing about.
    #[serde(rename_all = "camelCase")]
    OpaqueScriptable { type_name: String },
    #[serde(rename_all = "camelCase")]
    Unsupported { type_name: String },
}

impl AssetData {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetData::Clip(_) => AssetKind::Clip,
            AssetData::Mask(_) => AssetKind::Mask,
            AssetData::Container(_) => AssetKind::Container,
            AssetData::Opaque { .. } => AssetKind::Opaque,
            AssetData::OpaqueScriptable { .. } => AssetKind::OpaqueScriptable,
            AssetData::Unsupported { .. } => AssetKind::Unsupported,
        }
    }

    /// Human-readable type label used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            AssetData::Clip(_) => "Clip".to_string(),
            AssetData::Mask(_) => "Mask".to_string(),
            AssetData::Container(c) => format!("{:?}", c.kind),
            AssetData::Opaque { category } => format!("{:?}", category),
            AssetData::OpaqueScriptable { type_name } | AssetData::Unsupported { type_name } => {
                type_name.clone()
            }
        }
    }
}

/// A named asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(flatten)]
    pub data: AssetData,
}

impl Asset {
    pub fn new(name: impl Into<String>, data: AssetData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.data.kind()
    }
}

// === Clips ===

/// A single key of a float curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            ..Default::default()
        }
    }
}

/// Time-keyed float curve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    pub keys: Vec<Keyframe>,
}

impl Curve {
    pub fn new(keys: Vec<Keyframe>) -> Self {
        Self { keys }
    }

    /// Flat curve holding `value` from `start` to `end`.
    pub fn constant(start: f32, end: f32, value: f32) -> Self {
        Self {
            keys: vec![Keyframe::new(start, value), Keyframe::new(end, value)],
        }
    }

    /// Time of the last key, or 0.0 for an empty curve.
    pub fn end_time(&self) -> f32 {
        self.keys.iter().map(|k| k.time).fold(0.0, f32::max)
    }
}

/// A float property animated at some hierarchy path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveBinding {
    pub path: String,
    pub type_name: String,
    pub property: String,
    pub curve: Curve,
}

/// A key of an object-reference curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectKeyframe {
    pub time: f32,
    pub value: Option<AssetId>,
}

/// An object-reference property (sprite swaps, material swaps) animated at
/// some hierarchy path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCurveBinding {
    pub path: String,
    pub type_name: String,
    pub property: String,
    pub keys: Vec<ObjectKeyframe>,
}

impl ObjectCurveBinding {
    pub fn end_time(&self) -> f32 {
        self.keys.iter().map(|k| k.time).fold(0.0, f32::max)
    }
}

/// How a clip behaves past its end when played by legacy players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapMode {
    #[default]
    Default,
    Once,
    Loop,
    PingPong,
    ClampForever,
}

/// Local-space bounding box of the animated content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

/// Playback settings copied verbatim between clips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipSettings {
    pub start_time: f32,
    pub stop_time: f32,
    pub loop_time: bool,
    pub loop_blend: bool,
    pub cycle_offset: f32,
    pub mirror: bool,
    pub height_from_feet: bool,
    pub keep_original_position_y: bool,
}

fn default_frame_rate() -> f32 {
    60.0
}

/// A time-keyed asset holding path-addressed property curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    #[serde(default)]
    pub curves: Vec<CurveBinding>,
    #[serde(default)]
    pub object_curves: Vec<ObjectCurveBinding>,
    #[serde(default)]
    pub wrap_mode: WrapMode,
    #[serde(default)]
    pub legacy: bool,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default)]
    pub local_bounds: Bounds,
    #[serde(default)]
    pub settings: ClipSettings,
    #[serde(default)]
    pub high_quality_curve: bool,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            curves: Vec::new(),
            object_curves: Vec::new(),
            wrap_mode: WrapMode::default(),
            legacy: false,
            frame_rate: default_frame_rate(),
            local_bounds: Bounds::default(),
            settings: ClipSettings::default(),
            high_quality_curve: false,
        }
    }
}

impl Clip {
    /// Duration in seconds: the latest key time over every binding.
    pub fn length(&self) -> f32 {
        let curves = self.curves.iter().map(|b| b.curve.end_time());
        let objects = self.object_curves.iter().map(ObjectCurveBinding::end_time);
        curves.chain(objects).fold(0.0, f32::max)
    }

    /// Total number of bindings of either flavour.
    pub fn binding_count(&self) -> usize {
        self.curves.len() + self.object_curves.len()
    }

    /// Add or replace the float curve bound at `(path, type_name, property)`.
    pub fn set_curve(
        &mut self,
        path: impl Into<String>,
        type_name: impl Into<String>,
        property: impl Into<String>,
        curve: Curve,
    ) {
        let binding = CurveBinding {
            path: path.into(),
            type_name: type_name.into(),
            property: property.into(),
            curve,
        };
        match self.curves.iter_mut().find(|b| {
            b.path == binding.path
                && b.type_name == binding.type_name
                && b.property == binding.property
        }) {
            Some(existing) => *existing = binding,
            None => self.curves.push(binding),
        }
    }

    /// Add or replace an object-reference binding with the same
    /// `(path, type_name, property)`.
    pub fn set_object_curve(&mut self, binding: ObjectCurveBinding) {
        match self.object_curves.iter_mut().find(|b| {
            b.path == binding.path
                && b.type_name == binding.type_name
                && b.property == binding.property
        }) {
            Some(existing) => *existing = binding,
            None => self.object_curves.push(binding),
        }
    }
}

// === Masks ===

/// Humanoid body parts a mask can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Root,
    Body,
    Head,
    LeftLeg,
    RightLeg,
    LeftArm,
    RightArm,
    LeftFingers,
    RightFingers,
    LeftFootIk,
    RightFootIk,
    LeftHandIk,
    RightHandIk,
}

pub const BODY_PART_COUNT: usize = 13;

/// One transform path entry of a mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskTransform {
    pub path: String,
    pub active: bool,
}

/// An asset listing a subset of hierarchy paths flagged active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mask {
    #[serde(default = "all_body_parts")]
    pub body_parts: [bool; BODY_PART_COUNT],
    #[serde(default)]
    pub transforms: Vec<MaskTransform>,
}

fn all_body_parts() -> [bool; BODY_PART_COUNT] {
    [true; BODY_PART_COUNT]
}

impl Default for Mask {
    fn default() -> Self {
        Self {
            body_parts: all_body_parts(),
            transforms: Vec::new(),
        }
    }
}

impl Mask {
    pub fn body_part_active(&self, part: BodyPart) -> bool {
        self.body_parts[part as usize]
    }

    pub fn set_body_part_active(&mut self, part: BodyPart, active: bool) {
        self.body_parts[part as usize] = active;
    }

    pub fn push_transform(&mut self, path: impl Into<String>, active: bool) {
        self.transforms.push(MaskTransform {
            path: path.into(),
            active,
        });
    }
}

// === Containers ===

/// Aggregate asset kinds that are cloned structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    Controller,
    OverrideController,
    StateMachine,
    State,
    Transition,
    BlendTree,
    Behaviour,
}

/// A named reference slot of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub target: Option<AssetId>,
}

/// An aggregate asset referencing clips, masks and other containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "type")]
    pub kind: ContainerKind,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Container {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    /// Builder: append a slot.
    pub fn with_slot(mut self, name: impl Into<String>, target: Option<AssetId>) -> Self {
        self.slots.push(Slot {
            name: name.into(),
            target,
        });
        self
    }

    /// Target of the first slot with the given name.
    pub fn slot(&self, name: &str) -> Option<AssetId> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.target)
    }
}

// === Store ===

/// Arena of assets addressed by [`AssetId`].
///
/// Slots are never reused: a removed asset leaves an empty slot behind so
/// outstanding handles cannot alias a newer asset.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetStore {
    slots: Vec<Option<Asset>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset) -> AssetId {
        let id = AssetId(self.slots.len() as u32);
        self.slots.push(Some(asset));
        id
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Like [`AssetStore::get`] but reports a missing asset as an error.
    pub fn require(&self, id: AssetId) -> Result<&Asset, RebaseError> {
        self.get(id).ok_or(RebaseError::MissingAsset(id))
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Remove an asset, leaving its slot empty.
    pub fn remove(&mut self, id: AssetId) -> Option<Asset> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.get(id).is_some()
    }

    /// Number of slots ever allocated, empty ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Forget every slot allocated at or after `slot_count`.
    ///
    /// Used to roll back the inserts of a failed rebase.
    pub fn truncate(&mut self, slot_count: usize) {
        self.slots.truncate(slot_count);
    }

    /// Number of live assets.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live assets with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &Asset)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|a| (AssetId(i as u32), a)))
    }

    pub fn clip(&self, id: AssetId) -> Option<&Clip> {
        match &self.get(id)?.data {
            AssetData::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn mask(&self, id: AssetId) -> Option<&Mask> {
        match &self.get(id)?.data {
            AssetData::Mask(mask) => Some(mask),
            _ => None,
        }
    }

    pub fn container(&self, id: AssetId) -> Option<&Container> {
        match &self.get(id)?.data {
            AssetData::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn container_mut(&mut self, id: AssetId) -> Option<&mut Container> {
        match &mut self.get_mut(id)?.data {
            AssetData::Container(container) => Some(container),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_per_kind() {
        assert_eq!(AssetKind::Clip.policy(), ClonePolicy::Clone);
        assert_eq!(AssetKind::Container.policy(), ClonePolicy::Clone);
        assert_eq!(AssetKind::OpaqueScriptable.policy(), ClonePolicy::PassThrough);
        assert_eq!(AssetKind::Unsupported.policy(), ClonePolicy::Reject);
    }

    #[test]
    fn test_clip_length_covers_all_bindings() {
        let mut clip = Clip::default();
        assert_eq!(clip.length(), 0.0);

        clip.set_curve("A", "Transform", "x", Curve::constant(0.0, 1.5, 1.0));
        clip.object_curves.push(ObjectCurveBinding {
            path: "B".to_string(),
            type_name: "Renderer".to_string(),
            property: "material".to_string(),
            keys: vec![ObjectKeyframe {
                time: 2.0,
                value: None,
            }],
        });

        assert!((clip.length() - 2.0).abs() < 1e-6);
        assert_eq!(clip.binding_count(), 2);
    }

    #[test]
    fn test_set_curve_replaces_same_binding() {
        let mut clip = Clip::default();
        clip.set_curve("A", "Transform", "x", Curve::constant(0.0, 1.0, 1.0));
        clip.set_curve("A", "Transform", "x", Curve::constant(0.0, 3.0, 1.0));
        assert_eq!(clip.curves.len(), 1);
        assert!((clip.length() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_store_remove_leaves_hole() {
        let mut store = AssetStore::new();
        let a = store.insert(Asset::new("a", AssetData::Mask(Mask::default())));
        let b = store.insert(Asset::new("b", AssetData::Mask(Mask::default())));

        assert!(store.remove(a).is_some());
        assert!(!store.contains(a));
        assert!(store.contains(b));
        assert_eq!(store.len(), 1);

        let c = store.insert(Asset::new("c", AssetData::Mask(Mask::default())));
        assert_ne!(c, a);
        assert!(matches!(store.require(a), Err(RebaseError::MissingAsset(_))));
    }

    #[test]
    fn test_truncate_rolls_back_inserts() {
        let mut store = AssetStore::new();
        let kept = store.insert(Asset::new("kept", AssetData::Mask(Mask::default())));
        let mark = store.slot_count();
        let late = store.insert(Asset::new("late", AssetData::Mask(Mask::default())));

        store.truncate(mark);
        assert!(store.contains(kept));
        assert!(!store.contains(late));
        assert_eq!(store.slot_count(), 1);
    }

    #[test]
    fn test_asset_json_shape() {
        let json = r#"{
            "name": "Idle",
            "kind": "container",
            "type": "state",
            "slots": [{ "name": "motion", "target": 3 }]
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.kind(), AssetKind::Container);
        match &asset.data {
            AssetData::Container(c) => {
                assert_eq!(c.kind, ContainerKind::State);
                assert_eq!(c.slot("motion"), Some(AssetId(3)));
            }
            other => panic!("Expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_mask_defaults_enable_body_parts() {
        let mask: Mask = serde_json::from_str(r#"{ "transforms": [] }"#).unwrap();
        assert!(mask.body_part_active(BodyPart::LeftFingers));
    }
}
