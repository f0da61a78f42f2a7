//! Errors raised while snapshotting hierarchies and rebasing asset graphs.

use thiserror::Error;

use crate::asset::{AssetId, AssetKind};
use crate::hierarchy::ObjectId;

/// Errors emitted by the rebasing engine.
#[derive(Debug, Error)]
pub enum RebaseError {
    /// The hierarchy root handed to the snapshot does not exist.
    #[error("hierarchy root {0} does not exist")]
    MissingRoot(ObjectId),

    /// A hierarchy handle points at a destroyed or never-created object.
    #[error("object {0} does not exist")]
    MissingObject(ObjectId),

    /// An object was not part of the hierarchy snapshot.
    #[error("object {0} was not captured by the snapshot")]
    NotCaptured(ObjectId),

    /// A component handle is out of range.
    #[error("component #{0} does not exist")]
    MissingComponent(usize),

    /// An asset handle points at an empty or out-of-range slot.
    #[error("asset {0} does not exist")]
    MissingAsset(AssetId),

    /// An asset of a kind nobody whitelisted was reached during traversal.
    #[error("unknown type referenced from asset graph: `{type_name}` ({id})")]
    UnsupportedAsset { id: AssetId, type_name: String },

    /// Containers are nested deeper than the traversal allows.
    #[error("asset graph nests more than {limit} containers (at {id})")]
    GraphTooDeep { id: AssetId, limit: usize },

    /// A rule declined to handle a kind that has no structural clone.
    #[error("{kind:?} asset {id} has no structural clone")]
    NoStructuralClone { id: AssetId, kind: AssetKind },

    /// Reparenting would make an object its own ancestor.
    #[error("cannot move {child} under its own descendant {parent}")]
    HierarchyCycle { child: ObjectId, parent: ObjectId },

    /// The configured pass-through pattern is not a valid regex.
    #[error("invalid pass-through pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
