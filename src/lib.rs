//! Hierarchy snapshotting, stale path resolution and copy-on-change rebasing
//! of asset graphs.
//!
//! Typical use: take a [`RebasePass`] before restructuring a [`Hierarchy`],
//! mutate it, then call [`RebasePass::finish`] to rewrite every asset
//! reference whose clips or masks point at moved objects.

pub mod asset;
pub mod clip_rebaser;
pub mod cloner;
pub mod config;
pub mod dirty;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod resolver;
pub mod session;
pub mod snapshot;

pub mod cli;

pub use asset::{Asset, AssetData, AssetId, AssetKind, AssetStore};
pub use clip_rebaser::ClipRebaser;
pub use cloner::{CloneRules, CustomClone, GraphCloner};
pub use config::{RebaseConfig, UnresolvedBindingPolicy};
pub use dirty::Dirty;
pub use document::RebaseDocument;
pub use error::RebaseError;
pub use hierarchy::{ComponentId, Hierarchy, ObjectId};
pub use resolver::PathResolver;
pub use session::{RebasePass, RebaseReport};
pub use snapshot::HierarchySnapshot;
