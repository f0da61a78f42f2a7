//! Rebase configuration.
//!
//! Every field has a default, so a config file only needs to name the knobs
//! it changes.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cloner::DEFAULT_MAX_DEPTH;
use crate::error::RebaseError;

/// What to do with a clip binding whose path no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnresolvedBindingPolicy {
    /// Keep the binding with its stale path.
    #[default]
    Retain,
    /// Remove the binding from the rewritten clip.
    Drop,
}

/// Knobs for a rebase pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RebaseConfig {
    /// Clips whose name matches this regex are never rewritten.
    pub pass_through_pattern: String,
    /// Prepended to the name of rewritten clips and masks.
    pub rebased_prefix: String,
    /// Appended to the name of structurally cloned containers.
    pub container_suffix: String,
    /// Binding path of the curve that pins a rewritten clip's length.
    pub length_dummy_path: String,
    pub unresolved_clip_bindings: UnresolvedBindingPolicy,
    /// Deepest container nesting a rebase will follow.
    pub max_graph_depth: usize,
}

impl Default for RebaseConfig {
    fn default() -> Self {
        Self {
            pass_through_pattern: "^proxy_".to_string(),
            rebased_prefix: "rebased ".to_string(),
            container_suffix: " (rebased)".to_string(),
            length_dummy_path: "$AvatarOptimizerClipLengthDummy$".to_string(),
            unresolved_clip_bindings: UnresolvedBindingPolicy::Retain,
            max_graph_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RebaseConfig {
    /// Compile the pass-through pattern.
    pub fn pass_through_regex(&self) -> Result<Regex, RebaseError> {
        Ok(Regex::new(&self.pass_through_pattern)?)
    }

    /// Builder: set the unresolved-binding policy.
    pub fn with_unresolved_clip_bindings(mut self, policy: UnresolvedBindingPolicy) -> Self {
        self.unresolved_clip_bindings = policy;
        self
    }
}
