//! Live object hierarchy the rebaser inspects.
//!
//! Objects live in an arena and are addressed by [`ObjectId`] handles, so the
//! identity of an object survives renames and reparenting. Each object has a
//! name, an active flag, an ordered list of children and any number of
//! components. Components hold named reference fields pointing into the asset
//! store; those are the fields the rebase pass rewrites.
//!
//! Paths are `/`-joined object names relative to some anchor object. The
//! anchor itself is the empty path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::error::RebaseError;

/// Separator between object names in a relative path.
pub const PATH_SEPARATOR: &str = "/";

/// Stable identity token for a live hierarchy object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Index of a component inside a [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub usize);

/// A named node of the live hierarchy.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub name: String,
    pub active: bool,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

impl GameObject {
    fn new(name: String, parent: Option<ObjectId>) -> Self {
        Self {
            name,
            active: true,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }
}

/// A single reference-typed field of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceField {
    pub name: String,
    pub asset: Option<AssetId>,
}

/// Data attached to an object that may reference assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// The object owning this component.
    pub object: ObjectId,
    /// Free-form type label (for logs and documents).
    pub type_name: String,
    /// Reference fields in declaration order.
    pub references: Vec<ReferenceField>,
}

/// Arena of live objects and their components.
#[derive(Debug, Default)]
pub struct Hierarchy {
    objects: Vec<Option<GameObject>>,
    components: Vec<Component>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, object: GameObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Some(object));
        id
    }

    /// Create a parentless object.
    pub fn create_root(&mut self, name: impl Into<String>) -> ObjectId {
        self.alloc(GameObject::new(name.into(), None))
    }

    /// Create an object as the last child of `parent`.
    pub fn create_child(
        &mut self,
        parent: ObjectId,
        name: impl Into<String>,
    ) -> Result<ObjectId, RebaseError> {
        if !self.contains(parent) {
            return Err(RebaseError::MissingObject(parent));
        }
        let id = self.alloc(GameObject::new(name.into(), Some(parent)));
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Check whether a handle refers to a live object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut GameObject, RebaseError> {
        self.objects
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(RebaseError::MissingObject(id))
    }

    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.get(id).map(|o| o.name.as_str())
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id).and_then(|o| o.parent)
    }

    /// Ordered children of an object (empty for dead handles).
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.get(id).map(|o| o.children.as_slice()).unwrap_or(&[])
    }

    /// Position of an object among its parent's children.
    pub fn sibling_index(&self, id: ObjectId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn set_active(&mut self, id: ObjectId, active: bool) -> Result<(), RebaseError> {
        self.get_mut(id)?.active = active;
        Ok(())
    }

    pub fn rename(&mut self, id: ObjectId, name: impl Into<String>) -> Result<(), RebaseError> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    /// Number of object slots ever allocated, dead ones included.
    pub fn slot_count(&self) -> usize {
        self.objects.len()
    }

    /// Check whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn set_parent(&mut self, child: ObjectId, parent: ObjectId) -> Result<(), RebaseError> {
        if !self.contains(child) {
            return Err(RebaseError::MissingObject(child));
        }
        if !self.contains(parent) {
            return Err(RebaseError::MissingObject(parent));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(RebaseError::HierarchyCycle { child, parent });
        }

        self.detach(child)?;
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Reparent every listed object under `parent`, in order.
    pub fn make_children(
        &mut self,
        parent: ObjectId,
        children: &[ObjectId],
    ) -> Result<(), RebaseError> {
        for &child in children {
            log::debug!("Moving {} under {}", child, parent);
            self.set_parent(child, parent)?;
        }
        Ok(())
    }

    fn detach(&mut self, id: ObjectId) -> Result<(), RebaseError> {
        if let Some(old_parent) = self.parent(id) {
            self.get_mut(old_parent)?.children.retain(|&c| c != id);
        }
        self.get_mut(id)?.parent = None;
        Ok(())
    }

    /// Destroy an object and its whole subtree.
    pub fn destroy(&mut self, id: ObjectId) -> Result<(), RebaseError> {
        if !self.contains(id) {
            return Err(RebaseError::MissingObject(id));
        }
        self.detach(id)?;
        for dead in self.descendants(id) {
            self.objects[dead.0 as usize] = None;
        }
        Ok(())
    }

    /// All objects under `root` in pre-order, `root` first. Inactive objects
    /// are included.
    pub fn descendants(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Current path of `target` relative to `anchor`.
    ///
    /// Returns `None` if either handle is dead or `target` is not inside
    /// `anchor`'s subtree.
    pub fn relative_path(&self, anchor: ObjectId, target: ObjectId) -> Option<String> {
        if !self.contains(anchor) {
            return None;
        }
        let mut names = Vec::new();
        let mut current = target;
        while current != anchor {
            names.push(self.name(current)?);
            current = self.parent(current)?;
        }
        names.reverse();
        Some(names.join(PATH_SEPARATOR))
    }

    /// Attach a new component without any references.
    pub fn add_component(
        &mut self,
        object: ObjectId,
        type_name: impl Into<String>,
    ) -> Result<ComponentId, RebaseError> {
        if !self.contains(object) {
            return Err(RebaseError::MissingObject(object));
        }
        let id = ComponentId(self.components.len());
        self.components.push(Component {
            object,
            type_name: type_name.into(),
            references: Vec::new(),
        });
        Ok(id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    /// Set (or add) a named reference field on a component.
    pub fn set_reference(
        &mut self,
        component: ComponentId,
        field: &str,
        asset: Option<AssetId>,
    ) -> Result<(), RebaseError> {
        let component = self
            .components
            .get_mut(component.0)
            .ok_or(RebaseError::MissingComponent(component.0))?;

        match component.references.iter_mut().find(|r| r.name == field) {
            Some(existing) => existing.asset = asset,
            None => component.references.push(ReferenceField {
                name: field.to_string(),
                asset,
            }),
        }
        Ok(())
    }

    /// Read a named reference field.
    pub fn reference(&self, component: ComponentId, field: &str) -> Option<AssetId> {
        self.component(component)?
            .references
            .iter()
            .find(|r| r.name == field)
            .and_then(|r| r.asset)
    }

    /// Components owned by live objects under `root`, including inactive ones.
    pub fn components_in_children(&self, root: ObjectId) -> Vec<ComponentId> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| self.contains(c.object) && self.is_ancestor_or_self(root, c.object))
            .map(|(i, _)| ComponentId(i))
            .collect()
    }

    /// All components, in creation order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }
}
