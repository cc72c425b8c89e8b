//! Registry of placed virtual objects.
//!
//! Nodes are keyed by a host-chosen unique name. The registry is the single
//! owner of node state; gesture systems and host transform commands mutate
//! entries through it and the change is visible to the very next frame tick
//! or host query — there is no buffering layer in between.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::engine::transform::{self, Decomposed};
use crate::error::SceneError;

/// Where the collaborator should load a node's model from. Loading itself
/// happens outside this crate; the registry only records the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// glTF bundled with the host application's assets.
    BundledAsset(String),
    /// GLB fetched from the web.
    Url(String),
    /// GLB in the host application's documents folder.
    FileSystemGlb(String),
    /// glTF in the host application's documents folder.
    FileSystemGltf(String),
}

/// Host-supplied description of a node to place.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub model: ModelSource,
    /// Flat column-major 4x4 matrix, the sole transform interchange format.
    pub transform: Vec<f32>,
}

/// A placed node. Rotation is stored as Euler radians (x pitch, y yaw,
/// z roll); the yaw component is what the rotation gesture manipulates.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub model: ModelSource,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub position_editable: bool,
    pub rotation_editable: bool,
    pub touchable: bool,
    /// Set when the node was parented to an anchor rather than placed
    /// free-standing.
    pub parent_anchor: Option<String>,
}

impl NodeEntry {
    fn from_decomposed(model: ModelSource, d: Decomposed) -> Self {
        Self {
            model,
            position: d.position,
            rotation: d.rotation,
            scale: d.scale,
            position_editable: false,
            rotation_editable: false,
            touchable: true,
            parent_anchor: None,
        }
    }

    /// Current transform in the host wire format.
    pub fn world_transform(&self) -> [f32; 16] {
        transform::compose(self.position, self.rotation, self.scale)
    }
}

#[derive(Resource, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, NodeEntry>,
}

impl NodeRegistry {
    /// Inserts a new node built from `spec`. The registry is left unchanged
    /// when the name collides or the matrix is malformed.
    pub fn add(&mut self, spec: &NodeSpec) -> Result<String, SceneError> {
        if self.nodes.contains_key(&spec.name) {
            return Err(SceneError::DuplicateName(spec.name.clone()));
        }
        let decomposed = transform::decompose(&spec.transform)?;
        self.nodes.insert(
            spec.name.clone(),
            NodeEntry::from_decomposed(spec.model.clone(), decomposed),
        );
        Ok(spec.name.clone())
    }

    /// Removes a node, detaching it from any parent anchor first. Returns
    /// the removed node's name; a second call for the same name fails with
    /// [`SceneError::NodeNotFound`].
    pub fn remove(&mut self, name: &str) -> Result<(String, Option<String>), SceneError> {
        match self.nodes.remove(name) {
            Some(entry) => Ok((name.to_string(), entry.parent_anchor)),
            None => Err(SceneError::NodeNotFound(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodeEntry> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NodeEntry> {
        self.nodes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replaces a node's transform from a host matrix.
    pub fn set_transform(&mut self, name: &str, matrix: &[f32]) -> Result<(), SceneError> {
        let decomposed = transform::decompose(matrix)?;
        let entry = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;
        entry.position = decomposed.position;
        entry.rotation = decomposed.rotation;
        entry.scale = decomposed.scale;
        Ok(())
    }

    /// Updates a node's editability flags. A no-op (not an error) when the
    /// registry is empty; fails with [`SceneError::NodeNotFound`] when nodes
    /// exist but the name does not.
    pub fn set_editable(
        &mut self,
        name: &str,
        position_editable: bool,
        rotation_editable: bool,
    ) -> Result<(), SceneError> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let entry = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;
        entry.position_editable = position_editable;
        entry.rotation_editable = rotation_editable;
        entry.touchable = true;
        Ok(())
    }

    /// Applies the session-wide gesture settings to every node, mirroring
    /// how newly enabled gestures must reach already-placed nodes.
    pub fn apply_editability(&mut self, position_editable: bool, rotation_editable: bool) {
        for entry in self.nodes.values_mut() {
            entry.position_editable = position_editable;
            entry.rotation_editable = rotation_editable;
            entry.touchable = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            model: ModelSource::BundledAsset("models/duck.glb".to_string()),
            transform: Mat4::IDENTITY.to_cols_array().to_vec(),
        }
    }

    #[test]
    fn duplicate_name_leaves_registry_unchanged() {
        let mut registry = NodeRegistry::default();
        registry.add(&spec("n1")).unwrap();

        let mut second = spec("n1");
        second.transform = Mat4::from_translation(Vec3::X).to_cols_array().to_vec();
        assert_eq!(
            registry.add(&second),
            Err(SceneError::DuplicateName("n1".to_string()))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("n1").unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn remove_is_not_idempotent() {
        let mut registry = NodeRegistry::default();
        registry.add(&spec("n1")).unwrap();
        assert_eq!(registry.remove("n1").unwrap().0, "n1");
        assert_eq!(
            registry.remove("n1"),
            Err(SceneError::NodeNotFound("n1".to_string()))
        );
    }

    #[test]
    fn set_transform_rejects_malformed_matrix() {
        let mut registry = NodeRegistry::default();
        registry.add(&spec("n1")).unwrap();
        assert!(matches!(
            registry.set_transform("n1", &[1.0, 2.0, 3.0]),
            Err(SceneError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.set_transform("missing", &Mat4::IDENTITY.to_cols_array()),
            Err(SceneError::NodeNotFound(_))
        ));
    }

    #[test]
    fn set_editable_is_noop_on_empty_registry() {
        let mut registry = NodeRegistry::default();
        assert_eq!(registry.set_editable("anything", true, true), Ok(()));

        registry.add(&spec("n1")).unwrap();
        assert!(matches!(
            registry.set_editable("missing", true, true),
            Err(SceneError::NodeNotFound(_))
        ));
        registry.set_editable("n1", true, false).unwrap();
        let entry = registry.get("n1").unwrap();
        assert!(entry.position_editable);
        assert!(!entry.rotation_editable);
    }
}
