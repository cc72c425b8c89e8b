//! Registry of spatial anchors.
//!
//! An anchor pins a pose in real-world space. Once an anchor has been
//! uploaded to the sharing service its cloud identifier is bound here and
//! stays immutable for the anchor's lifetime.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::engine::transform;
use crate::error::SceneError;

/// World pose of an anchor: position plus rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Builds a pose from the host's flat column-major matrix. Scale is
    /// discarded — anchors carry position and rotation only.
    pub fn from_matrix(matrix: &[f32]) -> Result<Self, SceneError> {
        let d = transform::decompose(matrix)?;
        Ok(Self {
            position: d.position,
            rotation: transform::quat_from_euler(d.rotation),
        })
    }

    /// Pose in the host wire format.
    pub fn to_matrix(&self) -> [f32; 16] {
        Mat4::from_rotation_translation(self.rotation, self.position).to_cols_array()
    }
}

#[derive(Debug, Clone)]
pub struct AnchorEntry {
    pub pose: Pose,
    pub cloud_id: Option<String>,
    /// Names of nodes parented to this anchor.
    pub children: HashSet<String>,
}

#[derive(Resource, Default)]
pub struct AnchorRegistry {
    anchors: HashMap<String, AnchorEntry>,
}

impl AnchorRegistry {
    pub fn add(&mut self, name: &str, pose: Pose) -> Result<(), SceneError> {
        if self.anchors.contains_key(name) {
            return Err(SceneError::DuplicateName(name.to_string()));
        }
        self.anchors.insert(
            name.to_string(),
            AnchorEntry {
                pose,
                cloud_id: None,
                children: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Removes an anchor, returning its entry so the caller can detach the
    /// children recorded on it.
    pub fn remove(&mut self, name: &str) -> Result<AnchorEntry, SceneError> {
        self.anchors
            .remove(name)
            .ok_or_else(|| SceneError::AnchorNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&AnchorEntry> {
        self.anchors.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AnchorEntry> {
        self.anchors.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.anchors.contains_key(name)
    }

    /// Binds the cloud identifier the hosting service assigned. Fails with
    /// [`SceneError::AlreadyBound`] if one is already set — the binding is
    /// immutable for the anchor's lifetime.
    pub fn attach_cloud_id(&mut self, name: &str, cloud_id: &str) -> Result<(), SceneError> {
        let entry = self
            .anchors
            .get_mut(name)
            .ok_or_else(|| SceneError::AnchorNotFound(name.to_string()))?;
        if let Some(existing) = &entry.cloud_id {
            return Err(SceneError::AlreadyBound {
                anchor: name.to_string(),
                cloud_id: existing.clone(),
            });
        }
        entry.cloud_id = Some(cloud_id.to_string());
        Ok(())
    }

    pub fn attach_child(&mut self, anchor: &str, node: &str) -> Result<(), SceneError> {
        let entry = self
            .anchors
            .get_mut(anchor)
            .ok_or_else(|| SceneError::AnchorNotFound(anchor.to_string()))?;
        entry.children.insert(node.to_string());
        Ok(())
    }

    /// Drops the parent link for a node that was removed. Missing anchors
    /// are ignored — removal order between a node and its anchor is the
    /// host's business.
    pub fn detach_child(&mut self, anchor: &str, node: &str) {
        if let Some(entry) = self.anchors.get_mut(anchor) {
            entry.children.remove(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_anchor_name_is_rejected() {
        let mut registry = AnchorRegistry::default();
        registry.add("a1", Pose::IDENTITY).unwrap();
        assert_eq!(
            registry.add("a1", Pose::IDENTITY),
            Err(SceneError::DuplicateName("a1".to_string()))
        );
    }

    #[test]
    fn cloud_id_binds_once() {
        let mut registry = AnchorRegistry::default();
        registry.add("a1", Pose::IDENTITY).unwrap();
        registry.attach_cloud_id("a1", "cid-123").unwrap();
        assert_eq!(
            registry.attach_cloud_id("a1", "cid-456"),
            Err(SceneError::AlreadyBound {
                anchor: "a1".to_string(),
                cloud_id: "cid-123".to_string(),
            })
        );
        assert_eq!(
            registry.get("a1").unwrap().cloud_id.as_deref(),
            Some("cid-123")
        );
    }

    #[test]
    fn remove_reports_missing_anchor() {
        let mut registry = AnchorRegistry::default();
        assert_eq!(
            registry.remove("a1").unwrap_err(),
            SceneError::AnchorNotFound("a1".to_string())
        );
    }

    #[test]
    fn pose_matrix_round_trip() {
        let pose = Pose {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
        };
        let rebuilt = Pose::from_matrix(&pose.to_matrix()).unwrap();
        assert!((rebuilt.position - pose.position).length() < 1e-4);
        assert!(rebuilt.rotation.angle_between(pose.rotation) < 1e-4);
    }
}
