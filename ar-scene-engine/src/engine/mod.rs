//! Scene state: registries, frame ingestion and the transform codec.

pub mod anchors;
pub mod frame;
pub mod nodes;
pub mod planes;
pub mod point_cloud;
pub mod transform;

use bevy::prelude::*;

use anchors::AnchorRegistry;
use frame::{CameraPose, FrameUpdate, SessionStatus, ingest_frame};
use nodes::NodeRegistry;
use planes::{DetectedPlanes, detect_planes};
use point_cloud::{PointCloudPool, PointCloudTracker, track_point_cloud};

/// System set for frame-tick processing; gesture handling is ordered after
/// it so a gesture event always sees the frame state of the same update.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameTracking;

/// Registers the registries and the per-frame tracking systems.
pub struct SceneEnginePlugin;

impl Plugin for SceneEnginePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NodeRegistry>()
            .init_resource::<AnchorRegistry>()
            .init_resource::<SessionStatus>()
            .init_resource::<CameraPose>()
            .init_resource::<DetectedPlanes>()
            .init_resource::<PointCloudPool>()
            .init_resource::<PointCloudTracker>()
            .add_event::<FrameUpdate>()
            .add_systems(
                Update,
                (ingest_frame, detect_planes, track_point_cloud)
                    .chain()
                    .in_set(FrameTracking),
            );
    }
}
