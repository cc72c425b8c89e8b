//! Per-frame signals arriving from the AR tracking collaborator.
//!
//! The collaborator owns camera pose estimation, plane/point detection and
//! hit-testing; this crate only consumes the digest it delivers each frame.
//! Frame ingestion never blocks: everything here is applied synchronously on
//! the scene schedule.

use bevy::prelude::*;

use crate::engine::anchors::Pose;
use crate::rpc::host_channel::HostChannel;

/// Tracking state of a trackable, as reported by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Tracking,
    Paused,
    Stopped,
}

/// A plane the collaborator is tracking this frame. The id is opaque and
/// stable for the plane's lifetime.
#[derive(Debug, Clone)]
pub struct TrackedPlane {
    pub id: u64,
    pub center: Vec3,
    pub state: TrackingState,
}

/// One sample of the collaborator's point cloud. Identity is the per-frame
/// index; it is not stable across frames.
#[derive(Debug, Clone, Copy)]
pub struct PointSample {
    pub position: Vec3,
    pub confidence: f32,
}

/// A point-cloud capture. The collaborator often redelivers the same cloud
/// across polls, so the timestamp is the dedup key.
#[derive(Debug, Clone)]
pub struct PointCloudFrame {
    pub timestamp: i64,
    pub points: Vec<PointSample>,
}

/// Collaborator-reported quality of the visual feature map around the
/// camera, gating cloud anchor hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureMapQuality {
    Insufficient,
    Sufficient,
    Good,
}

impl FeatureMapQuality {
    pub fn can_host(self) -> bool {
        !matches!(self, Self::Insufficient)
    }
}

/// One frame tick from the tracking collaborator.
#[derive(Event, Debug, Clone)]
pub struct FrameUpdate {
    pub planes: Vec<TrackedPlane>,
    pub point_cloud: Option<PointCloudFrame>,
    pub camera_pose: Option<Pose>,
    pub feature_map_quality: FeatureMapQuality,
    /// Measured delivery rate, used to throttle point-cloud redraw.
    pub frame_rate: f32,
    /// Set when the collaborator reports a tracking failure this frame.
    pub tracking_failure: Option<String>,
}

impl Default for FrameUpdate {
    fn default() -> Self {
        Self {
            planes: Vec::new(),
            point_cloud: None,
            camera_pose: None,
            feature_map_quality: FeatureMapQuality::Sufficient,
            frame_rate: 30.0,
            tracking_failure: None,
        }
    }
}

/// Session-level flags shared across systems and the facade.
#[derive(Resource)]
pub struct SessionStatus {
    /// Cleared while the tracking collaborator has no live session; cloud
    /// anchor operations fail fast until it comes back.
    pub available: bool,
    /// While paused, frame updates are skipped (logged, never surfaced).
    pub paused: bool,
    /// Latest collaborator-reported feature map quality.
    pub feature_map_quality: FeatureMapQuality,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            available: true,
            paused: false,
            feature_map_quality: FeatureMapQuality::Sufficient,
        }
    }
}

/// Latest camera pose seen on a frame tick, if any.
#[derive(Resource, Default)]
pub struct CameraPose(pub Option<Pose>);

/// Applies session-level frame state: camera pose, feature map quality and
/// tracking failure forwarding. Skips everything while the session is
/// paused — a paused session redelivering frames is a normal, recoverable
/// condition, not an error.
pub fn ingest_frame(
    mut frames: EventReader<FrameUpdate>,
    mut status: ResMut<SessionStatus>,
    mut camera: ResMut<CameraPose>,
    mut host: ResMut<HostChannel>,
) {
    for frame in frames.read() {
        if status.paused {
            debug!("session paused, skipping frame update");
            continue;
        }
        status.feature_map_quality = frame.feature_map_quality;
        if let Some(pose) = frame.camera_pose {
            camera.0 = Some(pose);
        }
        if let Some(reason) = &frame.tracking_failure {
            host.notify(crate::rpc::host_channel::SceneEvent::TrackingFailure {
                reason: reason.clone(),
            });
        }
    }
}
