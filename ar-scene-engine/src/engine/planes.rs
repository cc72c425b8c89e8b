//! Deduplication of newly-tracked planes and the ground-height latch.
//!
//! The detected set only ever grows for the lifetime of the scene; there is
//! no mechanism to un-detect a plane. The first tracked plane's center
//! height is latched once and constrains pan movement from then on.

use bevy::prelude::*;
use std::collections::HashSet;

use crate::engine::frame::{FrameUpdate, SessionStatus, TrackingState};
use crate::rpc::host_channel::{HostChannel, SceneEvent};

#[derive(Resource, Default)]
pub struct DetectedPlanes {
    seen: HashSet<u64>,
    ground_height: Option<f32>,
}

impl DetectedPlanes {
    pub fn count(&self) -> usize {
        self.seen.len()
    }

    /// Height of the first plane ever tracked, if any.
    pub fn ground_height(&self) -> Option<f32> {
        self.ground_height
    }
}

/// Records planes the collaborator newly tracks and reports the growing
/// count to the host. Only planes in the `Tracking` state participate.
pub fn detect_planes(
    mut frames: EventReader<FrameUpdate>,
    status: Res<SessionStatus>,
    mut detected: ResMut<DetectedPlanes>,
    mut host: ResMut<HostChannel>,
) {
    for frame in frames.read() {
        if status.paused {
            continue;
        }
        for plane in &frame.planes {
            if plane.state != TrackingState::Tracking {
                continue;
            }
            if !detected.seen.insert(plane.id) {
                continue;
            }
            if detected.ground_height.is_none() {
                detected.ground_height = Some(plane.center.y);
                info!(
                    "latched ground height {} from first tracked plane",
                    plane.center.y
                );
            }
            host.notify(SceneEvent::PlaneDetected {
                count: detected.seen.len(),
            });
        }
    }
}
