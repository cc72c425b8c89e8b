use bevy::prelude::*;

use super::{GestureInput, GestureSessions, GestureSettings};
use crate::engine::nodes::NodeRegistry;
use crate::engine::planes::DetectedPlanes;
use crate::rpc::host_channel::{HostChannel, SceneEvent};

/// Applies pan drag deltas to the target node's position.
///
/// Each delta is applied immediately and independently — there is no pan
/// session. Screen X maps to world X and screen Y to world Z, both inverted
/// and scaled to meters; height is locked to the latched ground plane when
/// one has been detected, otherwise the node keeps its current height.
pub fn handle_pan(
    mut gestures: EventReader<GestureInput>,
    settings: Res<GestureSettings>,
    mut registry: ResMut<NodeRegistry>,
    sessions: Res<GestureSessions>,
    planes: Res<DetectedPlanes>,
    mut host: ResMut<HostChannel>,
) {
    for gesture in gestures.read() {
        let GestureInput::Pan { target, delta } = gesture else {
            continue;
        };
        if !settings.handle_pans {
            continue;
        }
        let Some(name) = target else {
            continue;
        };
        // One gesture kind per node at a time: an active rotation session
        // wins over pan deltas for the same node.
        if sessions.is_rotating(name) {
            continue;
        }
        let Some(entry) = registry.get_mut(name) else {
            debug!("pan event for missing node {name}, ignoring");
            continue;
        };
        if !entry.position_editable || !entry.touchable {
            continue;
        }

        let dx = -delta.x * settings.pan_scale;
        let dz = -delta.y * settings.pan_scale;
        let y = planes.ground_height().unwrap_or(entry.position.y);
        entry.position = Vec3::new(entry.position.x + dx, y, entry.position.z + dz);

        host.notify(SceneEvent::PanChange { name: name.clone() });
    }
}
