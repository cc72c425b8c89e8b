use bevy::prelude::*;

use super::{GestureInput, GestureSettings};
use crate::engine::anchors::AnchorRegistry;
use crate::engine::nodes::NodeRegistry;
use crate::rpc::host_channel::{HostChannel, SceneEvent};

/// Dispatches tap events: a tap that landed on a managed node (or, as a
/// fallback, an anchor) reports the name; a tap on empty space forwards
/// the collaborator's hit-test results so the host can place content.
pub fn handle_tap(
    mut gestures: EventReader<GestureInput>,
    settings: Res<GestureSettings>,
    registry: Res<NodeRegistry>,
    anchors: Res<AnchorRegistry>,
    mut host: ResMut<HostChannel>,
) {
    for gesture in gestures.read() {
        let GestureInput::Tap { target, hits } = gesture else {
            continue;
        };
        if !settings.handle_taps {
            continue;
        }
        match target {
            Some(name) => {
                if registry.get(name).is_some_and(|entry| entry.touchable) {
                    host.notify(SceneEvent::NodeTap { name: name.clone() });
                } else if anchors.contains(name) {
                    // Taps resolved to an anchor are reported under the
                    // anchor's name for backward compatibility.
                    host.notify(SceneEvent::NodeTap { name: name.clone() });
                } else {
                    debug!("tap on unmanaged target {name}, ignoring");
                }
            }
            None => {
                if !hits.is_empty() {
                    host.notify(SceneEvent::PlaneOrPointTap { hits: hits.clone() });
                }
            }
        }
    }
}
