use bevy::prelude::*;
use std::f32::consts::PI;

use super::{GestureInput, GesturePhase, GestureSessions, GestureSettings};
use crate::engine::nodes::NodeRegistry;
use crate::rpc::host_channel::{HostChannel, SceneEvent};

/// Per-gesture rotation tracking. Created on the first event of a gesture,
/// destroyed on release/cancel or when the target node disappears.
#[derive(Debug, Clone, Copy)]
pub struct RotationSession {
    pub start_angle: f32,
    pub last_detector_angle: f32,
    pub accumulated_delta: f32,
    /// The node's yaw when the gesture began; the committed base every
    /// applied yaw is computed from, avoiding drift from re-reading the
    /// node each frame.
    pub committed_yaw: f32,
}

impl RotationSession {
    fn begin(detector_angle: f32, node_yaw: f32) -> Self {
        Self {
            start_angle: detector_angle,
            last_detector_angle: detector_angle,
            accumulated_delta: 0.0,
            committed_yaw: node_yaw,
        }
    }
}

/// Incremental delta between two detector angles, corrected for the ±π
/// discontinuity so a gesture crossing the boundary produces a small step
/// instead of a near-2π jump.
pub fn rotation_delta(current: f32, last: f32) -> f32 {
    let mut delta = current - last;
    if delta > PI {
        delta -= 2.0 * PI;
    } else if delta < -PI {
        delta += 2.0 * PI;
    }
    delta
}

/// Applies rotation gesture events to the target node's yaw. Pitch and
/// roll are never touched. Events for missing nodes are absorbed and any
/// stale session dropped.
pub fn handle_rotation(
    mut gestures: EventReader<GestureInput>,
    settings: Res<GestureSettings>,
    mut registry: ResMut<NodeRegistry>,
    mut sessions: ResMut<GestureSessions>,
    mut host: ResMut<HostChannel>,
) {
    for gesture in gestures.read() {
        let GestureInput::Rotate {
            target,
            angle,
            phase,
        } = gesture
        else {
            continue;
        };
        if !settings.handle_rotation {
            continue;
        }
        let Some(name) = target else {
            continue;
        };
        let Some(entry) = registry.get_mut(name) else {
            debug!("rotation event for missing node {name}, abandoning session");
            sessions.remove(name);
            continue;
        };
        if !entry.rotation_editable || !entry.touchable {
            continue;
        }

        // The first event only anchors the session; the yaw is unchanged,
        // so the host is not notified until a delta actually applies.
        match sessions.get_mut(name) {
            None => {
                sessions.insert(name, RotationSession::begin(*angle, entry.rotation.y));
            }
            Some(session) => {
                session.accumulated_delta += rotation_delta(*angle, session.last_detector_angle);
                session.last_detector_angle = *angle;
                entry.rotation.y = session.committed_yaw
                    + session.accumulated_delta * settings.rotation_sensitivity;
                host.notify(SceneEvent::RotationChange { name: name.clone() });
            }
        }

        // Release commits: the yaw stays on the node, the session resets so
        // the next gesture starts fresh from the committed value.
        if *phase == GesturePhase::Ended {
            sessions.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraparound_near_pi_yields_small_delta() {
        // Just past the ±π boundary: the corrected delta is the short way
        // around, not a ~6.26 jump.
        let delta = rotation_delta(-3.13, 3.13);
        let expected = -2.0 * (PI - 3.13);
        assert!((delta - expected).abs() < 1e-6, "delta was {delta}");
        assert!(delta.abs() < 0.1);
    }

    #[test]
    fn wraparound_other_direction() {
        let delta = rotation_delta(3.13, -3.13);
        assert!((delta - 2.0 * (PI - 3.13)).abs() < 1e-6);
    }

    #[test]
    fn small_deltas_pass_through() {
        assert!((rotation_delta(0.2, 0.0) - 0.2).abs() < 1e-6);
        assert!((rotation_delta(-0.1, 0.1) + 0.2).abs() < 1e-6);
    }

    #[test]
    fn accumulation_matches_wrapped_path() {
        // Detector path 0.0 -> 0.2 -> -3.0 -> 3.1 crosses the boundary once.
        let mut session = RotationSession::begin(0.0, 0.0);
        for angle in [0.2, -3.0, 3.1] {
            session.accumulated_delta += rotation_delta(angle, session.last_detector_angle);
            session.last_detector_angle = angle;
        }
        // 0.2 -> -3.0 corrects upward (+2π), -3.0 -> 3.1 corrects downward
        // (-2π); the corrections cancel and the path telescopes to 3.1.
        let expected = 0.2 + (-3.2 + 2.0 * PI) + (6.1 - 2.0 * PI);
        assert!((session.accumulated_delta - expected).abs() < 1e-5);
        assert!((session.accumulated_delta - 3.1).abs() < 1e-5);
    }
}
