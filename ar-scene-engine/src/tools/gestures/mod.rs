//! Translation of ambiguous touch gestures into deterministic, incremental
//! transform updates on registry nodes.
//!
//! Pan is stateless: each drag delta is applied immediately and
//! independently, with the Y axis locked to the latched ground height when
//! one exists. Rotation is stateful across a gesture's lifetime: a session
//! record tracks detector angles and the accumulated wraparound-corrected
//! delta, committing the final yaw on release so the next gesture starts
//! from it rather than from zero. Only one gesture kind is active per node
//! at a time.
//!
//! Gesture events for a node that was concurrently removed are silently
//! absorbed — the systems detect the missing node and abandon the session.

/// Pan handling: screen-space drag deltas mapped to world-space X/Z.
pub mod pan;

/// Incremental yaw rotation with ±π wraparound correction.
pub mod rotation;

/// Tap dispatch: managed-node taps and empty-space hit-test forwarding.
pub mod tap;

use bevy::prelude::*;
use std::collections::HashMap;

use crate::engine::FrameTracking;
use rotation::RotationSession;

/// Phase of a stateful gesture event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Changed,
    /// Release or cancel; commits rotation sessions.
    Ended,
}

/// A gesture event from the host's touch layer. The target, when present,
/// names the managed node the touch landed on — the ownership index from
/// touched object to node name is maintained by the host's picking layer,
/// so no hierarchy traversal happens here.
#[derive(Event, Debug, Clone)]
pub enum GestureInput {
    Pan {
        target: Option<String>,
        /// Screen-space drag delta in pixels.
        delta: Vec2,
    },
    Rotate {
        target: Option<String>,
        /// Absolute detector angle in radians, wrapping at ±π.
        angle: f32,
        phase: GesturePhase,
    },
    Tap {
        target: Option<String>,
        /// Collaborator hit-test results for empty-space taps.
        hits: Vec<crate::rpc::host_channel::HitResult>,
    },
}

/// Session-wide gesture configuration.
#[derive(Resource, Debug, Clone)]
pub struct GestureSettings {
    pub handle_taps: bool,
    pub handle_pans: bool,
    pub handle_rotation: bool,
    /// Screen pixels to world meters for pan deltas.
    pub pan_scale: f32,
    /// Multiplier applied to the accumulated rotation delta.
    pub rotation_sensitivity: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            handle_taps: true,
            handle_pans: false,
            handle_rotation: false,
            pan_scale: 0.001,
            rotation_sensitivity: 1.5,
        }
    }
}

/// Active rotation sessions, keyed by node name. Kept alongside the node
/// registry rather than as ambient state; entries for removed nodes are
/// dropped the moment a stale event arrives.
#[derive(Resource, Default)]
pub struct GestureSessions {
    sessions: HashMap<String, RotationSession>,
}

impl GestureSessions {
    pub fn get_mut(&mut self, node: &str) -> Option<&mut RotationSession> {
        self.sessions.get_mut(node)
    }

    pub fn insert(&mut self, node: &str, session: RotationSession) {
        self.sessions.insert(node.to_string(), session);
    }

    pub fn remove(&mut self, node: &str) {
        self.sessions.remove(node);
    }

    pub fn is_rotating(&self, node: &str) -> bool {
        self.sessions.contains_key(node)
    }
}

/// Registers gesture resources and the pan/rotate/tap systems, ordered
/// after frame tracking so gestures observe the same update's frame state.
pub struct GesturePlugin;

impl Plugin for GesturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GestureSettings>()
            .init_resource::<GestureSessions>()
            .add_event::<GestureInput>()
            .add_systems(
                Update,
                (rotation::handle_rotation, pan::handle_pan, tap::handle_tap)
                    .chain()
                    .after(FrameTracking),
            );
    }
}
