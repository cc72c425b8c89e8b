//! Asynchronous cloud-anchor upload/download protocol.

pub mod coordinator;

use bevy::prelude::*;

use crate::engine::FrameTracking;
use coordinator::{CloudAnchorCoordinator, CloudAnchorLink, drive_cloud_callbacks};

/// Registers the coordinator state and the callback-draining system. The
/// drain runs on the same schedule as everything else, so registry effects
/// of collaborator callbacks are serialized with host commands and frame
/// ticks by construction.
pub struct CloudAnchorPlugin;

impl Plugin for CloudAnchorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CloudAnchorCoordinator>()
            .init_resource::<CloudAnchorLink>()
            .add_systems(Update, drive_cloud_callbacks.after(FrameTracking));
    }
}
