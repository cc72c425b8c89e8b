//! Spatial scene state for an AR session: named node and anchor
//! registries, per-frame tracking ingestion (planes, feature points,
//! camera pose), gesture-driven transform editing, and the asynchronous
//! cloud-anchor sharing protocol.
//!
//! The crate is organised as Bevy plugins over a headless [`App`]:
//! [`engine::SceneEnginePlugin`] owns the registries and frame tracking,
//! [`tools::gestures::GesturePlugin`] turns touch events into transform
//! updates, and [`cloud::CloudAnchorPlugin`] drives the upload/download
//! protocol. Hosts normally go through the [`session::ArSceneSession`]
//! facade, which owns the app and serializes all access to it.

pub mod cloud;
pub mod engine;
pub mod error;
pub mod rpc;
pub mod session;
pub mod tools;

use bevy::prelude::*;

use cloud::CloudAnchorPlugin;
use engine::SceneEnginePlugin;
use rpc::host_channel::HostChannel;
use tools::gestures::GesturePlugin;

/// Everything the session needs, as one plugin.
pub struct ArScenePlugin;

impl Plugin for ArScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostChannel>().add_plugins((
            SceneEnginePlugin,
            GesturePlugin,
            CloudAnchorPlugin,
        ));
    }
}

pub mod prelude {
    pub use crate::ArScenePlugin;
    pub use crate::cloud::coordinator::{
        CloudAnchorState, CloudCallback, CloudCallbackSender, CloudRequest,
    };
    pub use crate::engine::anchors::Pose;
    pub use crate::engine::frame::{
        FeatureMapQuality, FrameUpdate, PointCloudFrame, PointSample, TrackedPlane, TrackingState,
    };
    pub use crate::engine::nodes::{ModelSource, NodeSpec};
    pub use crate::error::SceneError;
    pub use crate::rpc::host_channel::{HitKind, HitResult, RpcNotification, SceneEvent};
    pub use crate::session::{ArSceneSession, SessionConfig};
    pub use crate::tools::gestures::{GestureInput, GesturePhase};
}
