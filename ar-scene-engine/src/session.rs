//! Host-facing session facade.
//!
//! [`ArSceneSession`] owns the ECS world and is the single entry point for
//! the host layer: commands mutate the registries synchronously, frame
//! ticks and gesture events run one schedule pass, and everything the
//! scene wants to tell the host accumulates on the [`HostChannel`] until
//! drained. Because every path goes through `&mut self`, registry access
//! is serialized by construction.

use bevy::prelude::*;

use crate::ArScenePlugin;
use crate::cloud::coordinator::{
    CloudAnchorCoordinator, CloudAnchorLink, CloudCallbackSender, CloudRequest,
};
use crate::engine::anchors::{AnchorRegistry, Pose};
use crate::engine::frame::{CameraPose, FrameUpdate, SessionStatus};
use crate::engine::nodes::{NodeRegistry, NodeSpec};
use crate::engine::planes::DetectedPlanes;
use crate::engine::point_cloud::{PointCloudPool, PointCloudTracker, release_all_points};
use crate::error::SceneError;
use crate::rpc::host_channel::{HostChannel, RpcNotification, SceneEvent};
use crate::tools::gestures::{GestureInput, GestureSessions, GestureSettings};

/// Initial session configuration, mirroring the host's init arguments.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub handle_taps: bool,
    pub handle_pans: bool,
    pub handle_rotation: bool,
    pub show_feature_points: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handle_taps: true,
            handle_pans: false,
            handle_rotation: false,
            show_feature_points: false,
        }
    }
}

pub struct ArSceneSession {
    app: App,
}

impl ArSceneSession {
    pub fn new(config: SessionConfig) -> Self {
        let mut app = App::new();
        app.add_plugins(ArScenePlugin);

        let world = app.world_mut();
        {
            let mut settings = world.resource_mut::<GestureSettings>();
            settings.handle_taps = config.handle_taps;
            settings.handle_pans = config.handle_pans;
            settings.handle_rotation = config.handle_rotation;
        }
        world.resource_mut::<PointCloudTracker>().enabled = config.show_feature_points;

        Self { app }
    }

    /// Runs one schedule pass; used by the host to drive callback
    /// processing when no frame tick or gesture is pending.
    pub fn update(&mut self) {
        self.app.update();
    }

    // Frame and gesture intake ------------------------------------------

    /// Delivers one frame tick from the tracking collaborator and
    /// processes it synchronously.
    pub fn frame_tick(&mut self, frame: FrameUpdate) {
        self.app.world_mut().send_event(frame);
        self.app.update();
    }

    /// Delivers one gesture event and processes it synchronously; the
    /// resulting transform is visible to the next query or frame tick.
    pub fn gesture(&mut self, input: GestureInput) {
        self.app.world_mut().send_event(input);
        self.app.update();
    }

    // Node operations ---------------------------------------------------

    pub fn add_node(&mut self, spec: &NodeSpec) -> Result<String, SceneError> {
        let world = self.app.world_mut();
        let settings = world.resource::<GestureSettings>().clone();
        let mut registry = world.resource_mut::<NodeRegistry>();
        let name = registry.add(spec)?;
        if let Some(entry) = registry.get_mut(&name) {
            entry.position_editable = settings.handle_pans;
            entry.rotation_editable = settings.handle_rotation;
            entry.touchable = true;
        }
        Ok(name)
    }

    /// Places a node relative to an existing anchor. Gesture-enabled nodes
    /// are placed free-standing at the anchor's world position instead of
    /// being parented, so pan and rotation act on the node alone.
    pub fn add_node_to_anchor(
        &mut self,
        spec: &NodeSpec,
        anchor: &str,
    ) -> Result<String, SceneError> {
        let gestures_enabled = {
            let settings = self.app.world().resource::<GestureSettings>();
            settings.handle_pans || settings.handle_rotation
        };
        let anchor_position = {
            let anchors = self.app.world().resource::<AnchorRegistry>();
            anchors
                .get(anchor)
                .ok_or_else(|| SceneError::AnchorNotFound(anchor.to_string()))?
                .pose
                .position
        };

        let name = self.add_node(spec)?;
        let world = self.app.world_mut();
        if gestures_enabled {
            let mut registry = world.resource_mut::<NodeRegistry>();
            if let Some(entry) = registry.get_mut(&name) {
                entry.position = anchor_position;
            }
        } else {
            {
                let mut registry = world.resource_mut::<NodeRegistry>();
                if let Some(entry) = registry.get_mut(&name) {
                    entry.parent_anchor = Some(anchor.to_string());
                }
            }
            world
                .resource_mut::<AnchorRegistry>()
                .attach_child(anchor, &name)?;
        }
        Ok(name)
    }

    /// Removes a node, detaching it from any parent anchor and dropping
    /// any gesture session still referring to it.
    pub fn remove_node(&mut self, name: &str) -> Result<String, SceneError> {
        let world = self.app.world_mut();
        let (removed, parent) = world.resource_mut::<NodeRegistry>().remove(name)?;
        if let Some(anchor) = parent {
            world
                .resource_mut::<AnchorRegistry>()
                .detach_child(&anchor, &removed);
        }
        world.resource_mut::<GestureSessions>().remove(&removed);
        Ok(removed)
    }

    pub fn set_node_transform(&mut self, name: &str, matrix: &[f32]) -> Result<(), SceneError> {
        self.app
            .world_mut()
            .resource_mut::<NodeRegistry>()
            .set_transform(name, matrix)
    }

    /// Current node transform in the host wire format.
    pub fn node_transform(&mut self, name: &str) -> Result<[f32; 16], SceneError> {
        self.app
            .world()
            .resource::<NodeRegistry>()
            .get(name)
            .map(|entry| entry.world_transform())
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))
    }

    pub fn set_editable(
        &mut self,
        name: &str,
        position_editable: bool,
        rotation_editable: bool,
    ) -> Result<(), SceneError> {
        self.app
            .world_mut()
            .resource_mut::<NodeRegistry>()
            .set_editable(name, position_editable, rotation_editable)
    }

    /// Updates the session-wide gesture switches and pushes the matching
    /// editability flags to every placed node.
    pub fn configure_gestures(&mut self, taps: bool, pans: bool, rotation: bool) {
        let world = self.app.world_mut();
        {
            let mut settings = world.resource_mut::<GestureSettings>();
            settings.handle_taps = taps;
            settings.handle_pans = pans;
            settings.handle_rotation = rotation;
        }
        world
            .resource_mut::<NodeRegistry>()
            .apply_editability(pans, rotation);
    }

    // Anchor operations -------------------------------------------------

    pub fn add_anchor(&mut self, name: &str, matrix: &[f32]) -> Result<(), SceneError> {
        let pose = Pose::from_matrix(matrix)?;
        self.app
            .world_mut()
            .resource_mut::<AnchorRegistry>()
            .add(name, pose)
    }

    /// Removes an anchor and detaches its child nodes; the children keep
    /// their last world transform.
    pub fn remove_anchor(&mut self, name: &str) -> Result<(), SceneError> {
        let world = self.app.world_mut();
        let entry = world.resource_mut::<AnchorRegistry>().remove(name)?;
        let mut registry = world.resource_mut::<NodeRegistry>();
        for child in &entry.children {
            if let Some(node) = registry.get_mut(child) {
                node.parent_anchor = None;
            }
        }
        Ok(())
    }

    pub fn anchor_pose(&mut self, name: &str) -> Result<[f32; 16], SceneError> {
        self.app
            .world()
            .resource::<AnchorRegistry>()
            .get(name)
            .map(|entry| entry.pose.to_matrix())
            .ok_or_else(|| SceneError::AnchorNotFound(name.to_string()))
    }

    // Cloud anchor protocol ---------------------------------------------

    /// Begins uploading an anchor to the sharing service. The terminal
    /// outcome arrives later as a `CloudAnchorUploaded` or `Error` event.
    pub fn upload_anchor(&mut self, name: &str) -> Result<(), SceneError> {
        self.app.world_mut().resource_scope(
            |world, mut coordinator: Mut<CloudAnchorCoordinator>| {
                world.resource_scope(|world, mut link: Mut<CloudAnchorLink>| {
                    let status = world.resource::<SessionStatus>();
                    let anchors = world.resource::<AnchorRegistry>();
                    coordinator
                        .begin_host(&mut link, status, anchors, name)
                        .map(|_| ())
                })
            },
        )
    }

    /// Begins resolving a shared anchor. On success the host receives an
    /// `AnchorDownloadSuccess` event and must answer with a name through
    /// [`ArSceneSession::register_downloaded_anchor`].
    pub fn download_anchor(&mut self, cloud_id: &str) -> Result<(), SceneError> {
        self.app.world_mut().resource_scope(
            |world, mut coordinator: Mut<CloudAnchorCoordinator>| {
                world.resource_scope(|world, mut link: Mut<CloudAnchorLink>| {
                    let status = world.resource::<SessionStatus>();
                    coordinator
                        .begin_resolve(&mut link, status, cloud_id)
                        .map(|_| ())
                })
            },
        )
    }

    /// Supplies (or refuses) the name for a downloaded anchor. `None`
    /// discards the anchor and releases its collaborator-side handle.
    pub fn register_downloaded_anchor(
        &mut self,
        cloud_id: &str,
        name: Option<&str>,
    ) -> Result<(), SceneError> {
        self.app.world_mut().resource_scope(
            |world, mut coordinator: Mut<CloudAnchorCoordinator>| {
                world.resource_scope(|world, mut link: Mut<CloudAnchorLink>| {
                    world.resource_scope(|world, mut anchors: Mut<AnchorRegistry>| {
                        let mut host = world.resource_mut::<HostChannel>();
                        coordinator.register_downloaded(
                            &mut link,
                            &mut anchors,
                            &mut host,
                            cloud_id,
                            name,
                        )
                    })
                })
            },
        )
    }

    /// Hands queued collaborator work (host/resolve/release requests) to
    /// the cloud anchor service.
    pub fn take_cloud_requests(&mut self) -> Vec<CloudRequest> {
        self.app
            .world_mut()
            .resource_mut::<CloudAnchorLink>()
            .take_requests()
    }

    /// Sender the cloud service uses to deliver completions from its own
    /// threads; they are applied on the next update.
    pub fn cloud_callback_sender(&self) -> CloudCallbackSender {
        self.app
            .world()
            .resource::<CloudAnchorLink>()
            .callback_sender()
    }

    // Session state -----------------------------------------------------

    /// Pauses frame processing; per-frame signals are skipped (and logged)
    /// until resumed, never surfaced as errors.
    pub fn pause(&mut self) {
        self.app.world_mut().resource_mut::<SessionStatus>().paused = true;
    }

    pub fn resume(&mut self) {
        self.app.world_mut().resource_mut::<SessionStatus>().paused = false;
    }

    /// Reports the tracking collaborator's session coming up or going
    /// down. While down, cloud anchor operations fail with
    /// [`SceneError::SessionUnavailable`].
    pub fn set_session_available(&mut self, available: bool) {
        self.app
            .world_mut()
            .resource_mut::<SessionStatus>()
            .available = available;
    }

    /// Toggles feature-point display. Turning it off releases every
    /// displayed point immediately.
    pub fn set_feature_points_enabled(&mut self, enabled: bool) {
        self.app.world_mut().resource_scope(
            |world, mut tracker: Mut<PointCloudTracker>| {
                tracker.enabled = enabled;
                if !enabled {
                    let mut pool = world.resource_mut::<PointCloudPool>();
                    release_all_points(&mut tracker, &mut pool);
                }
            },
        );
    }

    /// Latest camera pose seen on a frame tick, if any.
    pub fn camera_pose(&self) -> Option<Pose> {
        self.app.world().resource::<CameraPose>().0
    }

    /// Ground height latched from the first detected plane.
    pub fn ground_height(&self) -> Option<f32> {
        self.app.world().resource::<DetectedPlanes>().ground_height()
    }

    pub fn visible_point_count(&self) -> usize {
        self.app
            .world()
            .resource::<PointCloudTracker>()
            .visible_count()
    }

    // Event intake ------------------------------------------------------

    /// Drains the typed events queued for the host.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.app.world_mut().resource_mut::<HostChannel>().drain()
    }

    /// Drains queued events encoded as JSON-RPC notifications.
    pub fn drain_notifications(&mut self) -> Vec<RpcNotification> {
        self.app
            .world_mut()
            .resource_mut::<HostChannel>()
            .drain_notifications()
    }
}
