//! Outgoing event channel to the host layer.
//!
//! Systems queue typed [`SceneEvent`]s on the [`HostChannel`] resource; the
//! host drains them either typed or encoded as JSON-RPC 2.0 notifications.
//! How the notifications travel (platform channel, postMessage, socket) is
//! the host's concern.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// What a hit-test ray struck.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Plane,
    Point,
}

/// One collaborator hit-test result, in the host wire shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HitResult {
    #[serde(rename = "type")]
    pub kind: HitKind,
    pub distance: f32,
    #[serde(rename = "worldTransform")]
    pub world_transform: [f32; 16],
}

/// Events emitted to the host layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    NodeTap { name: String },
    PanChange { name: String },
    RotationChange { name: String },
    PlaneDetected { count: usize },
    PlaneOrPointTap { hits: Vec<HitResult> },
    CloudAnchorUploaded { name: String, cloud_id: String },
    /// Carries the resolved pose; the host is expected to answer with a
    /// name via `register_downloaded_anchor`.
    AnchorDownloadSuccess { cloud_id: String, world_transform: [f32; 16] },
    TrackingFailure { reason: String },
    Error { message: String },
}

impl SceneEvent {
    pub fn method(&self) -> &'static str {
        match self {
            Self::NodeTap { .. } => "onNodeTap",
            Self::PanChange { .. } => "onPanChange",
            Self::RotationChange { .. } => "onRotationChange",
            Self::PlaneDetected { .. } => "onPlaneDetected",
            Self::PlaneOrPointTap { .. } => "onPlaneOrPointTap",
            Self::CloudAnchorUploaded { .. } => "onCloudAnchorUploaded",
            Self::AnchorDownloadSuccess { .. } => "onAnchorDownloadSuccess",
            Self::TrackingFailure { .. } => "onTrackingFailure",
            Self::Error { .. } => "onError",
        }
    }

    pub fn params(&self) -> serde_json::Value {
        match self {
            Self::NodeTap { name } => serde_json::json!([name]),
            Self::PanChange { name } => serde_json::json!(name),
            Self::RotationChange { name } => serde_json::json!(name),
            Self::PlaneDetected { count } => serde_json::json!(count),
            Self::PlaneOrPointTap { hits } => {
                serde_json::to_value(hits).unwrap_or(serde_json::Value::Null)
            }
            Self::CloudAnchorUploaded { name, cloud_id } => serde_json::json!({
                "name": name,
                "cloudanchorid": cloud_id,
            }),
            Self::AnchorDownloadSuccess {
                cloud_id,
                world_transform,
            } => serde_json::json!({
                "cloudanchorid": cloud_id,
                "worldTransform": world_transform.to_vec(),
            }),
            Self::TrackingFailure { reason } => serde_json::json!(reason),
            Self::Error { message } => serde_json::json!([message]),
        }
    }

    pub fn to_notification(&self) -> RpcNotification {
        RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: self.method().to_string(),
            params: self.params(),
        }
    }
}

/// Resource queueing events for the host. Drained by the facade after each
/// update; never touched off-schedule.
#[derive(Resource, Default)]
pub struct HostChannel {
    outgoing: Vec<SceneEvent>,
}

impl HostChannel {
    pub fn notify(&mut self, event: SceneEvent) {
        self.outgoing.push(event);
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.outgoing.push(SceneEvent::Error { message });
    }

    pub fn drain(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn drain_notifications(&mut self) -> Vec<RpcNotification> {
        self.drain()
            .iter()
            .map(SceneEvent::to_notification)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_result_wire_shape() {
        let hit = HitResult {
            kind: HitKind::Plane,
            distance: 1.25,
            world_transform: [0.0; 16],
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["type"], "plane");
        assert_eq!(value["distance"], 1.25);
        assert_eq!(value["worldTransform"].as_array().unwrap().len(), 16);
    }

    #[test]
    fn upload_notification_shape() {
        let event = SceneEvent::CloudAnchorUploaded {
            name: "a1".to_string(),
            cloud_id: "cid-123".to_string(),
        };
        let notification = event.to_notification();
        assert_eq!(notification.jsonrpc, "2.0");
        assert_eq!(notification.method, "onCloudAnchorUploaded");
        assert_eq!(notification.params["cloudanchorid"], "cid-123");
    }
}
