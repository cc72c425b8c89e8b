//! Coordinator for the asynchronous cloud-anchor host/resolve protocol.
//!
//! The hosting/resolution service is an external collaborator. Outbound
//! work travels as typed [`CloudRequest`]s the collaborator drains;
//! completions come back as typed [`CloudCallback`]s pushed onto a
//! mutex-guarded queue from whatever thread the collaborator runs on, and
//! are drained on the scene schedule so registries are never mutated
//! concurrently from a callback and a host command.
//!
//! An in-flight operation has no explicit cancel: removing the owning
//! anchor simply causes its eventual callback to be abandoned.

use bevy::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::engine::anchors::{AnchorRegistry, Pose};
use crate::engine::frame::SessionStatus;
use crate::error::SceneError;
use crate::rpc::host_channel::{HostChannel, SceneEvent};

pub type TaskId = u64;

/// Terminal failure states the hosting/resolution service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudAnchorState {
    ErrorCloudIdNotFound,
    ErrorNotAuthorized,
    ErrorResourceExhausted,
    ErrorHostingDatasetProcessingFailed,
    ErrorServiceUnavailable,
    ErrorInternal,
}

impl fmt::Display for CloudAnchorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ErrorCloudIdNotFound => "ERROR_CLOUD_ID_NOT_FOUND",
            Self::ErrorNotAuthorized => "ERROR_NOT_AUTHORIZED",
            Self::ErrorResourceExhausted => "ERROR_RESOURCE_EXHAUSTED",
            Self::ErrorHostingDatasetProcessingFailed => {
                "ERROR_HOSTING_DATASET_PROCESSING_FAILED"
            }
            Self::ErrorServiceUnavailable => "ERROR_SERVICE_UNAVAILABLE",
            Self::ErrorInternal => "ERROR_INTERNAL",
        };
        f.write_str(name)
    }
}

/// Work the collaborator is asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudRequest {
    Host {
        task: TaskId,
        anchor: String,
        pose: Pose,
    },
    Resolve {
        task: TaskId,
        cloud_id: String,
    },
    /// Releases a collaborator-side anchor handle that will never be
    /// registered, so it does not leak.
    Release {
        handle: u64,
    },
}

/// Completion delivered by the collaborator, tagged with the task id the
/// request carried.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudCallback {
    Hosted {
        task: TaskId,
        cloud_id: String,
    },
    HostFailed {
        task: TaskId,
        state: CloudAnchorState,
    },
    Resolved {
        task: TaskId,
        handle: u64,
        pose: Pose,
    },
    ResolveFailed {
        task: TaskId,
        state: CloudAnchorState,
    },
}

/// Cloneable handle the collaborator keeps to deliver callbacks from its
/// own threads.
#[derive(Clone)]
pub struct CloudCallbackSender(Arc<Mutex<Vec<CloudCallback>>>);

impl CloudCallbackSender {
    pub fn send(&self, callback: CloudCallback) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(callback);
        }
    }
}

/// Bidirectional queues between the coordinator and the collaborator.
#[derive(Resource, Default)]
pub struct CloudAnchorLink {
    requests: Vec<CloudRequest>,
    callbacks: Arc<Mutex<Vec<CloudCallback>>>,
}

impl CloudAnchorLink {
    pub fn push_request(&mut self, request: CloudRequest) {
        self.requests.push(request);
    }

    /// Hands the queued outbound requests to the collaborator.
    pub fn take_requests(&mut self) -> Vec<CloudRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn callback_sender(&self) -> CloudCallbackSender {
        CloudCallbackSender(self.callbacks.clone())
    }

    fn drain_callbacks(&mut self) -> Vec<CloudCallback> {
        match self.callbacks.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }
}

enum PendingTask {
    Host { anchor: String },
    Resolve { cloud_id: String },
}

/// A resolved anchor parked until the host supplies a name for it.
pub struct DownloadedAnchor {
    pub handle: u64,
    pub pose: Pose,
}

#[derive(Resource, Default)]
pub struct CloudAnchorCoordinator {
    pending: HashMap<TaskId, PendingTask>,
    awaiting_name: HashMap<String, DownloadedAnchor>,
    next_task: TaskId,
}

impl CloudAnchorCoordinator {
    fn next_task(&mut self) -> TaskId {
        self.next_task += 1;
        self.next_task
    }

    /// Starts hosting `anchor`. Preconditions fail fast with distinct
    /// error kinds, without reaching the collaborator.
    pub fn begin_host(
        &mut self,
        link: &mut CloudAnchorLink,
        status: &SessionStatus,
        anchors: &AnchorRegistry,
        anchor: &str,
    ) -> Result<TaskId, SceneError> {
        if !status.available {
            return Err(SceneError::SessionUnavailable);
        }
        let entry = anchors
            .get(anchor)
            .ok_or_else(|| SceneError::AnchorNotFound(anchor.to_string()))?;
        if !status.feature_map_quality.can_host() {
            return Err(SceneError::InsufficientVisualData);
        }

        let task = self.next_task();
        self.pending.insert(
            task,
            PendingTask::Host {
                anchor: anchor.to_string(),
            },
        );
        link.push_request(CloudRequest::Host {
            task,
            anchor: anchor.to_string(),
            pose: entry.pose,
        });
        info!("hosting anchor {anchor} as cloud task {task}");
        Ok(task)
    }

    /// Starts resolving a shared anchor by cloud id.
    pub fn begin_resolve(
        &mut self,
        link: &mut CloudAnchorLink,
        status: &SessionStatus,
        cloud_id: &str,
    ) -> Result<TaskId, SceneError> {
        if !status.available {
            return Err(SceneError::SessionUnavailable);
        }
        if cloud_id.is_empty() {
            return Err(SceneError::InvalidArgument(
                "cloud anchor id is required".to_string(),
            ));
        }

        let task = self.next_task();
        self.pending.insert(
            task,
            PendingTask::Resolve {
                cloud_id: cloud_id.to_string(),
            },
        );
        link.push_request(CloudRequest::Resolve {
            task,
            cloud_id: cloud_id.to_string(),
        });
        info!("resolving cloud anchor {cloud_id} as task {task}");
        Ok(task)
    }

    /// Completes a download: the naming authority lives in the host, so a
    /// resolved anchor is only inserted once the host answers with a name.
    /// Without one (or on a name collision) the parked anchor is discarded
    /// and its collaborator-side handle released.
    pub fn register_downloaded(
        &mut self,
        link: &mut CloudAnchorLink,
        anchors: &mut AnchorRegistry,
        host: &mut HostChannel,
        cloud_id: &str,
        name: Option<&str>,
    ) -> Result<(), SceneError> {
        let downloaded = self.awaiting_name.remove(cloud_id).ok_or_else(|| {
            SceneError::InvalidArgument(format!("no pending download for cloud id {cloud_id}"))
        })?;

        let Some(name) = name else {
            link.push_request(CloudRequest::Release {
                handle: downloaded.handle,
            });
            host.notify_error(format!(
                "Error registering downloaded anchor: no name supplied for {cloud_id}"
            ));
            return Err(SceneError::InvalidArgument(
                "anchor name is required".to_string(),
            ));
        };

        if let Err(err) = anchors.add(name, downloaded.pose) {
            link.push_request(CloudRequest::Release {
                handle: downloaded.handle,
            });
            host.notify_error(format!("Error registering downloaded anchor: {err}"));
            return Err(err);
        }
        // Fresh anchor, binding cannot collide.
        anchors.attach_cloud_id(name, cloud_id)?;
        Ok(())
    }
}

/// Drains collaborator callbacks and applies their terminal outcome.
///
/// The target's existence is re-checked before reacting: an upload whose
/// anchor was removed in the meantime is abandoned rather than assumed
/// valid. Callbacks with an unknown task id are logged and dropped.
pub fn drive_cloud_callbacks(
    mut coordinator: ResMut<CloudAnchorCoordinator>,
    mut link: ResMut<CloudAnchorLink>,
    mut anchors: ResMut<AnchorRegistry>,
    mut host: ResMut<HostChannel>,
) {
    for callback in link.drain_callbacks() {
        let task = match &callback {
            CloudCallback::Hosted { task, .. }
            | CloudCallback::HostFailed { task, .. }
            | CloudCallback::Resolved { task, .. }
            | CloudCallback::ResolveFailed { task, .. } => *task,
        };
        let Some(pending) = coordinator.pending.remove(&task) else {
            warn!("cloud callback for unknown task {task}, dropping");
            continue;
        };

        match (pending, callback) {
            (PendingTask::Host { anchor }, CloudCallback::Hosted { cloud_id, .. }) => {
                if !anchors.contains(&anchor) {
                    info!("anchor {anchor} removed while hosting, abandoning callback");
                    continue;
                }
                match anchors.attach_cloud_id(&anchor, &cloud_id) {
                    Ok(()) => host.notify(SceneEvent::CloudAnchorUploaded {
                        name: anchor,
                        cloud_id,
                    }),
                    Err(err) => host.notify_error(format!(
                        "Error binding cloud anchor id to {anchor}: {err}"
                    )),
                }
            }
            (PendingTask::Host { .. }, CloudCallback::HostFailed { state, .. }) => {
                host.notify_error(format!("Failed to host cloud anchor: {state}"));
            }
            (
                PendingTask::Resolve { cloud_id },
                CloudCallback::Resolved { handle, pose, .. },
            ) => {
                coordinator
                    .awaiting_name
                    .insert(cloud_id.clone(), DownloadedAnchor { handle, pose });
                host.notify(SceneEvent::AnchorDownloadSuccess {
                    cloud_id,
                    world_transform: pose.to_matrix(),
                });
            }
            (PendingTask::Resolve { .. }, CloudCallback::ResolveFailed { state, .. }) => {
                host.notify_error(format!("Failed to resolve cloud anchor: {state}"));
            }
            (_, callback) => {
                warn!("cloud callback kind mismatch for task {task}: {callback:?}");
            }
        }
    }
}
