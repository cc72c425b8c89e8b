use thiserror::Error;

/// Error taxonomy for every host-facing scene operation.
///
/// Synchronous operations return these directly. Collaborator callback
/// failures (cloud hosting/resolution) are surfaced asynchronously as
/// [`SceneEvent::Error`](crate::rpc::host_channel::SceneEvent) instead,
/// since the originating command has usually already returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("anchor {0} not found")]
    AnchorNotFound(String),

    #[error("name {0} is already in use")]
    DuplicateName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("anchor {anchor} is already bound to cloud id {cloud_id}")]
    AlreadyBound { anchor: String, cloud_id: String },

    #[error("AR session is not available")]
    SessionUnavailable,

    #[error("insufficient visual data to host")]
    InsufficientVisualData,

    #[error("cloud anchor operation failed: {0}")]
    CollaboratorFailure(String),
}
