use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    #[error("stored data could not be read: {0}")]
    DataUnreadable(String),

    #[error("missing parameter {0:?}")]
    MissingParameter(String),

    #[error("invalid value for parameter {key:?}: {message}")]
    InvalidParameterValue { key: String, message: String },

    #[error("stored filesystem has no mount type")]
    MissingPluginId,

    #[error("no mount type registered as {0:?}")]
    InvalidPluginId(String),

    #[error("mount type {type_id:?} is misconfigured: {message}")]
    Delegate { type_id: String, message: String },

    #[error("mount of {fs_id} failed: {reason}")]
    MountFailure { reason: FailureReason, fs_id: Uuid },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("mount point is in use")]
    MountPointInUse,
    #[error("mount point is not writable")]
    MountPointNotWritable,
    #[error("mount point is a file")]
    MountPointIsFile,
    #[error("mount point could not be created")]
    MountPointUncreatable,
    #[error("helper process could not be launched: {0}")]
    ProcessLaunchFailed(String),
    #[error("helper process exit could not be observed: {0}")]
    ProcessTerminatedUnexpectedly(String),
    #[error("timed out")]
    TimedOut,
    #[error("{0}")]
    DelegateReported(String),
}

impl Error {
    pub fn mount_failure(fs_id: Uuid, reason: FailureReason) -> Self {
        Error::MountFailure { reason, fs_id }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Error::MountFailure { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::DataUnreadable(e.to_string())
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::DataUnreadable(e.to_string())
    }
}
