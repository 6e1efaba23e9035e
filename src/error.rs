//! Crate-wide error taxonomy (§7). Kept as one `thiserror` enum per the
//! newer `k` lineage's move away from the `failure` crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebkinError {
    #[error("malformed tree document: {0}")]
    MalformedTree(String),

    #[error("duplicate node name: {0}")]
    DuplicateName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bundle load error: {0}")]
    Bundle(String),

    #[error("missing required field: joint_name")]
    MissingJointName,

    #[error("unknown joint: {0}")]
    UnknownJoint(String),
}

pub type Result<T> = std::result::Result<T, WebkinError>;
