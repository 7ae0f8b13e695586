use thiserror::Error;

use crate::poll::PollId;

/// Errors returned by `PollManager` operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The poll was already resolved or never existed
    #[error("poll {0} was not found or has expired")]
    NotFound(PollId),
    #[error("the requester is not allowed to end polls")]
    PermissionDenied,
    #[error("a poll needs a target player")]
    MissingTarget,
}

/// Errors reported by a `ServerProvider`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("command was rejected: {0}")]
    CommandRejected(String),
    #[error("{0}")]
    Failed(String),
}

/// A failure to update or post to the display surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("display update failed: {0}")]
pub struct DisplayError(pub String);

/// Errors regarding a `PollConfig`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollConfigError {
    #[error("the command template \"{0}\" does not contain a {{player}} token")]
    TemplateMissingPlayer(String),
    #[error("the poll duration must be greater than zero")]
    ZeroDuration,
}
