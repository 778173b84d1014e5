use shared::{
    action::ActionFamily,
    domain::{EntityId, EntityKind},
    error::TransitionError,
};
use thiserror::Error;

/// Failure of one call across the request layer.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint {path}: {source}")]
    Endpoint {
        path: String,
        source: url::ParseError,
    },
    #[error("request layer unavailable: {0}")]
    Unavailable(String),
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("request failed: {0}")]
    Request(#[from] RequestError),
    #[error("unexpected {resource} page shape: {source}")]
    Decode {
        resource: EntityKind,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{family} already in flight for {kind} {id}")]
    Busy {
        kind: EntityKind,
        id: EntityId,
        family: ActionFamily,
    },
    #[error("{family} on {kind} {id} must be confirmed first")]
    ConfirmationRequired {
        kind: EntityKind,
        id: EntityId,
        family: ActionFamily,
    },
    #[error("{family} applies immediately and has no confirmation step")]
    ConfirmationNotApplicable { family: ActionFamily },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{kind} {id} is not on the current page")]
    RowNotFound { kind: EntityKind, id: EntityId },
    #[error("{family} on {kind} {id} failed: {source}")]
    Request {
        kind: EntityKind,
        id: EntityId,
        family: ActionFamily,
        source: RequestError,
    },
}

impl MutationError {
    /// True when the request reached the request layer and failed there;
    /// everything else was refused locally without side effects.
    pub fn is_transient(&self) -> bool {
        matches!(self, MutationError::Request { .. })
    }
}
