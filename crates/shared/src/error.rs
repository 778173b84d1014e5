use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{action::ActionFamily, domain::EntityKind};

/// Error body the backend attaches to a non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{action} is not allowed on {kind} in state {state}")]
    NotAllowed {
        kind: EntityKind,
        action: ActionFamily,
        state: String,
    },
    #[error("{action} on {kind} would not change anything")]
    Unchanged {
        kind: EntityKind,
        action: ActionFamily,
    },
}

impl TransitionError {
    pub fn not_allowed(kind: EntityKind, action: ActionFamily, state: impl Into<String>) -> Self {
        Self::NotAllowed {
            kind,
            action,
            state: state.into(),
        }
    }
}
