//! Notices the core hands to the UI layer. Rendering them (toasts, banners)
//! is the UI's business; the core only reports.

use shared::{
    action::ActionFamily,
    domain::{EntityId, EntityKind},
};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    ReferenceDataLoaded {
        categories: usize,
    },
    ReferenceDataFailed {
        message: String,
    },
    ListFetchFailed {
        kind: EntityKind,
        message: String,
    },
    MutationApplied {
        kind: EntityKind,
        id: EntityId,
        family: ActionFamily,
    },
    MutationFailed {
        kind: EntityKind,
        id: EntityId,
        family: ActionFamily,
        message: String,
    },
}

/// Broadcast fan-out; sending with no subscribers is not an error.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }
}

impl EventBus {
    pub fn publish(&self, event: ClientEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }
}
