use std::sync::Arc;

use shared::{domain::EntityId, entity::AdminEntity};
use tokio::sync::broadcast;

pub mod config;
pub mod error;
pub mod events;
pub mod list;
pub mod mutation;
pub mod reconcile;
pub mod reference;
pub mod transport;
pub mod types;

pub use config::{load_settings, ReconcilePolicy, Settings};
pub use error::{ListError, MutationError, RequestError};
pub use events::{ClientEvent, EventBus};
pub use list::{FetchOutcome, ListQueryController};
pub use mutation::{ActionState, MutationExecutor};
pub use reconcile::{MutationEffect, Settled};
pub use reference::{ReferenceData, ReferenceDataCache};
pub use transport::{HttpAdminApi, MissingRequestLayer, RequestLayer};
pub use types::{FilterValue, ListQueryState, Pagination};

/// One signed-in console session: the request layer, the shared reference
/// cache and the event fan-out, handed explicitly to every screen it opens.
pub struct AdminSession {
    api: Arc<dyn RequestLayer>,
    reference: ReferenceDataCache,
    events: EventBus,
    settings: Settings,
}

impl AdminSession {
    pub fn connect(settings: Settings) -> Result<Self, RequestError> {
        let api = HttpAdminApi::new(&settings)?;
        Ok(Self::with_request_layer(settings, Arc::new(api)))
    }

    pub fn offline(settings: Settings) -> Self {
        Self::with_request_layer(settings, Arc::new(MissingRequestLayer))
    }

    pub fn with_request_layer(settings: Settings, api: Arc<dyn RequestLayer>) -> Self {
        let events = EventBus::default();
        let reference = ReferenceDataCache::new(Arc::clone(&api), events.clone());
        Self {
            api,
            reference,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reference(&self) -> &ReferenceDataCache {
        &self.reference
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// A list screen whose filters or labels come from reference data.
    pub fn list_controller<E: AdminEntity>(&self) -> Arc<ListQueryController<E>> {
        Arc::new(self.list_controller_inner::<E>().gated_on(self.reference.clone()))
    }

    /// A list screen that needs nothing from the reference cache.
    pub fn ungated_list_controller<E: AdminEntity>(&self) -> Arc<ListQueryController<E>> {
        Arc::new(self.list_controller_inner::<E>())
    }

    fn list_controller_inner<E: AdminEntity>(&self) -> ListQueryController<E> {
        ListQueryController::new(Arc::clone(&self.api), self.events.clone(), &self.settings)
    }

    pub fn executor<E: AdminEntity>(&self) -> MutationExecutor<E> {
        MutationExecutor::new(
            Arc::clone(&self.api),
            self.events.clone(),
            self.settings.reconcile,
        )
    }

    pub async fn view<E: AdminEntity>(&self, id: EntityId) -> Result<E, ListError> {
        reconcile::view_row(self.api.as_ref(), id).await
    }

    pub fn sign_out(&self) {
        self.reference.clear();
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
