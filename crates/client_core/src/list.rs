use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use shared::{domain::EntityId, entity::AdminEntity, protocol::ListPage};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::ListError,
    events::{ClientEvent, EventBus},
    reconcile::{find_row, replace_row, truncate_page},
    reference::ReferenceDataCache,
    transport::RequestLayer,
    types::{FilterValue, ListQueryState, Pagination},
};

/// How a single fetch ended.
#[derive(Debug)]
pub enum FetchOutcome {
    Applied { total: u64, rows: usize },
    /// Reference data not ready; issued once it is.
    Deferred,
    /// A newer fetch was issued while this one was outstanding.
    Superseded,
    Failed(ListError),
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied { .. })
    }
}

/// Drives one list screen: `{keyword, filters, pagination}` in, one page of
/// rows out.
///
/// Every trigger schedules a fetch; nothing is queued. Each fetch takes a
/// generation number and only the newest generation may write its result,
/// so a slow response to an old query can never overwrite a newer page.
/// `is_loading` stays set until that newest fetch settles.
pub struct ListQueryController<E: AdminEntity> {
    api: Arc<dyn RequestLayer>,
    events: EventBus,
    gate: Option<ReferenceDataCache>,
    debounce: Duration,
    state: watch::Sender<ListQueryState<E>>,
    generation: AtomicU64,
    keyword_ticket: AtomicU64,
    deferred: AtomicBool,
    watching: AtomicBool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: AdminEntity> ListQueryController<E> {
    pub fn new(api: Arc<dyn RequestLayer>, events: EventBus, settings: &Settings) -> Self {
        let (state, _) = watch::channel(ListQueryState::new(settings.page_size));
        Self {
            api,
            events,
            gate: None,
            debounce: settings.keyword_debounce(),
            state,
            generation: AtomicU64::new(0),
            keyword_ticket: AtomicU64::new(0),
            deferred: AtomicBool::new(false),
            watching: AtomicBool::new(false),
            _entity: PhantomData,
        }
    }

    /// Holds every fetch back until `cache` is ready.
    pub fn gated_on(mut self, cache: ReferenceDataCache) -> Self {
        self.gate = Some(cache);
        self
    }

    pub fn state(&self) -> ListQueryState<E> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListQueryState<E>> {
        self.state.subscribe()
    }

    pub fn row(&self, id: EntityId) -> Option<E> {
        find_row(&self.state.borrow().rows, id).cloned()
    }

    /// Screen entry: first fetch, deferred until the gate is ready.
    pub async fn start(self: &Arc<Self>) -> FetchOutcome {
        self.fetch().await
    }

    /// At most one watch is pending; it re-arms on the next deferral, so a
    /// cache that is cleared and reloaded releases held-back triggers again.
    fn arm_readiness_watch(self: &Arc<Self>) {
        let Some(gate) = self.gate.clone() else {
            return;
        };
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }
        let controller: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            gate.wait_ready().await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            controller.watching.store(false, Ordering::SeqCst);
            if controller.deferred.swap(false, Ordering::SeqCst) {
                debug!(resource = %E::KIND, "reference data ready, issuing deferred fetch");
                controller.fetch().await;
            }
        });
    }

    /// Debounced: takes effect after a quiet period, and only the last of a
    /// burst of edits is ever applied. The handle resolves to `None` for
    /// edits that were overtaken.
    pub fn set_keyword(
        self: &Arc<Self>,
        text: impl Into<String>,
    ) -> JoinHandle<Option<FetchOutcome>> {
        let text = text.into();
        let ticket = self.keyword_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            if controller.keyword_ticket.load(Ordering::SeqCst) != ticket {
                return None;
            }
            controller.state.send_modify(|state| {
                state.keyword = text;
                state.pagination = state.pagination.first_page();
            });
            Some(controller.fetch().await)
        })
    }

    pub async fn set_filter(
        self: &Arc<Self>,
        name: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> FetchOutcome {
        let name = name.into();
        let value = value.into();
        self.state.send_modify(|state| {
            state.filters.insert(name, value);
            state.pagination = state.pagination.first_page();
        });
        self.fetch().await
    }

    pub async fn set_pagination(self: &Arc<Self>, page: u32, size: u32) -> FetchOutcome {
        self.state.send_modify(|state| {
            state.pagination = Pagination::new(page, size);
            truncate_page(&mut state.rows, state.pagination.size());
        });
        self.fetch().await
    }

    /// Replaces keyword, filters and paging in one step with a single fetch.
    /// Pending keyword edits are dropped.
    pub async fn apply_query(
        self: &Arc<Self>,
        keyword: impl Into<String>,
        filters: impl IntoIterator<Item = (String, FilterValue)>,
        pagination: Pagination,
    ) -> FetchOutcome {
        self.keyword_ticket.fetch_add(1, Ordering::SeqCst);
        let keyword = keyword.into();
        self.state.send_modify(|state| {
            state.keyword = keyword;
            state.filters = filters.into_iter().collect();
            state.pagination = pagination;
            truncate_page(&mut state.rows, pagination.size());
        });
        self.fetch().await
    }

    pub async fn refetch(self: &Arc<Self>) -> FetchOutcome {
        self.fetch().await
    }

    /// Replaces the row with the same id, leaving the rest of the page alone.
    pub fn patch_row(&self, next: E) -> bool {
        self.state
            .send_if_modified(|state| replace_row(&mut state.rows, next))
    }

    async fn fetch(self: &Arc<Self>) -> FetchOutcome {
        if let Some(gate) = &self.gate {
            if !gate.is_ready() {
                self.deferred.store(true, Ordering::SeqCst);
                debug!(resource = %E::KIND, "list fetch deferred until reference data is ready");
                self.arm_readiness_watch();
                return FetchOutcome::Deferred;
            }
        }
        self.deferred.store(false, Ordering::SeqCst);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight {
            controller: self.as_ref(),
            generation,
        };
        let mut query = Vec::new();
        let mut size = 0;
        self.state.send_modify(|state| {
            state.is_loading = true;
            query = state.query_pairs();
            size = state.pagination.size();
        });

        let path = format!("{}/list", E::KIND.resource());
        debug!(resource = %E::KIND, generation, ?query, "list fetch issued");
        let result = match self.api.get(&path, &query).await {
            Ok(body) => serde_json::from_value::<ListPage<E>>(body).map_err(|source| {
                ListError::Decode {
                    resource: E::KIND,
                    source,
                }
            }),
            Err(err) => Err(ListError::from(err)),
        };

        let mut outcome = FetchOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.is_loading = false;
            outcome = match result {
                Ok(mut page) => {
                    let dropped = truncate_page(&mut page.data, size);
                    if dropped > 0 {
                        warn!(
                            resource = %E::KIND,
                            dropped,
                            size,
                            "server returned more rows than the page size"
                        );
                    }
                    let rows = page.data.len();
                    state.rows = page.data;
                    state.total = page.total;
                    FetchOutcome::Applied {
                        total: page.total,
                        rows,
                    }
                }
                Err(err) => FetchOutcome::Failed(err),
            };
            true
        });

        match &outcome {
            FetchOutcome::Applied { total, rows } => {
                debug!(resource = %E::KIND, generation, total, rows, "list fetch applied");
            }
            FetchOutcome::Superseded => {
                debug!(resource = %E::KIND, generation, "stale list response discarded");
            }
            FetchOutcome::Failed(err) => {
                warn!(
                    resource = %E::KIND,
                    generation,
                    %err,
                    "list fetch failed; keeping previous rows"
                );
                self.events.publish(ClientEvent::ListFetchFailed {
                    kind: E::KIND,
                    message: err.to_string(),
                });
            }
            FetchOutcome::Deferred => {}
        }
        outcome
    }
}

/// Clears `is_loading` if the fetch is dropped before it settles and no
/// newer fetch has taken over. After a normal settle this is a no-op.
struct InFlight<'a, E: AdminEntity> {
    controller: &'a ListQueryController<E>,
    generation: u64,
}

impl<E: AdminEntity> Drop for InFlight<'_, E> {
    fn drop(&mut self) {
        let controller = self.controller;
        let released = controller.state.send_if_modified(|state| {
            if !state.is_loading
                || controller.generation.load(Ordering::SeqCst) != self.generation
            {
                return false;
            }
            state.is_loading = false;
            true
        });
        if released {
            debug!(
                resource = %E::KIND,
                generation = self.generation,
                "abandoned list fetch released loading flag"
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
