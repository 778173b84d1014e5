use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    action::{ActionFamily, Intent, SettlementClass},
    domain::EntityId,
    entity::AdminEntity,
};
use tracing::{debug, info, warn};

use crate::{
    config::ReconcilePolicy,
    error::MutationError,
    events::{ClientEvent, EventBus},
    list::ListQueryController,
    reconcile::{apply_effect, view_row, MutationEffect, Settled},
    transport::RequestLayer,
};

/// Confirmation/loading flags of one action family on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionState {
    pub confirmation_visible: bool,
    pub is_loading: bool,
    pub target_id: Option<EntityId>,
}

impl ActionState {
    pub fn is_idle(&self) -> bool {
        !self.confirmation_visible && !self.is_loading
    }
}

type SlotKey = (EntityId, ActionFamily);
type Slots = HashMap<SlotKey, ActionState>;

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees the submitting slot on drop, including when the submit future is
/// abandoned mid-request.
struct SubmitSlot<'a> {
    slots: &'a Mutex<Slots>,
    key: SlotKey,
}

impl Drop for SubmitSlot<'_> {
    fn drop(&mut self) {
        if lock(self.slots).remove(&self.key).is_some() {
            debug!(id = %self.key.0, family = %self.key.1, "submit slot released");
        }
    }
}

/// Runs state-changing operations against single rows of one entity type.
///
/// Per row and family: `Idle → ConfirmPending → Submitting → Idle` for
/// confirmed operations, `Idle → Submitting → Idle` for toggles. While a row
/// has anything submitting, every further submit on that row is refused, so
/// a double click can never reach the backend twice. Success, failure and
/// an abandoned submit all return the slot to idle; nothing is retried.
pub struct MutationExecutor<E: AdminEntity> {
    api: Arc<dyn RequestLayer>,
    events: EventBus,
    reconcile: ReconcilePolicy,
    slots: Mutex<Slots>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: AdminEntity> MutationExecutor<E> {
    pub fn new(api: Arc<dyn RequestLayer>, events: EventBus, reconcile: ReconcilePolicy) -> Self {
        Self {
            api,
            events,
            reconcile,
            slots: Mutex::new(HashMap::new()),
            _entity: PhantomData,
        }
    }

    pub async fn action_state(&self, id: EntityId, family: ActionFamily) -> ActionState {
        lock(&self.slots)
            .get(&(id, family))
            .copied()
            .unwrap_or_default()
    }

    /// True while any family on the row is submitting; the UI disables its
    /// triggers for exactly this span.
    pub async fn is_row_busy(&self, id: EntityId) -> bool {
        row_busy(&lock(&self.slots), id)
    }

    /// Opens the confirmation for a destructive or irreversible intent.
    /// An intent the row cannot take never gets a confirmation.
    pub async fn request_confirm(&self, row: &E, intent: Intent) -> Result<(), MutationError> {
        let family = intent.family();
        if !family.requires_confirmation() {
            return Err(MutationError::ConfirmationNotApplicable { family });
        }
        row.transition(&intent)?;

        let id = row.id();
        let mut slots = lock(&self.slots);
        let slot = slots.entry((id, family)).or_default();
        if !slot.is_loading {
            slot.confirmation_visible = true;
            slot.target_id = Some(id);
        }
        Ok(())
    }

    /// Closes the confirmation without side effects. Refused while the call
    /// is in flight; returns whether the slot is now idle.
    pub async fn cancel_confirm(&self, id: EntityId, family: ActionFamily) -> bool {
        let mut slots = lock(&self.slots);
        if slots.get(&(id, family)).is_some_and(|slot| slot.is_loading) {
            return false;
        }
        slots.remove(&(id, family));
        true
    }

    /// Sends the mutation for `row` and reports what the list should do.
    ///
    /// The new local value is computed from `row` alone; whatever the
    /// backend sends back is not merged.
    pub async fn submit(
        &self,
        row: &E,
        intent: Intent,
    ) -> Result<MutationEffect<E>, MutationError> {
        let id = row.id();
        let family = intent.family();
        let key = (id, family);

        let (next, in_flight) = {
            let mut slots = lock(&self.slots);
            if row_busy(&slots, id) {
                return Err(MutationError::Busy {
                    kind: E::KIND,
                    id,
                    family,
                });
            }
            if family.requires_confirmation()
                && !slots.get(&key).is_some_and(|slot| slot.confirmation_visible)
            {
                return Err(MutationError::ConfirmationRequired {
                    kind: E::KIND,
                    id,
                    family,
                });
            }
            let next = match row.transition(&intent) {
                Ok(next) => next,
                Err(err) => {
                    slots.remove(&key);
                    return Err(err.into());
                }
            };
            let slot = slots.entry(key).or_default();
            slot.is_loading = true;
            slot.target_id = Some(id);
            (
                next,
                SubmitSlot {
                    slots: &self.slots,
                    key,
                },
            )
        };

        let path = format!("{}/{}", E::KIND.resource(), E::endpoint(&intent));
        let body = row.mutation_body(&next, &intent);
        info!(resource = %E::KIND, %id, %family, %path, "mutation submitted");
        let result = self.api.post(&path, body).await;

        drop(in_flight);

        match result {
            Ok(_) => {
                info!(resource = %E::KIND, %id, %family, "mutation acknowledged");
                self.events.publish(ClientEvent::MutationApplied {
                    kind: E::KIND,
                    id,
                    family,
                });
                Ok(match family.settlement() {
                    SettlementClass::Refetch => MutationEffect::Removed(id),
                    SettlementClass::InPlace => MutationEffect::Patched(next),
                })
            }
            Err(source) => {
                warn!(resource = %E::KIND, %id, %family, %source, "mutation failed");
                self.events.publish(ClientEvent::MutationFailed {
                    kind: E::KIND,
                    id,
                    family,
                    message: source.to_string(),
                });
                Err(MutationError::Request {
                    kind: E::KIND,
                    id,
                    family,
                    source,
                })
            }
        }
    }

    /// Submits against the row as `controller` currently shows it and folds
    /// the result back: removal triggers exactly one refetch, anything else
    /// patches the row.
    pub async fn submit_in(
        &self,
        controller: &Arc<ListQueryController<E>>,
        id: EntityId,
        intent: Intent,
    ) -> Result<Settled, MutationError> {
        let row = controller
            .row(id)
            .ok_or(MutationError::RowNotFound { kind: E::KIND, id })?;
        let effect = match self.submit(&row, intent).await? {
            MutationEffect::Patched(next) if self.reconcile == ReconcilePolicy::RefreshRow => {
                match view_row::<E>(self.api.as_ref(), id).await {
                    Ok(fresh) => MutationEffect::Patched(fresh),
                    Err(err) => {
                        warn!(
                            resource = %E::KIND,
                            %id,
                            %err,
                            "row refresh failed; keeping computed value"
                        );
                        MutationEffect::Patched(next)
                    }
                }
            }
            effect => effect,
        };
        Ok(apply_effect(controller, effect).await)
    }
}

fn row_busy(slots: &Slots, id: EntityId) -> bool {
    slots
        .iter()
        .any(|((row_id, _), slot)| *row_id == id && slot.is_loading)
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
