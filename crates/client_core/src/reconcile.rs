//! Folding mutation results back into a list without re-deriving what the
//! backend did not tell us.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shared::{domain::EntityId, entity::AdminEntity, protocol::unwrap_data};
use tracing::debug;

use crate::{
    error::ListError,
    list::{FetchOutcome, ListQueryController},
    transport::RequestLayer,
};

/// Local consequence of an acknowledged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEffect<E> {
    /// The row is gone; totals have shifted.
    Removed(EntityId),
    /// The row stays with the given contents.
    Patched(E),
}

/// What happened to the owning list.
#[derive(Debug)]
pub enum Settled {
    Refetched(FetchOutcome),
    Patched { id: EntityId, changed: Vec<String> },
    /// The row left the page before the mutation settled; nothing to patch.
    RowGone(EntityId),
}

pub fn find_row<E: AdminEntity>(rows: &[E], id: EntityId) -> Option<&E> {
    rows.iter().find(|row| row.id() == id)
}

pub fn replace_row<E: AdminEntity>(rows: &mut [E], next: E) -> bool {
    match rows.iter_mut().find(|row| row.id() == next.id()) {
        Some(row) => {
            *row = next;
            true
        }
        None => false,
    }
}

/// Keeps `rows.len() <= size`; returns how many rows were dropped.
pub fn truncate_page<E>(rows: &mut Vec<E>, size: u32) -> usize {
    let size = size as usize;
    let dropped = rows.len().saturating_sub(size);
    rows.truncate(size);
    dropped
}

/// Top-level fields whose serialized value differs between two records.
pub fn changed_fields<T: Serialize>(before: &T, after: &T) -> Vec<String> {
    let (Ok(Value::Object(before)), Ok(Value::Object(after))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return Vec::new();
    };
    let mut changed: Vec<String> = after
        .iter()
        .filter(|(name, value)| before.get(*name) != Some(*value))
        .map(|(name, _)| name.clone())
        .collect();
    changed.extend(
        before
            .keys()
            .filter(|name| !after.contains_key(*name))
            .cloned(),
    );
    changed.sort();
    changed
}

/// Removal re-queries the list; anything else patches the row in place.
pub async fn apply_effect<E: AdminEntity>(
    controller: &Arc<ListQueryController<E>>,
    effect: MutationEffect<E>,
) -> Settled {
    match effect {
        MutationEffect::Removed(_) => Settled::Refetched(controller.refetch().await),
        MutationEffect::Patched(next) => {
            let id = next.id();
            let changed = controller
                .row(id)
                .map(|before| changed_fields(&before, &next))
                .unwrap_or_default();
            if controller.patch_row(next) {
                debug!(resource = %E::KIND, %id, ?changed, "row patched in place");
                Settled::Patched { id, changed }
            } else {
                Settled::RowGone(id)
            }
        }
    }
}

/// Authoritative copy of a single row from `<resource>/view/<id>`.
pub async fn view_row<E: AdminEntity>(
    api: &dyn RequestLayer,
    id: EntityId,
) -> Result<E, ListError> {
    let path = format!("{}/view/{}", E::KIND.resource(), id);
    let body = api.get(&path, &[]).await?;
    serde_json::from_value(unwrap_data(body)).map_err(|source| ListError::Decode {
        resource: E::KIND,
        source,
    })
}
