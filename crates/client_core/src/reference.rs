use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;
use shared::protocol::{unwrap_data, Notification, OptionRecord, RawOption};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::RequestError,
    events::{ClientEvent, EventBus},
    transport::RequestLayer,
};

pub const SITE_SETTINGS_PATH: &str = "site/settings";
pub const MEMBER_OPTIONS_PATH: &str = "member/options";
pub const NOTIFICATIONS_PATH: &str = "user-notification/list";

/// Lookup tables shared by every screen of a session.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    loaded: bool,
    categories: BTreeMap<String, Vec<OptionRecord>>,
    notifications: Vec<Notification>,
}

impl ReferenceData {
    pub fn from_records(
        site_settings: Value,
        member_options: Value,
        notifications: Value,
    ) -> Result<Self, serde_json::Error> {
        let mut categories = option_tables(site_settings)?;
        categories.extend(option_tables(member_options)?);
        Ok(Self {
            loaded: true,
            categories,
            notifications: notification_list(notifications),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Every option category present and non-empty.
    pub fn is_ready(&self) -> bool {
        !self.categories.is_empty() && self.categories.values().all(|options| !options.is_empty())
    }

    pub fn options(&self, category: &str) -> Option<&[OptionRecord]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[OptionRecord])> {
        self.categories
            .iter()
            .map(|(name, options)| (name.as_str(), options.as_slice()))
    }

    /// Resolves a raw field value (`3`, `"ACTIVE"`) to its display label.
    pub fn label_for(&self, category: &str, value: &Value) -> Option<&str> {
        let key = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.options(category)?
            .iter()
            .find(|option| option.value == *value || option.key == key)
            .map(|option| option.label.as_str())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

fn option_tables(record: Value) -> Result<BTreeMap<String, Vec<OptionRecord>>, serde_json::Error> {
    let mut tables = BTreeMap::new();
    let Value::Object(fields) = unwrap_data(record) else {
        return Ok(tables);
    };

    for (name, value) in fields {
        let Value::Array(items) = value else {
            continue;
        };
        if items.is_empty() {
            tables.insert(name, Vec::new());
            continue;
        }
        if !items.iter().all(looks_like_option) {
            debug!(category = %name, "skipping non-option array in reference record");
            continue;
        }
        let options = items
            .into_iter()
            .map(|item| serde_json::from_value::<RawOption>(item).map(OptionRecord::from))
            .collect::<Result<Vec<_>, _>>()?;
        tables.insert(name, options);
    }
    Ok(tables)
}

fn looks_like_option(item: &Value) -> bool {
    item.get("id").is_some() && item.get("name").is_some_and(Value::is_string)
}

/// Accepts a bare array, `{data: [...]}`, or a flat record whose first
/// array member holds the notifications.
fn notification_list(record: Value) -> Vec<Notification> {
    let items = match unwrap_data(record) {
        Value::Array(items) => items,
        Value::Object(fields) => {
            let Some(items) = fields.into_iter().find_map(|(_, value)| match value {
                Value::Array(items) => Some(items),
                _ => None,
            }) else {
                debug!("notification record carries no list; inbox left empty");
                return Vec::new();
            };
            items
        }
        Value::Null => Vec::new(),
        other => {
            debug!(body = %other, "unrecognised notification record; inbox left empty");
            return Vec::new();
        }
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Notification>(item) {
            Ok(notification) => Some(notification),
            Err(err) => {
                debug!(%err, "dropping malformed notification");
                None
            }
        })
        .collect()
}

/// Session-wide handle; clones share one cache.
///
/// Readers always observe either the empty cache or a complete bootstrap,
/// never a partial one: the whole [`ReferenceData`] is swapped in at once.
#[derive(Clone)]
pub struct ReferenceDataCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    api: Arc<dyn RequestLayer>,
    events: EventBus,
    data: watch::Sender<Arc<ReferenceData>>,
    load_lock: Mutex<()>,
}

impl ReferenceDataCache {
    pub fn new(api: Arc<dyn RequestLayer>, events: EventBus) -> Self {
        let (data, _) = watch::channel(Arc::new(ReferenceData::default()));
        Self {
            inner: Arc::new(CacheInner {
                api,
                events,
                data,
                load_lock: Mutex::new(()),
            }),
        }
    }

    /// Runs the bootstrap fetch unless a previous one already succeeded.
    /// Concurrent callers wait for the one in progress instead of issuing
    /// their own.
    pub async fn load(&self) -> Result<(), RequestError> {
        let _guard = self.inner.load_lock.lock().await;
        if self.inner.data.borrow().is_loaded() {
            return Ok(());
        }

        let api = &self.inner.api;
        let fetched = futures::future::try_join3(
            api.get(SITE_SETTINGS_PATH, &[]),
            api.get(MEMBER_OPTIONS_PATH, &[]),
            api.get(NOTIFICATIONS_PATH, &[]),
        )
        .await
        .and_then(|(settings, options, notifications)| {
            ReferenceData::from_records(settings, options, notifications).map_err(RequestError::from)
        });

        match fetched {
            Ok(data) => {
                let categories = data.categories.len();
                info!(
                    categories,
                    notifications = data.notifications.len(),
                    ready = data.is_ready(),
                    "reference data loaded"
                );
                self.inner.data.send_replace(Arc::new(data));
                self.inner
                    .events
                    .publish(ClientEvent::ReferenceDataLoaded { categories });
                Ok(())
            }
            Err(err) => {
                warn!(%err, "reference data bootstrap failed");
                self.inner.events.publish(ClientEvent::ReferenceDataFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.data.borrow().is_ready()
    }

    pub fn snapshot(&self) -> Arc<ReferenceData> {
        self.inner.data.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ReferenceData>> {
        self.inner.data.subscribe()
    }

    /// Resolves once the cache is ready; pending forever if it never becomes so.
    pub async fn wait_ready(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|data| data.is_ready()).await;
    }

    /// Drops everything on sign-out.
    pub fn clear(&self) {
        self.inner
            .data
            .send_replace(Arc::new(ReferenceData::default()));
    }
}

#[cfg(test)]
#[path = "tests/reference_tests.rs"]
mod tests;
