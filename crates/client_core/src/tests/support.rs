use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{ActivityStatus, AdStatus, EntityId, Switch},
    entity::{Ad, Banner},
    protocol::RequestBody,
};
use tokio::sync::oneshot;

use crate::{
    config::Settings, error::RequestError, reference::ReferenceDataCache, transport::RequestLayer,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get {
        path: String,
        query: Vec<(String, String)>,
    },
    Post {
        path: String,
        body: RequestBody,
    },
}

enum Reply {
    Ready(Result<Value, String>),
    Gated(oneshot::Receiver<()>, Result<Value, String>),
}

/// Scripted request layer. Replies are queued per path; an unscripted list
/// path answers with an empty page, anything else with `null`.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .expect("replies")
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, path: &str, value: Value) {
        self.push(path, Reply::Ready(Ok(value)));
    }

    pub fn fail(&self, path: &str, message: &str) {
        self.push(path, Reply::Ready(Err(message.to_string())));
    }

    /// The reply is held back until the returned sender fires.
    pub fn gate(&self, path: &str, value: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(path, Reply::Gated(rx, Ok(value)));
        tx
    }

    pub fn gate_failure(&self, path: &str, message: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(path, Reply::Gated(rx, Err(message.to_string())));
        tx
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| match call {
                RecordedCall::Get { path: p, .. } | RecordedCall::Post { path: p, .. } => p == path,
            })
            .count()
    }

    pub fn queries(&self, path: &str) -> Vec<Vec<(String, String)>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Get { path: p, query } if p == path => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn bodies(&self, path: &str) -> Vec<RequestBody> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Post { path: p, body } if p == path => Some(body),
                _ => None,
            })
            .collect()
    }

    async fn respond(&self, path: &str) -> Result<Value, RequestError> {
        let reply = self
            .replies
            .lock()
            .expect("replies")
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        let result = match reply {
            None if path.ends_with("/list") => Ok(json!({"total": 0, "data": []})),
            None => Ok(Value::Null),
            Some(Reply::Ready(result)) => result,
            Some(Reply::Gated(gate, result)) => {
                let _ = gate.await;
                result
            }
        };
        result.map_err(|message| RequestError::Status {
            status: 500,
            message,
        })
    }
}

#[async_trait]
impl RequestLayer for FakeApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, RequestError> {
        self.calls.lock().expect("calls").push(RecordedCall::Get {
            path: path.to_string(),
            query: query.to_vec(),
        });
        self.respond(path).await
    }

    async fn post(&self, path: &str, body: RequestBody) -> Result<Value, RequestError> {
        self.calls.lock().expect("calls").push(RecordedCall::Post {
            path: path.to_string(),
            body,
        });
        self.respond(path).await
    }
}

pub fn param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Lets spawned tasks run up to their next real suspension point.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn settings() -> Settings {
    Settings {
        server_url: "http://127.0.0.1:1/".into(),
        ..Settings::default()
    }
}

pub fn ad(id: i64, enable_ads: Switch) -> Ad {
    Ad {
        id: EntityId(id),
        title: format!("ad-{id}"),
        image_url: None,
        link_url: None,
        status: AdStatus::Active,
        enable_ads,
        is_bottom: false,
        created_at: None,
    }
}

pub fn banner(id: i64, status: ActivityStatus) -> Banner {
    Banner {
        id: EntityId(id),
        title: format!("banner-{id}"),
        image_url: None,
        position: Some(id as i32),
        status,
        created_at: None,
    }
}

pub fn page<T: serde::Serialize>(total: u64, rows: &[T]) -> Value {
    json!({ "total": total, "data": rows })
}

pub fn site_settings() -> Value {
    json!({
        "data": {
            "user_status": [
                {"id": "ACTIVE", "name": "Active"},
                {"id": "INACTIVE", "name": "Inactive"}
            ],
            "site_name": "Harbour Club",
            "banner_positions": [1, 2, 3]
        }
    })
}

pub fn member_options() -> Value {
    json!({
        "sponsor_levels": [
            {"id": 1, "name": "Silver"},
            {"id": 2, "name": "Gold"}
        ],
        "listing_categories": [
            {"id": 10, "name": "Housing"}
        ]
    })
}

pub fn notifications() -> Value {
    json!({
        "data": [
            {"id": 1, "title": "New listing awaiting review", "is_read": false},
            {"id": 2, "message": "Payment confirmed", "is_read": true}
        ]
    })
}

pub fn script_reference(api: &FakeApi) {
    api.reply(crate::reference::SITE_SETTINGS_PATH, site_settings());
    api.reply(crate::reference::MEMBER_OPTIONS_PATH, member_options());
    api.reply(crate::reference::NOTIFICATIONS_PATH, notifications());
}

pub async fn ready_cache(api: &Arc<FakeApi>) -> ReferenceDataCache {
    script_reference(api);
    let cache = ReferenceDataCache::new(api.clone(), crate::events::EventBus::default());
    cache.load().await.expect("reference data");
    cache
}
