use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::NotificationId;

/// `GET <resource>/list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<E> {
    #[serde(default)]
    pub total: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<E>,
}

/// `GET <resource>/view/<id>` and mutation responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

/// Lookup record as the backend sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOption {
    pub id: Value,
    pub name: String,
}

/// Lookup record as screens consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub key: String,
    pub label: String,
    pub value: Value,
}

impl From<RawOption> for OptionRecord {
    fn from(raw: RawOption) -> Self {
        let key = match &raw.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            key,
            label: raw.name,
            value: raw.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn text(&self) -> &str {
        self.title
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
}

/// Payload of a `POST <resource>/<action>` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Encodes a flat field map the way `encoding` asks for.
    pub fn from_fields(encoding: BodyEncoding, fields: serde_json::Map<String, Value>) -> Self {
        match encoding {
            BodyEncoding::Json => RequestBody::Json(Value::Object(fields)),
            BodyEncoding::Form => RequestBody::Form(
                fields
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match value {
                            Value::String(s) => s,
                            Value::Null => String::new(),
                            other => other.to_string(),
                        };
                        (name, value)
                    })
                    .collect(),
            ),
        }
    }

    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            RequestBody::Json(Value::Object(map)) => map.get(name).map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            RequestBody::Json(_) => None,
            RequestBody::Form(pairs) => pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
        }
    }
}

/// Strips a `{data: ...}` wrapper when present.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
