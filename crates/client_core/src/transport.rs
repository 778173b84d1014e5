use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use shared::{error::ApiError, protocol::RequestBody};
use tracing::debug;
use url::Url;

use crate::{config::Settings, error::RequestError};

/// The only suspension point of the core: one call to the backend.
///
/// Paths are relative to the configured base (`ads/list`, `site/settings`).
/// A 2xx response yields its JSON body (`Null` when empty); anything else is
/// an error carrying the server's message.
#[async_trait]
pub trait RequestLayer: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, RequestError>;
    async fn post(&self, path: &str, body: RequestBody) -> Result<Value, RequestError>;
}

pub struct MissingRequestLayer;

#[async_trait]
impl RequestLayer for MissingRequestLayer {
    async fn get(&self, path: &str, _query: &[(String, String)]) -> Result<Value, RequestError> {
        Err(RequestError::Unavailable(format!("no backend configured for GET {path}")))
    }

    async fn post(&self, path: &str, _body: RequestBody) -> Result<Value, RequestError> {
        Err(RequestError::Unavailable(format!("no backend configured for POST {path}")))
    }
}

pub struct HttpAdminApi {
    http: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpAdminApi {
    pub fn new(settings: &Settings) -> Result<Self, RequestError> {
        let base_url = Url::parse(&settings.server_url).map_err(|source| RequestError::Endpoint {
            path: settings.server_url.clone(),
            source,
        })?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            auth_token: settings.auth_token.clone(),
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| RequestError::Endpoint {
                path: path.to_string(),
                source,
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RequestLayer for HttpAdminApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, RequestError> {
        let url = self.endpoint(path)?;
        debug!(%url, params = query.len(), "GET");
        let res = self
            .authorize(self.http.get(url))
            .query(query)
            .send()
            .await?;
        read_body(res).await
    }

    async fn post(&self, path: &str, body: RequestBody) -> Result<Value, RequestError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let request = self.authorize(self.http.post(url));
        let request = match &body {
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(pairs) => request.form(pairs),
        };
        let res = request.send().await?;
        read_body(res).await
    }
}

async fn read_body(res: Response) -> Result<Value, RequestError> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        let message = error_message(&text)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(RequestError::Status {
            status: status.as_u16(),
            message,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Pulls a human message out of `{message}`, `{error: {message}}`,
/// `{error: "..."}` or a plain-text body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Some(body.to_string());
    };
    if let Ok(err) = serde_json::from_value::<ApiError>(value.clone()) {
        return Some(err.message);
    }
    match value.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(nested) => serde_json::from_value::<ApiError>(nested.clone())
            .ok()
            .map(|err| err.message),
        None => Some(body.to_string()),
    }
}
