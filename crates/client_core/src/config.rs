use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

const SETTINGS_FILE: &str = "console.toml";

/// How an in-place mutation is reconciled once the backend acknowledges it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Patch the local row with the value the client computed.
    #[default]
    Optimistic,
    /// Re-read the single row from `<resource>/view/<id>` after the patch.
    RefreshRow,
}

impl ReconcilePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "optimistic" => Some(ReconcilePolicy::Optimistic),
            "refresh_row" => Some(ReconcilePolicy::RefreshRow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub auth_token: Option<String>,
    pub page_size: u32,
    pub keyword_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub reconcile: ReconcilePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080/api/".into(),
            auth_token: None,
            page_size: 10,
            keyword_debounce_ms: 250,
            request_timeout_secs: 30,
            reconcile: ReconcilePolicy::Optimistic,
        }
    }
}

impl Settings {
    pub fn keyword_debounce(&self) -> Duration {
        Duration::from_millis(self.keyword_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    auth_token: Option<String>,
    page_size: Option<u32>,
    keyword_debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    reconcile: Option<ReconcilePolicy>,
}

/// Defaults, then `console.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if Path::new(SETTINGS_FILE).exists() {
        let raw = fs::read_to_string(SETTINGS_FILE)
            .with_context(|| format!("failed to read {SETTINGS_FILE}"))?;
        apply_file(&mut settings, &raw)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings =
        toml::from_str(raw).with_context(|| format!("failed to parse {SETTINGS_FILE}"))?;

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.auth_token {
        settings.auth_token = Some(v);
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v.max(1);
    }
    if let Some(v) = file_cfg.keyword_debounce_ms {
        settings.keyword_debounce_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.reconcile {
        settings.reconcile = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ADMIN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("ADMIN_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = var("APP__AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed.max(1);
        }
    }
    if let Some(v) = var("APP__KEYWORD_DEBOUNCE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.keyword_debounce_ms = parsed;
        }
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = var("APP__RECONCILE") {
        if let Some(policy) = ReconcilePolicy::parse(&v) {
            settings.reconcile = policy;
        }
    }
}

/// Resource paths are joined beneath the base, so it must end in exactly one `/`.
pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/"))
        .with_context(|| format!("invalid server url '{raw}'"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("server url '{raw}' cannot carry resource paths");
    }
    Ok(url.to_string())
}
