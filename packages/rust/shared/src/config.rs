//! Application configuration for feedrelay.
//!
//! The config lives in a TOML file: `./feedrelay.toml` when present, otherwise
//! `~/.feedrelay/feedrelay.toml`. A `--config` flag overrides both.
//! `${VAR}` and `$VAR` references are expanded from the environment before parsing.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FeedRelayError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "feedrelay.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".feedrelay";

/// Sink type for HTTP webhooks.
pub const SINK_TYPE_HTTP: &str = "http";
/// Sink type for cloud message queues.
pub const SINK_TYPE_QUEUE: &str = "queue";

/// Queue provider: AWS SQS.
pub const QUEUE_PROVIDER_AWS_SQS: &str = "aws-sqs";
/// Queue provider: AWS SNS.
pub const QUEUE_PROVIDER_AWS_SNS: &str = "aws-sns";
/// Queue provider: Google Cloud Pub/Sub.
pub const QUEUE_PROVIDER_GCP: &str = "gcp";
/// Queue provider: Azure Service Bus (recognized, not implemented).
pub const QUEUE_PROVIDER_AZURE: &str = "azure";

const REDACTED: &str = "***";

// ---------------------------------------------------------------------------
// Config structs (matching feedrelay.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheduler settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Outbound HTTP client settings shared by fetch and enrichment.
    #[serde(default)]
    pub http: HttpConfig,

    /// Page metadata enrichment.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Seen-item store.
    #[serde(default)]
    pub dedupe: DedupeConfig,

    /// Feed providers polled every cycle.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Delivery targets.
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Seconds between crawl cycles.
    #[serde(default = "default_crawl_interval")]
    pub crawl_interval_secs: u64,

    /// Seconds between TTL sweeps of the seen-item store.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Deadline for a single cycle; cancels in-flight work when reached.
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,

    /// Crawl providers concurrently instead of one after another.
    #[serde(default)]
    pub parallel_providers: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            crawl_interval_secs: default_crawl_interval(),
            sweep_interval_secs: default_sweep_interval(),
            cycle_timeout_secs: default_cycle_timeout(),
            parallel_providers: false,
        }
    }
}

impl ServiceConfig {
    pub fn crawl_interval(&self) -> Duration {
        Duration::from_secs(self.crawl_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

fn default_crawl_interval() -> u64 {
    300
}
fn default_sweep_interval() -> u64 {
    3600
}
fn default_cycle_timeout() -> u64 {
    240
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent when a provider does not set its own.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("feedrelay/", env!("CARGO_PKG_VERSION")).into()
}
fn default_http_timeout() -> u64 {
    15
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Fetch each item's page and overlay its metadata.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on concurrent page fetches per provider.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    10
}

/// Which seen-item store backs deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeBackend {
    /// Durable libSQL database file.
    #[default]
    Libsql,
    /// Process-local set, lost on restart.
    Memory,
    /// Dedupe disabled; every item is published.
    None,
}

/// `[dedupe]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    #[serde(default)]
    pub backend: DedupeBackend,

    /// Database path for the libsql backend.
    #[serde(default = "default_dedupe_path")]
    pub path: String,

    /// Records older than this are swept.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Mark an item seen even when every sink failed to take it.
    #[serde(default = "default_true")]
    pub mark_on_delivery_failure: bool,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            backend: DedupeBackend::default(),
            path: default_dedupe_path(),
            ttl_hours: default_ttl_hours(),
            mark_on_delivery_failure: true,
        }
    }
}

impl DedupeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}

fn default_dedupe_path() -> String {
    "var/feedrelay/seen.db".into()
}
fn default_ttl_hours() -> u64 {
    72
}
fn default_true() -> bool {
    true
}

/// `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider id, stamped on every item.
    pub id: String,

    /// Fetch strategy, e.g. `google-news` or `rss`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Feed URL.
    #[serde(default)]
    pub source_url: String,

    /// Minimum spacing between requests made on behalf of this provider.
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Build a minimal enabled provider entry.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            source_url: source_url.into(),
            request_delay_ms: 0,
            headers: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// `[[sinks]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Unique sink id.
    pub id: String,

    /// `http` or `queue`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueSinkConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSinkConfig>,
}

impl SinkConfig {
    /// Build an enabled HTTP sink entry posting to `url`.
    pub fn http(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SINK_TYPE_HTTP.into(),
            enabled: true,
            queue: None,
            http: Some(HttpSinkConfig {
                url: url.into(),
                method: default_method(),
                headers: BTreeMap::new(),
                timeout_seconds: default_sink_timeout(),
            }),
        }
    }
}

/// `[sinks.queue]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSinkConfig {
    /// `aws-sqs`, `aws-sns`, `gcp` or `azure`.
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqs: Option<SqsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sns: Option<SnsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpQueueConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureQueueConfig>,
}

/// Static AWS credentials; when absent the default provider chain is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

/// `[sinks.queue.sqs]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: String,
    #[serde(flatten)]
    pub credentials: AwsCredentials,
}

/// `[sinks.queue.sns]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnsConfig {
    pub topic_arn: String,
    pub region: String,
    #[serde(flatten)]
    pub credentials: AwsCredentials,
}

/// `[sinks.queue.gcp]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpQueueConfig {
    pub project_id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}

/// `[sinks.queue.azure]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureQueueConfig {
    pub connection_string: String,
    pub queue: String,
}

/// `[sinks.http]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_sink_timeout")]
    pub timeout_seconds: u64,
}

fn default_method() -> String {
    "POST".into()
}
fn default_sink_timeout() -> u64 {
    5
}

// ---------------------------------------------------------------------------
// Sanitization & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Normalize user input: trim ids and URLs, lowercase type selectors,
    /// fill method/timeout defaults, and drop blank headers.
    pub fn sanitize(&mut self) {
        self.enrichment.workers = self.enrichment.workers.max(1);

        for p in &mut self.providers {
            p.id = p.id.trim().to_string();
            p.kind = p.kind.trim().to_ascii_lowercase();
            p.source_url = p.source_url.trim().to_string();
            p.headers = sanitize_headers(&p.headers);
        }

        for s in &mut self.sinks {
            s.id = s.id.trim().to_string();
            s.kind = s.kind.trim().to_ascii_lowercase();

            if let Some(q) = s.queue.as_mut() {
                q.provider = q.provider.trim().to_ascii_lowercase();
                if let Some(sqs) = q.sqs.as_mut() {
                    sqs.queue_url = sqs.queue_url.trim().to_string();
                    sqs.region = sqs.region.trim().to_string();
                    trim_credentials(&mut sqs.credentials);
                }
                if let Some(sns) = q.sns.as_mut() {
                    sns.topic_arn = sns.topic_arn.trim().to_string();
                    sns.region = sns.region.trim().to_string();
                    trim_credentials(&mut sns.credentials);
                }
                if let Some(gcp) = q.gcp.as_mut() {
                    gcp.project_id = gcp.project_id.trim().to_string();
                    gcp.topic = gcp.topic.trim().to_string();
                }
            }

            if let Some(h) = s.http.as_mut() {
                h.url = h.url.trim().to_string();
                h.method = h.method.trim().to_ascii_uppercase();
                if h.method.is_empty() {
                    h.method = default_method();
                }
                if h.timeout_seconds == 0 {
                    h.timeout_seconds = default_sink_timeout();
                }
                h.headers = sanitize_headers(&h.headers);
            }
        }
    }

    /// Check required fields and uniqueness. Provider types are checked later
    /// against the source registry, which owns the list of known types.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(FeedRelayError::config("no providers configured"));
        }
        if self.sinks.is_empty() {
            return Err(FeedRelayError::config("no sinks configured"));
        }
        if self.service.crawl_interval_secs == 0 {
            return Err(FeedRelayError::config("service.crawl_interval_secs must be > 0"));
        }
        if self.service.sweep_interval_secs == 0 {
            return Err(FeedRelayError::config("service.sweep_interval_secs must be > 0"));
        }
        if self.dedupe.backend == DedupeBackend::Libsql && self.dedupe.path.trim().is_empty() {
            return Err(FeedRelayError::config("dedupe.path is required for the libsql backend"));
        }
        if self.dedupe.ttl_hours == 0 {
            return Err(FeedRelayError::config("dedupe.ttl_hours must be > 0"));
        }

        let mut ids = HashSet::new();
        for (i, p) in self.providers.iter().enumerate() {
            validate_provider(p).map_err(|e| prefix_error(format!("providers[{i}]"), e))?;
            if !ids.insert(p.id.as_str()) {
                return Err(FeedRelayError::config(format!("duplicate provider id {:?}", p.id)));
            }
        }

        let mut ids = HashSet::new();
        for (i, s) in self.sinks.iter().enumerate() {
            validate_sink(s).map_err(|e| prefix_error(format!("sinks[{i}]"), e))?;
            if !ids.insert(s.id.as_str()) {
                return Err(FeedRelayError::config(format!("duplicate sink id {:?}", s.id)));
            }
        }

        Ok(())
    }

    /// Providers crawled each cycle.
    pub fn enabled_providers(&self) -> Vec<ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled).cloned().collect()
    }

    /// Sinks that take part in fan-out.
    pub fn enabled_sinks(&self) -> Vec<SinkConfig> {
        self.sinks.iter().filter(|s| s.enabled).cloned().collect()
    }

    /// Copy with credentials and header values masked, for display.
    pub fn redacted(&self) -> AppConfig {
        let mut out = self.clone();
        for p in &mut out.providers {
            redact_headers(&mut p.headers);
        }
        for s in &mut out.sinks {
            if let Some(h) = s.http.as_mut() {
                redact_headers(&mut h.headers);
            }
            if let Some(q) = s.queue.as_mut() {
                if let Some(sqs) = q.sqs.as_mut() {
                    redact_credentials(&mut sqs.credentials);
                }
                if let Some(sns) = q.sns.as_mut() {
                    redact_credentials(&mut sns.credentials);
                }
                if let Some(azure) = q.azure.as_mut() {
                    azure.connection_string = REDACTED.into();
                }
            }
        }
        out
    }
}

fn validate_provider(p: &ProviderConfig) -> Result<()> {
    if p.id.is_empty() {
        return Err(FeedRelayError::config("id is required"));
    }
    if p.kind.is_empty() {
        return Err(FeedRelayError::config(format!("type is required for provider {:?}", p.id)));
    }
    if p.source_url.is_empty() {
        return Err(FeedRelayError::config(format!(
            "source_url is required for provider {:?}",
            p.id
        )));
    }
    url::Url::parse(&p.source_url).map_err(|e| {
        FeedRelayError::config(format!("source_url of provider {:?} is invalid: {e}", p.id))
    })?;
    Ok(())
}

fn validate_sink(s: &SinkConfig) -> Result<()> {
    if s.id.is_empty() {
        return Err(FeedRelayError::config("id is required"));
    }
    match s.kind.as_str() {
        SINK_TYPE_HTTP => {
            let http = s.http.as_ref().ok_or_else(|| {
                FeedRelayError::config(format!("http config required for sink {:?}", s.id))
            })?;
            if http.url.is_empty() {
                return Err(FeedRelayError::config(format!("http.url is required for sink {:?}", s.id)));
            }
        }
        SINK_TYPE_QUEUE => {
            let queue = s.queue.as_ref().ok_or_else(|| {
                FeedRelayError::config(format!("queue config required for sink {:?}", s.id))
            })?;
            validate_queue(&s.id, queue)?;
        }
        "" => return Err(FeedRelayError::config(format!("type is required for sink {:?}", s.id))),
        other => {
            return Err(FeedRelayError::config(format!(
                "type {other:?} not supported for sink {:?}",
                s.id
            )));
        }
    }
    Ok(())
}

fn validate_queue(id: &str, q: &QueueSinkConfig) -> Result<()> {
    let missing = |field: &str| FeedRelayError::config(format!("{field} is required for sink {id:?}"));
    match q.provider.as_str() {
        QUEUE_PROVIDER_AWS_SQS => {
            let sqs = q.sqs.as_ref().ok_or_else(|| missing("queue.sqs"))?;
            if sqs.queue_url.is_empty() {
                return Err(missing("queue.sqs.queue_url"));
            }
            if sqs.region.is_empty() {
                return Err(missing("queue.sqs.region"));
            }
            validate_credentials(id, &sqs.credentials)
        }
        QUEUE_PROVIDER_AWS_SNS => {
            let sns = q.sns.as_ref().ok_or_else(|| missing("queue.sns"))?;
            if sns.topic_arn.is_empty() {
                return Err(missing("queue.sns.topic_arn"));
            }
            if sns.region.is_empty() {
                return Err(missing("queue.sns.region"));
            }
            validate_credentials(id, &sns.credentials)
        }
        QUEUE_PROVIDER_GCP => {
            let gcp = q.gcp.as_ref().ok_or_else(|| missing("queue.gcp"))?;
            if gcp.project_id.is_empty() {
                return Err(missing("queue.gcp.project_id"));
            }
            if gcp.topic.is_empty() {
                return Err(missing("queue.gcp.topic"));
            }
            Ok(())
        }
        QUEUE_PROVIDER_AZURE => Err(FeedRelayError::config(format!(
            "queue provider {:?} not implemented for sink {id:?}",
            q.provider
        ))),
        other => Err(FeedRelayError::config(format!(
            "queue provider {other:?} not supported for sink {id:?}"
        ))),
    }
}

fn validate_credentials(id: &str, creds: &AwsCredentials) -> Result<()> {
    if creds.access_key_id.is_some() != creds.secret_access_key.is_some() {
        return Err(FeedRelayError::config(format!(
            "access_key_id and secret_access_key must be set together for sink {id:?}"
        )));
    }
    Ok(())
}

fn prefix_error(prefix: String, err: FeedRelayError) -> FeedRelayError {
    match err {
        FeedRelayError::Config { message } => FeedRelayError::config(format!("{prefix}: {message}")),
        other => other,
    }
}

fn sanitize_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn trim_credentials(creds: &mut AwsCredentials) {
    for field in [&mut creds.access_key_id, &mut creds.secret_access_key] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
}

fn redact_headers(headers: &mut BTreeMap<String, String>) {
    for v in headers.values_mut() {
        *v = REDACTED.into();
    }
}

fn redact_credentials(creds: &mut AwsCredentials) {
    if creds.secret_access_key.is_some() {
        creds.secret_access_key = Some(REDACTED.into());
    }
}

// ---------------------------------------------------------------------------
// Environment expansion
// ---------------------------------------------------------------------------

/// Matches `${NAME}` or `$NAME`.
static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("env var regex")
});

/// Replace `${NAME}` and `$NAME` with environment values. Unset variables
/// expand to the empty string.
pub fn expand_env(input: &str) -> String {
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.feedrelay/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FeedRelayError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the per-user config file (`~/.feedrelay/feedrelay.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Pick the config file: an explicit path, else `./feedrelay.toml` when it
/// exists, else the per-user file.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }
    config_file_path()
}

/// Load, expand, sanitize, and validate the config at `path`.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FeedRelayError::io(path, e))?;
    parse_config(&content).map_err(|e| match e {
        FeedRelayError::Config { message } => {
            FeedRelayError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Parse config text. Same pipeline as [`load_config_from`] without the file read.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let expanded = expand_env(content);
    let mut config: AppConfig = toml::from_str(&expanded)
        .map_err(|e| FeedRelayError::config(format!("failed to parse config: {e}")))?;
    config.sanitize();
    config.validate()?;
    Ok(config)
}

/// Write the starter config to `path`. Refuses to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(FeedRelayError::config(format!(
            "{} already exists, refusing to overwrite",
            path.display()
        )));
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| FeedRelayError::io(dir, e))?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| FeedRelayError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(path.to_path_buf())
}

/// Starter config written by `feedrelay config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# feedrelay configuration

[service]
crawl_interval_secs = 300
sweep_interval_secs = 3600
cycle_timeout_secs = 240
parallel_providers = false

[http]
timeout_secs = 15

[enrichment]
enabled = true
workers = 10

[dedupe]
# libsql | memory | none
backend = "libsql"
path = "var/feedrelay/seen.db"
ttl_hours = 72
mark_on_delivery_failure = true

[[providers]]
id = "example-news"
type = "google-news"
source_url = "https://example.com/sitemap-news.xml"
request_delay_ms = 250

[[sinks]]
id = "webhook"
type = "http"

[sinks.http]
url = "https://hooks.example.com/feedrelay"
headers = { Authorization = "Bearer ${FEEDRELAY_WEBHOOK_TOKEN}" }
timeout_seconds = 5

# [[sinks]]
# id = "queue"
# type = "queue"
#
# [sinks.queue]
# provider = "aws-sqs"
#
# [sinks.queue.sqs]
# queue_url = "https://sqs.ap-south-1.amazonaws.com/123456789012/news"
# region = "ap-south-1"
"#;
