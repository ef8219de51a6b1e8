//! Shared types, error model, and configuration for feedrelay.
//!
//! This crate is the foundation depended on by all other feedrelay crates.
//! It provides:
//! - [`FeedRelayError`], the unified error type
//! - Domain types ([`Item`], [`Event`], [`derive_id`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AwsCredentials, AzureQueueConfig, DedupeBackend, DedupeConfig, EnrichmentConfig,
    GcpQueueConfig, HttpConfig, HttpSinkConfig, ProviderConfig, QueueSinkConfig, ServiceConfig,
    SinkConfig, SnsConfig, SqsConfig, config_dir, config_file_path, expand_env, init_config,
    load_config_from, parse_config, resolve_config_path,
};
pub use error::{FeedRelayError, Result};
pub use types::{Event, Item, derive_id, normalize_keywords};
