//! Crawl orchestration for feedrelay.
//!
//! This crate ties together sources, enrichment, the seen store, and sink
//! fan-out into crawl cycles, and runs those cycles on a schedule.

pub mod orchestrator;
pub mod scheduler;
pub mod service;

pub use orchestrator::{
    CycleReport, Orchestrator, OrchestratorOptions, ProviderOutcome, ProviderReport,
};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use service::{Service, check_config, check_provider_types};
