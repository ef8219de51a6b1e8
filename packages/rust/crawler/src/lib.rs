//! Page metadata enrichment.
//!
//! This crate provides:
//! - [`engine`]: the bounded, paced, cancellable [`Enricher`]
//! - [`metadata`]: Open Graph / Twitter card / `<title>` extraction

pub mod engine;
pub mod metadata;

pub use engine::{DEFAULT_WORKERS, Enricher, MAX_BODY_BYTES};
pub use metadata::{PageMetadata, extract, overlay};
