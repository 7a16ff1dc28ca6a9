//! # clipmark-core
//!
//! Core types, traits, and abstractions for clipmark.
//!
//! This crate provides:
//! - Domain models (documents, segments, categories, tags, associations)
//! - The typed error enum and `Result` alias
//! - The external document provider trait (the system's one hard seam)
//! - Pure algorithm helpers: color selection, reconciliation diffing,
//!   snippet/title derivation

pub mod color;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod text;
pub mod traits;
pub mod uuid_utils;

pub use color::{select_color, UsageStats};
pub use error::{Error, Result};
pub use models::*;
pub use reconcile::{diff_segments, ReconcilePlan, SegmentChange, SegmentDiff};
pub use text::{derive_title, slice_by_chars};
pub use traits::{
    DocumentProvider, DocumentSnapshot, MarkerRange, ProviderCredential, ProviderFile,
};
pub use uuid_utils::new_v7;
