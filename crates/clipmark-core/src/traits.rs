//! Core traits for clipmark abstractions.
//!
//! The external document provider is the one hard seam in the system:
//! everything the core needs from it is expressed here, so the concrete
//! Google adapter and the test mock are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;

/// A character range inside a document's plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRange {
    pub start: i32,
    pub end: i32,
}

/// Current state of an external document: plain text plus the named-range
/// offsets keyed by segment id.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub title: String,
    pub text: String,
    /// segment id -> current range. Missing entries are orphaned markers.
    pub ranges: HashMap<Uuid, MarkerRange>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// A file listed in the watched folder.
#[derive(Debug, Clone)]
pub struct ProviderFile {
    pub provider_file_id: String,
    pub title: String,
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Per-request credential for the external provider, resolved from the
/// user's stored tokens and threaded explicitly.
#[derive(Debug, Clone)]
pub struct ProviderCredential {
    pub access_token: String,
}

/// External document provider: fetch current text and named-range offsets,
/// list the watch folder, and manage named ranges for segment markers.
///
/// Implementations map "document deleted or permission revoked" to
/// [`crate::Error::ProviderAccessLost`] so reconciliation can treat it as an
/// expected terminal state.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Fetch the document's current plain text and named-range offsets.
    async fn fetch_snapshot(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
    ) -> Result<DocumentSnapshot>;

    /// List documents currently in the given folder.
    async fn list_folder(
        &self,
        credential: &ProviderCredential,
        folder_id: &str,
    ) -> Result<Vec<ProviderFile>>;

    /// Create a named range marking a segment in the document.
    async fn create_marker(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
        range: MarkerRange,
    ) -> Result<()>;

    /// Delete the named range for a segment, if present.
    async fn delete_marker(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
    ) -> Result<()>;
}
