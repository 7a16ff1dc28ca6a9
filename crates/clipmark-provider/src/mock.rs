//! In-memory mock provider for sync and service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use clipmark_core::{
    DocumentProvider, DocumentSnapshot, Error, MarkerRange, ProviderCredential, ProviderFile,
    Result,
};

/// Scripted provider state keyed by provider file id.
#[derive(Default)]
struct MockState {
    snapshots: HashMap<String, DocumentSnapshot>,
    folders: HashMap<String, Vec<ProviderFile>>,
    /// File ids that fail with access-lost on any operation.
    revoked: Vec<String>,
}

/// A scriptable [`DocumentProvider`] backed by in-memory state.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the snapshot returned for a file.
    pub fn set_snapshot(&self, provider_file_id: &str, snapshot: DocumentSnapshot) {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .insert(provider_file_id.to_string(), snapshot);
    }

    /// Script a folder listing.
    pub fn set_folder(&self, folder_id: &str, files: Vec<ProviderFile>) {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert(folder_id.to_string(), files);
    }

    /// Make all further operations on a file fail with access-lost.
    pub fn revoke(&self, provider_file_id: &str) {
        self.state
            .lock()
            .unwrap()
            .revoked
            .push(provider_file_id.to_string());
    }
}

#[async_trait]
impl DocumentProvider for MockProvider {
    async fn fetch_snapshot(
        &self,
        _credential: &ProviderCredential,
        provider_file_id: &str,
    ) -> Result<DocumentSnapshot> {
        let state = self.state.lock().unwrap();
        if state.revoked.iter().any(|id| id == provider_file_id) {
            return Err(Error::ProviderAccessLost(format!(
                "access to {} revoked",
                provider_file_id
            )));
        }
        state
            .snapshots
            .get(provider_file_id)
            .cloned()
            .ok_or_else(|| Error::ProviderAccessLost(format!("{} not found", provider_file_id)))
    }

    async fn list_folder(
        &self,
        _credential: &ProviderCredential,
        folder_id: &str,
    ) -> Result<Vec<ProviderFile>> {
        let state = self.state.lock().unwrap();
        state
            .folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| Error::Provider(format!("folder {} not scripted", folder_id)))
    }

    async fn create_marker(
        &self,
        _credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
        range: MarkerRange,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.revoked.iter().any(|id| id == provider_file_id) {
            return Err(Error::ProviderAccessLost(format!(
                "access to {} revoked",
                provider_file_id
            )));
        }
        if let Some(snapshot) = state.snapshots.get_mut(provider_file_id) {
            snapshot.ranges.insert(segment_id, range);
        }
        Ok(())
    }

    async fn delete_marker(
        &self,
        _credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(snapshot) = state.snapshots.get_mut(provider_file_id) {
            snapshot.ranges.remove(&segment_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> ProviderCredential {
        ProviderCredential {
            access_token: "mock-token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_snapshot_roundtrip() {
        let provider = MockProvider::new();
        provider.set_snapshot(
            "file-1",
            DocumentSnapshot {
                title: "Doc".to_string(),
                text: "hello".to_string(),
                ranges: HashMap::new(),
                last_modified_at: None,
            },
        );

        let snapshot = provider
            .fetch_snapshot(&credential(), "file-1")
            .await
            .expect("snapshot");
        assert_eq!(snapshot.text, "hello");
    }

    #[tokio::test]
    async fn test_revoked_file_is_access_lost() {
        let provider = MockProvider::new();
        provider.set_snapshot(
            "file-1",
            DocumentSnapshot {
                title: "Doc".to_string(),
                text: "hello".to_string(),
                ranges: HashMap::new(),
                last_modified_at: None,
            },
        );
        provider.revoke("file-1");

        let err = provider
            .fetch_snapshot(&credential(), "file-1")
            .await
            .unwrap_err();
        assert!(err.is_access_lost());
    }

    #[tokio::test]
    async fn test_markers_mutate_snapshot() {
        let provider = MockProvider::new();
        provider.set_snapshot(
            "file-1",
            DocumentSnapshot {
                title: "Doc".to_string(),
                text: "hello world".to_string(),
                ranges: HashMap::new(),
                last_modified_at: None,
            },
        );

        let id = Uuid::new_v4();
        provider
            .create_marker(&credential(), "file-1", id, MarkerRange { start: 0, end: 5 })
            .await
            .expect("create marker");

        let snapshot = provider.fetch_snapshot(&credential(), "file-1").await.unwrap();
        assert!(snapshot.ranges.contains_key(&id));

        provider
            .delete_marker(&credential(), "file-1", id)
            .await
            .expect("delete marker");
        let snapshot = provider.fetch_snapshot(&credential(), "file-1").await.unwrap();
        assert!(!snapshot.ranges.contains_key(&id));
    }
}
