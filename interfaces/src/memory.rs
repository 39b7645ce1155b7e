use crate::defs::{FragmentStream, LedgerStore, RawFragment, StoreError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ledger store kept in process memory.
///
/// Clones share the same ledger, so a test can hand one clone to a collector
/// and inspect the fragments through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    fragments: Arc<RwLock<Vec<RawFragment>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store that already holds `fragments`.
    pub fn with_fragments(fragments: Vec<RawFragment>) -> Self {
        Self {
            fragments: Arc::new(RwLock::new(fragments)),
        }
    }

    pub async fn len(&self) -> usize {
        self.fragments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.fragments.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn append(&self, fragments: &[RawFragment]) -> Result<(), StoreError> {
        let mut stored = self.fragments.write().await;
        stored.extend_from_slice(fragments);
        Ok(())
    }

    async fn read_sequence(&self) -> Result<FragmentStream, StoreError> {
        // Appends made after this call don't show up in the stream
        let snapshot = self.fragments.read().await.clone();
        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.fragments.write().await.clear();
        Ok(())
    }
}
