use crate::types::{LedgerStore, RawFragment, Result};
use std::sync::Arc;
use tracing::debug;

/// The cache ledger of one run.
///
/// Fragments are buffered with [`push`](Self::push) and reach the store only
/// on [`flush`](Self::flush), as one batch. A run that stops between flushes
/// leaves the ledger at its last checkpoint.
pub struct CacheLedger {
    store: Arc<dyn LedgerStore>,
    queue: Vec<RawFragment>,
}

impl CacheLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            queue: Vec::new(),
        }
    }

    /// Drop every stored fragment and anything still buffered.
    pub async fn purge(&mut self) -> Result<()> {
        self.queue.clear();
        self.store.clear().await?;
        debug!("Cache ledger purged");
        Ok(())
    }

    pub fn push(&mut self, fragment: RawFragment) {
        self.queue.push(fragment);
    }

    pub async fn flush(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.store.append(&self.queue).await?;
        debug!("Flushed {} fragments to the cache ledger", self.queue.len());
        self.queue.clear();
        Ok(())
    }

    /// Fragments pushed since the last flush.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
