use async_trait::async_trait;
use futures::stream::{BoxStream, TryStreamExt};
use serde::{Deserialize, Serialize};

/// One unit of the cache ledger.
///
/// A ledger for a run is an ordered sequence of fragments: an offset marker,
/// then raw page payloads, each followed by the detail payloads and the
/// end-of-item sentinel of every item emitted from that page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawFragment {
    OffsetMarker(u64),
    PagePayload(String),
    DetailPayload(String),
    EndOfItem,
}

impl RawFragment {
    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Failure reported by a transport.
///
/// Server errors (5xx) are kept apart from every other failure because the
/// collector recovers from them by skipping a page.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server error {status} for {url}")]
    Server { status: u16, url: String },

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
}

impl TransportError {
    pub fn is_server_error(&self) -> bool {
        matches!(self, TransportError::Server { .. })
    }

    /// Classify a non-success status code.
    pub fn from_status(status: u16, url: &str) -> Self {
        if (500..600).contains(&status) {
            TransportError::Server { status, url: url.to_string() }
        } else {
            TransportError::Status { status, url: url.to_string() }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("fragment encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound HTTP capability: GET `url` with the given query and return the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError>;
}

/// Fragments of a ledger, read from storage as they are pulled.
pub type FragmentStream = BoxStream<'static, Result<RawFragment, StoreError>>;

/// Durable, ordered, append-only storage for one ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a batch of fragments after everything already stored.
    /// A batch is either stored completely or not at all.
    async fn append(&self, fragments: &[RawFragment]) -> Result<(), StoreError>;

    /// Every stored fragment, in append order.
    ///
    /// Fragments are read and decoded on demand; a fragment that can't be
    /// decoded only fails the stream when it is reached.
    async fn read_sequence(&self) -> Result<FragmentStream, StoreError>;

    /// Read the whole ledger at once.
    async fn read_all(&self) -> Result<Vec<RawFragment>, StoreError> {
        self.read_sequence().await?.try_collect().await
    }

    async fn clear(&self) -> Result<(), StoreError>;
}

// Object style note:
// Stores are shared behind `Arc<dyn LedgerStore>` but a ledger has exactly one
// writer at a time. Stores don't coordinate writers; the collector guarantees
// that a ledger is never cleared while a replay is reading it.
