use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use interfaces::defs::{FragmentStream, LedgerStore, RawFragment, StoreError, Transport, TransportError};

/// Kind of record a source emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Question,
    Event,
    Activity,
    User,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Question => "question",
            Category::Event => "event",
            Category::Activity => "activity",
            Category::User => "user",
        }
    }

    /// Plural selector used in ReMo endpoint paths and on the command line.
    pub fn selector(&self) -> &'static str {
        match self {
            Category::Question => "questions",
            Category::Event => "events",
            Category::Activity => "activities",
            Category::User => "users",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "question" | "questions" => Ok(Category::Question),
            "event" | "events" => Ok(Category::Event),
            "activity" | "activities" => Ok(Category::Activity),
            "user" | "users" => Ok(Category::User),
            other => Err(CollectorError::InvalidCategory(other.to_string())),
        }
    }
}

/// A decoded record plus the fields the collector adds to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub backend_name: String,
    pub backend_version: String,
    pub origin: String,
    pub tag: String,
    pub uuid: Uuid,
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub category: Category,
    pub offset: u64,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Value>>,
}

/// Counters of a run, live or replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub emitted: u64,
    pub lost: u64,
    /// Total the source declared in its last page; may be stale.
    pub declared_total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla-Collector/1.0".to_string(),
            timeout_seconds: 30,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// What the operator asks a collection run to do.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub offset: u64,
    pub category: Option<Category>,
    pub from_cache: bool,
    pub tag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache instance was not provided")]
    NotProvided,

    #[error("cache ledger is empty")]
    Empty,

    #[error("cache ledger does not start with an offset marker")]
    MissingOffset,

    #[error("malformed cache ledger: {0}")]
    Malformed(String),

    #[error("cache storage failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("parse error: {cause}; payload: {payload}")]
    Parse { cause: String, payload: String },

    #[error("cannot classify item {id}: {reason}")]
    Classification { id: String, reason: String },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("unsupported category: {0}")]
    InvalidCategory(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CollectorError {
    pub fn parse(cause: impl fmt::Display, payload: &str) -> Self {
        CollectorError::Parse {
            cause: cause.to_string(),
            payload: payload.to_string(),
        }
    }
}

impl From<StoreError> for CollectorError {
    fn from(e: StoreError) -> Self {
        CollectorError::Cache(CacheError::Store(e))
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
