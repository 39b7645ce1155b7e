pub mod kitsune;
pub mod remo;

pub use kitsune::KitsuneSource;
pub use remo::RemoSource;

use crate::classifier::ItemClassifier;
use crate::offset::{translate, PagePosition};
use crate::parser::{parse_page, parse_record};
use crate::types::{CacheError, CollectorError, Item, Result};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// How a listed record is completed before it is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailMode {
    /// The listing record is complete.
    None,
    /// Walk a second paginated endpoint filtered by the record id and gather
    /// every result into the item's `details`.
    Paginated { url: String, filter_key: String },
    /// Fetch the URL found in `url_field`; the fetched record replaces the
    /// listing record.
    Expand { url_field: String },
}

/// Everything the collector needs to know about one remote source.
#[derive(Debug, Clone)]
pub struct Source {
    pub backend_name: &'static str,
    pub backend_version: &'static str,
    pub origin: String,
    pub tag: String,
    pub items_url: String,
    pub details: DetailMode,
    pub classifier: ItemClassifier,
    pub page_size: u64,
    pub first_page: u64,
}

impl Source {
    /// Label the items of this source with `tag` instead of the origin.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_classifier(mut self, classifier: ItemClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn position(&self, offset: u64) -> PagePosition {
        translate(offset, self.page_size, self.first_page)
    }

    /// Turn a listed record and the raw detail payloads recorded for it into
    /// an item. Live runs and replays both go through here, which is what
    /// keeps their output identical.
    pub fn build_item(&self, record: Value, detail_payloads: &[String], offset: u64) -> Result<Item> {
        let (data, details) = match &self.details {
            DetailMode::None => {
                if !detail_payloads.is_empty() {
                    return Err(CacheError::Malformed(format!(
                        "{} detail payloads recorded for a {} item",
                        detail_payloads.len(),
                        self.backend_name
                    ))
                    .into());
                }
                (record, None)
            }
            DetailMode::Paginated { .. } => {
                let mut details = Vec::new();
                for raw in detail_payloads {
                    details.extend(parse_page(raw)?.results);
                }
                (record, Some(details))
            }
            DetailMode::Expand { .. } => match detail_payloads {
                [raw] => (parse_record(raw)?, None),
                _ => {
                    return Err(CollectorError::parse(
                        format!("expected one expanded record, found {}", detail_payloads.len()),
                        &record.to_string(),
                    ))
                }
            },
        };

        let id = self.classifier.identify(&data)?;
        let updated_at = self.classifier.updated_at(&data)?;
        let category = self.classifier.classify(&data)?;
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{}:{}", self.origin, id).as_bytes());

        Ok(Item {
            backend_name: self.backend_name.to_string(),
            backend_version: self.backend_version.to_string(),
            origin: self.origin.clone(),
            tag: self.tag.clone(),
            uuid,
            id,
            updated_at,
            category,
            offset,
            data,
            details,
        })
    }
}

/// Validate a base URL and append an API path to it.
pub(crate) fn api_url(base: &str, path: &str) -> Result<String> {
    Url::parse(base).map_err(|e| CollectorError::Config(format!("invalid URL '{}': {}", base, e)))?;
    Ok(format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')))
}
