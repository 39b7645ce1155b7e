use super::{api_url, DetailMode, Source};
use crate::classifier::ItemClassifier;
use crate::types::{Category, CollectorError, Result};

pub const MOZILLA_REPS_URL: &str = "https://reps.mozilla.org";

/// ReMo, the Mozilla Reps portal: events, activity reports and reps.
///
/// Listing pages only carry a summary of each record, so every record is
/// expanded from its own `_url`.
pub struct RemoSource;

impl RemoSource {
    pub const BACKEND_NAME: &'static str = "remo";
    pub const BACKEND_VERSION: &'static str = "0.5.0";
    pub const FIRST_PAGE: u64 = 1;
    pub const ITEMS_PER_PAGE: u64 = 20;
    pub const API_PATH: &'static str = "api/remo/v1";

    pub const CATEGORIES: [Category; 3] = [Category::Event, Category::Activity, Category::User];

    pub fn new(url: Option<&str>, category: Category) -> Result<Source> {
        if !Self::CATEGORIES.contains(&category) {
            return Err(CollectorError::InvalidCategory(category.selector().to_string()));
        }
        let url = url.unwrap_or(MOZILLA_REPS_URL);

        Ok(Source {
            backend_name: Self::BACKEND_NAME,
            backend_version: Self::BACKEND_VERSION,
            origin: url.to_string(),
            tag: url.to_string(),
            items_url: api_url(url, &format!("{}/{}/", Self::API_PATH, category.selector()))?,
            details: DetailMode::Expand {
                url_field: "_url".to_string(),
            },
            classifier: ItemClassifier::for_category(category),
            page_size: Self::ITEMS_PER_PAGE,
            first_page: Self::FIRST_PAGE,
        })
    }
}
