use super::{api_url, DetailMode, Source};
use crate::classifier::ItemClassifier;
use crate::types::Result;

pub const KITSUNE_URL: &str = "https://support.mozilla.org";

/// Kitsune, the Mozilla support forum: questions, each completed with all of
/// its answers.
pub struct KitsuneSource;

impl KitsuneSource {
    pub const BACKEND_NAME: &'static str = "kitsune";
    pub const BACKEND_VERSION: &'static str = "0.4.0";
    pub const FIRST_PAGE: u64 = 1;
    pub const ITEMS_PER_PAGE: u64 = 20;

    pub fn new(url: Option<&str>) -> Result<Source> {
        let url = url.unwrap_or(KITSUNE_URL);

        Ok(Source {
            backend_name: Self::BACKEND_NAME,
            backend_version: Self::BACKEND_VERSION,
            origin: url.to_string(),
            tag: url.to_string(),
            items_url: api_url(url, "api/2/question/")?,
            details: DetailMode::Paginated {
                url: api_url(url, "api/2/answer/")?,
                filter_key: "question".to_string(),
            },
            classifier: ItemClassifier::Question,
            page_size: Self::ITEMS_PER_PAGE,
            first_page: Self::FIRST_PAGE,
        })
    }
}
