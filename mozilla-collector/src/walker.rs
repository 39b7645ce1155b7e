use crate::parser::{parse_page, RemotePage};
use crate::types::{Result, Transport};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// A page fetched by a [`PageWalker`], raw and decoded.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub number: u64,
    pub raw: String,
    pub page: RemotePage,
}

/// Walks a paginated endpoint one page at a time, oldest updates first.
///
/// The same walker drives both the item listing of a source and the
/// per-item detail listing of two-level sources; the latter just carries an
/// extra filter parameter.
#[derive(Debug, Clone)]
pub struct PageWalker {
    url: String,
    params: Vec<(String, String)>,
    page: u64,
    exhausted: bool,
}

impl PageWalker {
    pub fn new(url: impl Into<String>, start_page: u64) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            page: start_page,
            exhausted: false,
        }
    }

    /// Add a fixed query parameter, e.g. the item filter of a detail listing.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Continue the walk from `page`, even after it was exhausted.
    pub fn restart_at(&mut self, page: u64) {
        self.page = page;
        self.exhausted = false;
    }

    /// Fetch the next page, or `None` once the last page has been returned.
    ///
    /// A failed request leaves the walker untouched, so the caller decides
    /// whether to retry, skip with [`restart_at`](Self::restart_at), or abort.
    pub async fn next_page(&mut self, transport: &dyn Transport) -> Result<Option<FetchedPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut query = self.params.clone();
        query.push(("page".to_string(), self.page.to_string()));
        query.push(("ordering".to_string(), "updated".to_string()));

        debug!("Client calls API: {} params: {:?}", self.url, query);
        let raw = transport.fetch(&self.url, &query).await?;
        let page = parse_page(&raw)?;

        let number = self.page;
        match next_page_number(page.next.as_ref(), number) {
            Some(next) => self.page = next,
            None => self.exhausted = true,
        }

        Ok(Some(FetchedPage { number, raw, page }))
    }
}

/// Work out the page that follows `current` from a page's "next" cursor.
///
/// The cursor is usually a full URL (`…/events/?page=269`), sometimes a bare
/// page number. Anything else that is not empty just means "there is more".
pub fn next_page_number(cursor: Option<&Value>, current: u64) -> Option<u64> {
    match cursor? {
        Value::Null => None,
        Value::Number(n) => Some(n.as_u64().unwrap_or(current + 1)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(page_from_cursor(s).unwrap_or(current + 1)),
        Value::Bool(false) => None,
        _ => Some(current + 1),
    }
}

fn page_from_cursor(cursor: &str) -> Option<u64> {
    if let Ok(page) = cursor.trim().parse::<u64>() {
        return Some(page);
    }
    let url = Url::parse(cursor).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
