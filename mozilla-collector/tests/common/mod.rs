#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mozilla_collector::{Transport, TransportError};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};

pub const KITSUNE_TEST_URL: &str = "http://kitsune.test";
pub const REMO_TEST_URL: &str = "http://remo.test";

pub const PAGE_SIZE: u64 = 20;
pub const ANSWERS_PER_PAGE: u64 = 2;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A request seen by a fake site.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub params: HashMap<String, String>,
}

impl Call {
    pub fn page(&self) -> Option<u64> {
        self.params.get("page").and_then(|p| p.parse().ok())
    }
}

/// Deterministic Kitsune or ReMo site.
///
/// Listing pages hold `PAGE_SIZE` records in update order. Kitsune question
/// `i` has `i % 4` answers, served `ANSWERS_PER_PAGE` at a time. ReMo records
/// point at a detail URL holding the full event.
pub struct FakeSite {
    base: String,
    total: u64,
    failing_pages: HashMap<u64, u16>,
    broken_details: HashSet<u64>,
    undated: HashSet<u64>,
    calls: Mutex<Vec<Call>>,
}

impl FakeSite {
    pub fn kitsune(total: u64) -> Self {
        Self::new(KITSUNE_TEST_URL, total)
    }

    pub fn remo(total: u64) -> Self {
        Self::new(REMO_TEST_URL, total)
    }

    fn new(base: &str, total: u64) -> Self {
        Self {
            base: base.to_string(),
            total,
            failing_pages: HashMap::new(),
            broken_details: HashSet::new(),
            undated: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every request for listing page `page` answer with `status`.
    pub fn failing_page(mut self, page: u64, status: u16) -> Self {
        self.failing_pages.insert(page, status);
        self
    }

    /// Serve garbage instead of the details of record `index`: an HTML answer
    /// page on Kitsune, a JSON array instead of the event on ReMo.
    pub fn broken_details(mut self, index: u64) -> Self {
        self.broken_details.insert(index);
        self
    }

    /// Leave the update time out of record `index`.
    pub fn undated(mut self, index: u64) -> Self {
        self.undated.insert(index);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Listing pages requested, in order.
    pub fn listing_pages(&self) -> Vec<u64> {
        self.calls()
            .iter()
            .filter(|call| call.url.ends_with("/question/") || call.url.ends_with("/events/"))
            .filter_map(Call::page)
            .collect()
    }

    fn listing(&self, url: &str, page: u64, record: impl Fn(u64) -> Value) -> Result<String, TransportError> {
        if let Some(status) = self.failing_pages.get(&page) {
            return Err(TransportError::from_status(*status, url));
        }

        let start = (page - 1) * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.total);
        let results: Vec<Value> = (start..end).map(record).collect();
        let next = if end < self.total {
            Value::String(format!("{}?ordering=updated&page={}", url, page + 1))
        } else {
            Value::Null
        };

        Ok(json!({"count": self.total, "next": next, "previous": null, "results": results}).to_string())
    }

    fn question(&self, index: u64) -> Value {
        let mut record = question(index);
        if self.undated.contains(&index) {
            record.as_object_mut().unwrap().remove("updated");
        }
        record
    }

    fn answers(&self, question: u64, page: u64) -> String {
        let index = question - 1000;
        if self.broken_details.contains(&index) {
            return "<html>502 Bad Gateway</html>".to_string();
        }
        let total = index % 4;
        let start = (page - 1) * ANSWERS_PER_PAGE;
        let end = (start + ANSWERS_PER_PAGE).min(total);
        let results: Vec<Value> = (start..end)
            .map(|n| json!({"id": question * 10 + n, "question": question, "content": format!("answer {}", n)}))
            .collect();
        let next = if end < total { json!(page + 1) } else { Value::Null };

        json!({"count": total, "next": next, "results": results}).to_string()
    }
}

pub fn updated(index: u64) -> String {
    let base = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
    (base + Duration::minutes(index as i64)).format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn question(index: u64) -> Value {
    json!({
        "id": 1000 + index,
        "title": format!("Question {}", index),
        "updated": updated(index),
        "product": "firefox",
    })
}

#[async_trait]
impl Transport for FakeSite {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        let params: HashMap<String, String> = params.iter().cloned().collect();
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            params: params.clone(),
        });

        let page = params.get("page").and_then(|p| p.parse::<u64>().ok()).unwrap_or(1);

        if url == format!("{}/api/2/question/", self.base) {
            return self.listing(url, page, |index| self.question(index));
        }
        if url == format!("{}/api/2/answer/", self.base) {
            let question = params["question"].parse::<u64>().unwrap();
            return Ok(self.answers(question, page));
        }
        if url == format!("{}/api/remo/v1/events/", self.base) {
            let base = self.base.clone();
            return self.listing(url, page, move |n| {
                json!({"_url": format!("{}/api/remo/v1/events/{}/", base, n), "name": format!("Event {}", n)})
            });
        }
        if let Some(rest) = url.strip_prefix(&format!("{}/api/remo/v1/events/", self.base)) {
            let n: u64 = rest.trim_end_matches('/').parse().unwrap();
            if self.broken_details.contains(&n) {
                return Ok("[]".to_string());
            }
            let mut event = json!({
                "remo_url": format!("{}/e/event-{}/", self.base, n),
                "name": format!("Event {}", n),
                "estimated_attendance": 10 + n,
                "end": format!("{}Z", updated(n)),
            });
            if self.undated.contains(&n) {
                event.as_object_mut().unwrap().remove("end");
            }
            return Ok(event.to_string());
        }

        Err(TransportError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// Site whose listing pages are not JSON.
pub struct BrokenSite;

#[async_trait]
impl Transport for BrokenSite {
    async fn fetch(&self, _url: &str, _params: &[(String, String)]) -> Result<String, TransportError> {
        Ok("<html>Service temporarily unavailable</html>".to_string())
    }
}
