use crate::ledger::CacheLedger;
use crate::replay::ReplayRun;
use crate::sources::{DetailMode, Source};
use crate::traits::ItemStream;
use crate::types::{
    CacheError, CollectorError, Item, LedgerStore, RawFragment, Result, RunConfig, RunSummary, Transport, TransportError,
};
use crate::walker::PageWalker;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Collects the items of one source, live or from its cache ledger.
pub struct Collector {
    source: Arc<Source>,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn LedgerStore>>,
}

impl Collector {
    pub fn new(source: Source, transport: Arc<dyn Transport>) -> Self {
        Self {
            source: Arc::new(source),
            transport,
            cache: None,
        }
    }

    /// Record every live run in `store` so it can be replayed later.
    pub fn with_cache(mut self, store: Arc<dyn LedgerStore>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Start a live run at logical `offset`.
    ///
    /// The cache ledger, if any, is purged before anything is fetched.
    pub async fn fetch(&self, offset: u64) -> Result<LiveRun> {
        LiveRun::start(
            Arc::clone(&self.source),
            Arc::clone(&self.transport),
            self.cache.clone(),
            offset,
        )
        .await
    }

    /// Replay the run recorded in the cache ledger without contacting the source.
    pub async fn fetch_from_cache(&self) -> Result<ReplayRun> {
        let store = self.cache.as_ref().ok_or(CacheError::NotProvided)?;

        info!("Retrieving cached {} items: '{}'", self.source.backend_name, self.source.origin);
        let fragments = store.read_sequence().await?;
        ReplayRun::new(Arc::clone(&self.source), fragments).await
    }

    /// Start whichever run `config` asks for.
    pub async fn run(&self, config: &RunConfig) -> Result<Box<dyn ItemStream>> {
        if config.from_cache {
            Ok(Box::new(self.fetch_from_cache().await?))
        } else {
            Ok(Box::new(self.fetch(config.offset).await?))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Done,
    Failed,
}

/// A live collection run.
///
/// Pages are requested only when the items already fetched are used up, and
/// the ledger is flushed after every emitted item, so the ledger always ends
/// on an item boundary.
pub struct LiveRun {
    source: Arc<Source>,
    transport: Arc<dyn Transport>,
    ledger: Option<CacheLedger>,
    walker: PageWalker,
    pending: VecDeque<Value>,
    drop_count: u64,
    current_offset: u64,
    summary: RunSummary,
    state: RunState,
}

impl LiveRun {
    async fn start(
        source: Arc<Source>,
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn LedgerStore>>,
        offset: u64,
    ) -> Result<Self> {
        info!(
            "Looking for {} items at url '{}' ({}) using offset {}",
            source.backend_name, source.origin, source.items_url, offset
        );

        // Always get complete pages so the first item is always the first one in the page
        let position = source.position(offset);
        debug!(
            "{} items dropped to get {} offset starting in page {}",
            position.drop, offset, position.page
        );

        let ledger = match store {
            Some(store) => {
                let mut ledger = CacheLedger::new(store);
                ledger.purge().await?;
                ledger.push(RawFragment::OffsetMarker(offset));
                Some(ledger)
            }
            None => None,
        };

        Ok(Self {
            walker: PageWalker::new(source.items_url.clone(), position.page),
            source,
            transport,
            ledger,
            pending: VecDeque::new(),
            drop_count: position.drop,
            current_offset: offset,
            summary: RunSummary::default(),
            state: RunState::Running,
        })
    }

    fn push(&mut self, fragment: RawFragment) {
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.push(fragment);
        }
    }

    async fn flush(&mut self) -> Result<()> {
        match self.ledger.as_mut() {
            Some(ledger) => ledger.flush().await,
            None => Ok(()),
        }
    }

    async fn step(&mut self) -> Result<Option<Item>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                if self.drop_count > 0 {
                    // Remove extra items due to page base retrieval
                    self.drop_count -= 1;
                    if self.pending.is_empty() {
                        self.flush().await?;
                    }
                    continue;
                }
                return self.complete_item(record).await.map(Some);
            }

            match self.walker.next_page(self.transport.as_ref()).await {
                Ok(Some(fetched)) => {
                    self.push(RawFragment::PagePayload(fetched.raw));
                    self.summary.declared_total = Some(fetched.page.count);
                    debug!(
                        "Items: {}/{} (page {} with {} results)",
                        self.current_offset,
                        fetched.page.count,
                        fetched.number,
                        fetched.page.results.len()
                    );
                    if fetched.page.results.is_empty() {
                        self.flush().await?;
                    }
                    self.pending.extend(fetched.page.results);
                }
                Ok(None) => {
                    self.flush().await?;
                    return Ok(None);
                }
                Err(CollectorError::Transport(e)) if e.is_server_error() => {
                    self.skip_page(e).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Give up on the page that failed and continue one page further.
    ///
    /// The offset always advances by a full page, even when the lost page
    /// was the last, shorter one.
    async fn skip_page(&mut self, e: TransportError) -> Result<()> {
        let page_size = self.source.page_size;
        error!(
            "Problem getting {} items ({}). Losing {} items. Going to the next page.",
            self.source.backend_name, e, page_size
        );

        self.summary.lost += page_size;
        self.current_offset += page_size;

        let position = self.source.position(self.current_offset);
        self.drop_count = position.drop;
        self.walker.restart_at(position.page);

        // Replay restarts its offset accounting at every marker
        self.push(RawFragment::OffsetMarker(self.current_offset));
        self.flush().await
    }

    async fn complete_item(&mut self, record: Value) -> Result<Item> {
        let offset = self.current_offset;
        self.current_offset += 1;

        let payloads = self.fetch_details(&record).await?;
        for raw in &payloads {
            self.push(RawFragment::DetailPayload(raw.clone()));
        }
        self.push(RawFragment::EndOfItem);

        let item = self.source.build_item(record, &payloads, offset)?;
        self.flush().await?;
        self.summary.emitted += 1;
        Ok(item)
    }

    async fn fetch_details(&self, record: &Value) -> Result<Vec<String>> {
        match &self.source.details {
            DetailMode::None => Ok(Vec::new()),
            DetailMode::Paginated { url, filter_key } => {
                let id = self.source.classifier.identify(record)?;
                let mut walker = PageWalker::new(url.clone(), self.source.first_page).with_param(filter_key.clone(), id);

                let mut payloads = Vec::new();
                while let Some(page) = walker.next_page(self.transport.as_ref()).await? {
                    payloads.push(page.raw);
                }
                Ok(payloads)
            }
            DetailMode::Expand { url_field } => {
                let url = record.get(url_field).and_then(Value::as_str).ok_or_else(|| {
                    CollectorError::parse(format!("record has no '{}' to expand", url_field), &record.to_string())
                })?;
                debug!("Expanding item from {}", url);
                Ok(vec![self.transport.fetch(url, &[]).await?])
            }
        }
    }
}

#[async_trait]
impl ItemStream for LiveRun {
    async fn next_item(&mut self) -> Result<Option<Item>> {
        if self.state != RunState::Running {
            return Ok(None);
        }

        match self.step().await {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.state = RunState::Done;
                info!(
                    "Total number of {} items: {} ({} total)",
                    self.source.backend_name,
                    self.summary.emitted,
                    self.summary.declared_total.unwrap_or(0)
                );
                info!("Items with errors dropped: {}", self.summary.lost);
                Ok(None)
            }
            Err(e) => {
                self.state = RunState::Failed;
                error!("Run aborted at offset {}: {}", self.current_offset, e);
                Err(e)
            }
        }
    }

    fn summary(&self) -> RunSummary {
        self.summary
    }
}
