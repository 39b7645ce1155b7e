use crate::parser::{is_end_marker, parse_page};
use crate::sources::Source;
use crate::traits::ItemStream;
use crate::types::{CacheError, FragmentStream, Item, RawFragment, Result, RunSummary};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Rebuilds the item stream of a recorded run from its cache ledger.
///
/// The decoding mirrors the live run step by step: the drop count comes from
/// the latest offset marker, page payloads feed the records, and each record
/// takes the detail payloads up to its end-of-item sentinel. Fragments are
/// pulled from the store only as items are asked for.
pub struct ReplayRun {
    source: Arc<Source>,
    fragments: FragmentStream,
    pending: VecDeque<Value>,
    offset: u64,
    drop_count: u64,
    summary: RunSummary,
    finished: bool,
}

impl ReplayRun {
    pub(crate) async fn new(source: Arc<Source>, mut fragments: FragmentStream) -> Result<Self> {
        let offset = match fragments.try_next().await? {
            None => return Err(CacheError::Empty.into()),
            Some(RawFragment::OffsetMarker(offset)) => offset,
            Some(_) => return Err(CacheError::MissingOffset.into()),
        };

        Ok(Self {
            drop_count: source.position(offset).drop,
            source,
            fragments,
            pending: VecDeque::new(),
            offset,
            summary: RunSummary::default(),
            finished: false,
        })
    }

    /// Start again from the offset of a resumed sub-run.
    fn reset_offset(&mut self, offset: u64) {
        if offset > self.offset {
            self.summary.lost += offset - self.offset;
        }
        self.offset = offset;
        self.drop_count = self.source.position(offset).drop;
    }

    /// Detail payloads of the current record, or `None` if the ledger ends
    /// before the record was closed.
    async fn read_details(&mut self) -> Result<Option<Vec<String>>> {
        let mut payloads = Vec::new();
        loop {
            match self.fragments.try_next().await? {
                None => return Ok(None),
                Some(RawFragment::EndOfItem) => return Ok(Some(payloads)),
                Some(RawFragment::DetailPayload(raw)) if is_end_marker(&raw) => return Ok(Some(payloads)),
                Some(RawFragment::DetailPayload(raw)) => payloads.push(raw),
                Some(other) => {
                    return Err(CacheError::Malformed(format!(
                        "item at offset {} is not closed before {:?}",
                        self.offset, other
                    ))
                    .into())
                }
            }
        }
    }

    async fn step(&mut self) -> Result<Option<Item>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                if self.drop_count > 0 {
                    self.drop_count -= 1;
                    continue;
                }

                let Some(payloads) = self.read_details().await? else {
                    warn!("Cache ledger ends in the middle of the item at offset {}", self.offset);
                    return Ok(None);
                };
                let item = self.source.build_item(record, &payloads, self.offset)?;
                self.offset += 1;
                self.summary.emitted += 1;
                return Ok(Some(item));
            }

            match self.fragments.try_next().await? {
                None => return Ok(None),
                Some(RawFragment::OffsetMarker(offset)) => self.reset_offset(offset),
                Some(RawFragment::PagePayload(raw)) => {
                    let page = parse_page(&raw)?;
                    self.summary.declared_total = Some(page.count);
                    self.pending.extend(page.results);
                }
                Some(other) => {
                    return Err(CacheError::Malformed(format!("{:?} found outside of an item", other)).into());
                }
            }
        }
    }
}

#[async_trait]
impl ItemStream for ReplayRun {
    async fn next_item(&mut self) -> Result<Option<Item>> {
        if self.finished {
            return Ok(None);
        }

        let next = self.step().await;
        match &next {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.finished = true;
                info!(
                    "Retrieval process completed: {} items retrieved from cache",
                    self.summary.emitted
                );
            }
            Err(e) => {
                self.finished = true;
                error!("Replay aborted at offset {}: {}", self.offset, e);
            }
        }
        next
    }

    fn summary(&self) -> RunSummary {
        self.summary
    }
}
