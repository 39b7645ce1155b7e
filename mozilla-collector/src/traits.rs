use crate::types::{Item, Result, RunSummary};
use async_trait::async_trait;
use futures::stream::{self, Stream};

/// A collection run that hands out items one at a time, on demand.
#[async_trait]
pub trait ItemStream: Send {
    /// Produce the next item, or `None` once the run is finished.
    /// After an error the run is over and keeps returning `None`.
    async fn next_item(&mut self) -> Result<Option<Item>>;

    fn summary(&self) -> RunSummary;

    /// Drain the run.
    async fn collect_items(&mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Adapt a run to a [`Stream`]; the stream ends after the first error.
pub fn into_stream<R>(run: R) -> impl Stream<Item = Result<Item>>
where
    R: ItemStream + 'static,
{
    stream::try_unfold(run, |mut run| async move {
        Ok(run.next_item().await?.map(|item| (item, run)))
    })
}
