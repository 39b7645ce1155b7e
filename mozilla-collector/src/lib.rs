pub mod types;
pub mod offset;
pub mod parser;
pub mod walker;
pub mod classifier;
pub mod ledger;
pub mod sources;
pub mod traits;
pub mod collector;
pub mod replay;
pub mod fetcher;
pub mod utils;

pub use types::*;
pub use offset::{translate, PagePosition};
pub use classifier::ItemClassifier;
pub use ledger::CacheLedger;
pub use sources::{DetailMode, KitsuneSource, RemoSource, Source};
pub use traits::{into_stream, ItemStream};
pub use collector::{Collector, LiveRun};
pub use replay::ReplayRun;
pub use fetcher::Fetcher;
pub use walker::PageWalker;
