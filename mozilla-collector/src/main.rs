use clap::{Parser, Subcommand};
use interfaces::SqliteLedgerStore;
use mozilla_collector::{
    Category, Collector, CollectorError, FetchConfig, Fetcher, ItemClassifier, ItemStream, KitsuneSource, RemoSource,
    RunConfig, Source,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mozilla-collector", about = "Collect items from Mozilla community sites")]
struct Cli {
    #[command(subcommand)]
    backend: Backend,

    /// Offset of the first item to fetch
    #[arg(long, global = true, default_value_t = 0)]
    offset: u64,

    /// Replay the cached run instead of contacting the site
    #[arg(long, global = true)]
    from_cache: bool,

    /// Don't record the run in the cache
    #[arg(long, global = true, conflicts_with = "from_cache")]
    no_cache: bool,

    /// SQLite database holding the cache ledgers
    #[arg(long, global = true, env = "CACHE_DATABASE_URL", default_value = "sqlite://mozilla-collector-cache.db?mode=rwc")]
    cache_url: String,

    /// Label for the collected items (defaults to the site URL)
    #[arg(long, global = true)]
    tag: Option<String>,

    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Backend {
    /// Questions and answers from a Kitsune site
    Kitsune {
        #[arg(default_value = mozilla_collector::sources::kitsune::KITSUNE_URL)]
        url: String,
    },
    /// Events, activities or users from a ReMo site
    Remo {
        #[arg(default_value = mozilla_collector::sources::remo::MOZILLA_REPS_URL)]
        url: String,

        /// events, activities or users
        #[arg(long)]
        category: Option<String>,
    },
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig, CollectorError> {
        let category = match &self.backend {
            Backend::Remo { category: Some(category), .. } => Some(category.parse::<Category>()?),
            _ => None,
        };
        Ok(RunConfig {
            offset: self.offset,
            category,
            from_cache: self.from_cache,
            tag: self.tag.clone(),
        })
    }

    fn source(&self, config: &RunConfig) -> Result<Source, CollectorError> {
        let source = match &self.backend {
            Backend::Kitsune { url } => KitsuneSource::new(Some(url))?,
            Backend::Remo { url, .. } => match (config.category, config.from_cache) {
                (Some(category), _) => RemoSource::new(Some(url), category)?,
                // A replay without a selector has to guess each record's kind
                (None, true) => RemoSource::new(Some(url), Category::Event)?.with_classifier(ItemClassifier::Probe),
                (None, false) => RemoSource::new(Some(url), Category::Event)?,
            },
        };
        Ok(match &config.tag {
            Some(tag) => source.with_tag(tag.clone()),
            None => source,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = cli.run_config()?;
    let source = cli.source(&config)?;
    let origin = source.origin.clone();

    let transport = Arc::new(Fetcher::new(FetchConfig::default())?);
    let mut collector = Collector::new(source, transport);

    if !cli.no_cache {
        let store = SqliteLedgerStore::connect(&cli.cache_url, &origin).await.map_err(CollectorError::from)?;
        collector = collector.with_cache(Arc::new(store));
    }

    let mut run = collector.run(&config).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        match run.next_item().await {
            Ok(Some(item)) => {
                serde_json::to_writer(&mut out, &item)?;
                writeln!(out)?;
            }
            Ok(None) => break,
            Err(e) => {
                error!("Collection failed: {}", e);
                return Err(e.into());
            }
        }
    }

    let summary = run.summary();
    info!(
        "Fetch process completed: {} items fetched, {} lost, {} declared by the source",
        summary.emitted,
        summary.lost,
        summary.declared_total.unwrap_or(0)
    );
    Ok(())
}
