//! Command handlers for the Cascade CLI

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cascade_core::{Async, Atom, Executors};
use cascade_loader::{standard_chain, Fetcher, HttpFetcher, Request, Resource, ResourceLoader};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        let session = Session::open(&config)?;
        match cli.command {
            Commands::Fetch { url, repeat, text } => {
                Self::handle_fetch(&session, &url, repeat, text).await
            }
            Commands::Watch {
                url,
                count,
                interval_ms,
            } => {
                let interval = Duration::from_millis(interval_ms.unwrap_or(config.watch.interval_ms));
                Self::handle_watch(&session, &url, count, interval).await
            }
        }
    }

    /// Handle the fetch command
    async fn handle_fetch(session: &Session, url: &str, repeat: u32, text: bool) -> Result<()> {
        let resource = Resource::bytes(Request::parse(url)?);
        for round in 1..=repeat {
            let loaded = session.load(&resource).await?;
            if text {
                println!("{}", String::from_utf8_lossy(&loaded.body));
            } else {
                println!(
                    "round {}: {} bytes from {}",
                    round,
                    loaded.body.len(),
                    loaded.source
                );
            }
        }
        Ok(())
    }

    /// Handle the watch command
    async fn handle_watch(
        session: &Session,
        url: &str,
        count: u32,
        interval: Duration,
    ) -> Result<()> {
        let resource = Resource::bytes(Request::parse(url)?);
        let history = Atom::with_label("cascade.watch-history", Vec::new(), &session.executors)?;

        let (tx, mut snapshots) = tokio::sync::mpsc::unbounded_channel();
        let observer = history.notify(move |snapshot: Vec<FetchRecord>| {
            let _ = tx.send(snapshot);
        });
        debug!(%observer, "watching fetch history");

        // The first snapshot is the replay of the empty history.
        Self::print_next_snapshot(&mut snapshots).await?;

        for round in 1..=count {
            if round > 1 {
                tokio::time::sleep(interval).await;
            }
            let record = match session.load(&resource).await {
                Ok(loaded) => FetchRecord {
                    round,
                    outcome: Ok((loaded.source, loaded.body.len())),
                },
                Err(e) => {
                    warn!("Load failed in round {}: {}", round, e);
                    FetchRecord {
                        round,
                        outcome: Err(e.to_string()),
                    }
                }
            };
            history
                .update(move |records: &mut Vec<FetchRecord>| {
                    records.push(record.clone());
                    Ok(())
                })
                .await?;
            Self::print_next_snapshot(&mut snapshots).await?;
        }

        history.remove_observer(observer);
        Ok(())
    }

    async fn print_next_snapshot(
        snapshots: &mut tokio::sync::mpsc::UnboundedReceiver<Vec<FetchRecord>>,
    ) -> Result<()> {
        let snapshot = snapshots
            .recv()
            .await
            .ok_or_else(|| CliError::Config("history observer stopped".to_string()))?;
        println!("history ({} entries)", snapshot.len());
        for record in &snapshot {
            println!("  {}", record);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// Where a loaded payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => write!(f, "cache"),
            Source::Network => write!(f, "network"),
        }
    }
}

/// One entry in the watch history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub round: u32,
    pub outcome: std::result::Result<(Source, usize), String>,
}

impl fmt::Display for FetchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok((source, size)) => write!(f, "#{} {} bytes from {}", self.round, size, source),
            Err(reason) => write!(f, "#{} failed: {}", self.round, reason),
        }
    }
}

/// Payload together with the tier that produced it
#[derive(Debug, Clone)]
pub struct Loaded {
    pub source: Source,
    pub body: Vec<u8>,
}

/// Fetcher wrapper counting requests that reach the network
pub struct CountingFetcher<F> {
    inner: F,
    requests: AtomicU64,
}

impl<F: Fetcher> CountingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            requests: AtomicU64::new(0),
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

impl<F: Fetcher> Fetcher for CountingFetcher<F> {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(request)
    }
}

/// Loader chain shared by every round of a command
pub struct Session {
    pub executors: Executors,
    chain: ResourceLoader<Vec<u8>>,
    network: Arc<CountingFetcher<Arc<dyn Fetcher>>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("executors", &self.executors)
            .field("network_requests", &self.network.requests())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build the chain described by `config` on the current tokio runtime
    pub fn open(config: &AppConfig) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CliError::Config(format!("no tokio runtime: {e}")))?;
        let http: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(handle.clone(), &config.loader)?);
        Self::with_fetcher(config, Executors::tokio(handle), http)
    }

    /// Build the chain around an arbitrary network fetcher
    pub fn with_fetcher(
        config: &AppConfig,
        executors: Executors,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let network = Arc::new(CountingFetcher::new(fetcher));
        let chain = standard_chain(&config.loader, &executors, network.clone())?;
        match &config.loader.cache_dir {
            Some(dir) => info!("Disk cache at {}", dir.display()),
            None => info!("Disk cache disabled"),
        }
        Ok(Self {
            executors,
            chain,
            network,
        })
    }

    pub async fn load(&self, resource: &Resource<Vec<u8>>) -> Result<Loaded> {
        let before = self.network.requests();
        let body = self.chain.load(resource).await?;
        let source = if self.network.requests() > before {
            Source::Network
        } else {
            Source::Cache
        };
        Ok(Loaded { source, body })
    }
}
