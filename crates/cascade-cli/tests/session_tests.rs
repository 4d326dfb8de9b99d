//! Session tests with an in-process fetcher standing in for the network

use std::sync::Arc;

use cascade_cli::commands::{CountingFetcher, Session, Source};
use cascade_cli::config::AppConfig;
use cascade_core::{Async, CascadeError, Executors};
use cascade_loader::{Fetcher, Request, Resource};

struct StaticFetcher(&'static [u8]);

impl Fetcher for StaticFetcher {
    fn fetch(&self, _request: &Request) -> Async<Vec<u8>> {
        Async::pure(self.0.to_vec())
    }
}

struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>> {
        Async::fail(CascadeError::request_failed(request.url().as_str(), "offline"))
    }
}

fn config_without_disk() -> AppConfig {
    let mut config = AppConfig::default();
    config.default_disk_cache = false;
    config.loader.cache_dir = None;
    config
}

fn resource() -> Resource<Vec<u8>> {
    Resource::bytes(Request::parse("https://example.com/data").unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_round_is_served_from_memory() {
    let session = Session::with_fetcher(
        &config_without_disk(),
        Executors::current().unwrap(),
        Arc::new(StaticFetcher(b"payload")),
    )
    .unwrap();

    let first = session.load(&resource()).await.unwrap();
    assert_eq!(first.source, Source::Network);
    assert_eq!(first.body, b"payload".to_vec());

    let second = session.load(&resource()).await.unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(second.body, b"payload".to_vec());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disk_tier_serves_a_new_session_offline() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_without_disk();
    config.loader.cache_dir = Some(dir.path().to_path_buf());

    let online = Session::with_fetcher(
        &config,
        Executors::current().unwrap(),
        Arc::new(StaticFetcher(b"kept")),
    )
    .unwrap();
    assert_eq!(online.load(&resource()).await.unwrap().source, Source::Network);

    let offline = Session::with_fetcher(
        &config,
        Executors::current().unwrap(),
        Arc::new(OfflineFetcher),
    )
    .unwrap();
    let loaded = offline.load(&resource()).await.unwrap();
    assert_eq!(loaded.source, Source::Cache);
    assert_eq!(loaded.body, b"kept".to_vec());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_offline_without_cache_reports_transport_error() {
    let session = Session::with_fetcher(
        &config_without_disk(),
        Executors::current().unwrap(),
        Arc::new(OfflineFetcher),
    )
    .unwrap();

    let err = session.load(&resource()).await.unwrap_err();
    assert!(err.to_string().contains("offline"));
}

#[test]
fn test_counting_fetcher_counts_every_request() {
    let counting = CountingFetcher::new(StaticFetcher(b"x"));
    let request = Request::parse("https://example.com/data").unwrap();
    counting.fetch(&request).wait().unwrap();
    counting.fetch(&request).wait().unwrap();
    assert_eq!(counting.requests(), 2);
}
