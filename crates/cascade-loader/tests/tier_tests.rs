//! Integration tests for the concrete memory, disk and network tiers

use cascade_core::{Async, CascadeError, Executors};
use cascade_loader::{
    standard_chain, DiskCache, Fetcher, LoaderConfig, MemoryCache, Request, Resource,
    ResourceLoader,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

/// Fetcher serving a fixed body and counting how often it is asked
struct CountingFetcher {
    body: Vec<u8>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn new(body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, _request: &Request) -> Async<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Async::pure(self.body.clone())
    }
}

/// Fetcher that always fails at the transport level
struct UnreachableFetcher;

impl Fetcher for UnreachableFetcher {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>> {
        Async::fail(CascadeError::request_failed(
            request.url().as_str(),
            "connection refused",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u32,
    name: String,
}

fn profile_resource() -> Resource<Profile> {
    Resource::json(Request::parse("https://api.example.com/profiles/7").unwrap())
}

const PROFILE_JSON: &[u8] = br#"{"id":7,"name":"Ada"}"#;

fn ada() -> Profile {
    Profile {
        id: 7,
        name: "Ada".to_string(),
    }
}

// ----------------------------------------------------------------------------
// Promotion
// ----------------------------------------------------------------------------

#[test]
fn test_memory_in_front_of_network_fetches_once() {
    let executors = Executors::threads();
    let memory = MemoryCache::new(&executors).unwrap();
    let fetcher = CountingFetcher::new(PROFILE_JSON);
    let chain = memory
        .loader()
        .or(&ResourceLoader::network(fetcher.clone()));
    let resource = profile_resource();

    assert_eq!(chain.load(&resource).wait(), Ok(ada()));
    assert_eq!(fetcher.calls(), 1);

    // The value was promoted: the memory tier alone now serves it.
    assert_eq!(memory.loader().load(&resource).wait(), Ok(ada()));
    assert_eq!(chain.load(&resource).wait(), Ok(ada()));
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_decode_failure_is_not_cached() {
    let executors = Executors::inline();
    let memory = MemoryCache::new(&executors).unwrap();
    let fetcher = CountingFetcher::new(b"<html>not json</html>");
    let chain = memory
        .loader()
        .or(&ResourceLoader::network(fetcher.clone()));

    for _ in 0..2 {
        let outcome = chain.load(&profile_resource()).wait();
        assert!(matches!(outcome, Err(CascadeError::Decode { .. })));
    }
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(memory.len().wait(), Ok(0));
}

#[test]
fn test_transport_failure_is_forwarded() {
    let executors = Executors::inline();
    let chain = ResourceLoader::<Profile>::memory(&executors)
        .unwrap()
        .or(&ResourceLoader::network(Arc::new(UnreachableFetcher)));

    let err = chain.load(&profile_resource()).wait().unwrap_err();
    assert!(err.is_transport());
}

// ----------------------------------------------------------------------------
// Disk Tier
// ----------------------------------------------------------------------------

#[test]
fn test_disk_round_trip_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let executors = Executors::threads();
    let resource = profile_resource();

    let writer: ResourceLoader<Profile> = DiskCache::open(dir.path(), &executors).unwrap().loader();
    writer.set(&resource, ada()).wait().unwrap();

    let reader: ResourceLoader<Profile> = DiskCache::open(dir.path(), &executors).unwrap().loader();
    assert_eq!(reader.load(&resource).wait(), Ok(ada()));
}

#[test]
fn test_standard_chain_fills_disk_for_the_next_process() {
    let dir = tempfile::tempdir().unwrap();
    let executors = Executors::threads();
    let config = LoaderConfig::testing().with_cache_dir(dir.path());
    let resource = profile_resource();

    let fetcher = CountingFetcher::new(PROFILE_JSON);
    let first = standard_chain::<Profile>(&config, &executors, fetcher.clone()).unwrap();
    assert_eq!(first.load(&resource).wait(), Ok(ada()));
    assert_eq!(fetcher.calls(), 1);

    // A fresh chain has an empty memory tier but finds the value on disk.
    let offline = standard_chain::<Profile>(&config, &executors, Arc::new(UnreachableFetcher))
        .unwrap();
    assert_eq!(offline.load(&resource).wait(), Ok(ada()));
}

#[test]
fn test_standard_chain_rejects_invalid_config() {
    let config = LoaderConfig {
        user_agent: String::new(),
        ..LoaderConfig::testing()
    };
    let outcome = standard_chain::<Profile>(
        &config,
        &Executors::inline(),
        CountingFetcher::new(PROFILE_JSON),
    );
    assert!(matches!(outcome, Err(CascadeError::Configuration { .. })));
}
