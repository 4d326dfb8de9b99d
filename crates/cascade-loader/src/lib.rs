//! Cascade Loader
//!
//! Resource loading policies composed from independent tiers:
//! - `Resource`: a request paired with the decoder for its payload
//! - `ResourceLoader`: a `load`/`set` pair; loaders form a monoid under
//!   `combine`, with a cache-miss in one tier falling through to the next and
//!   the value written back on the way out
//! - memory, disk and network tiers, and the `Fetcher` seam the network tier
//!   pulls bytes through

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod combinable;
pub mod config;
pub mod disk;
pub mod fetch;
pub mod loader;
pub mod memory;
pub mod resource;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use combinable::Combinable;
pub use config::LoaderConfig;
pub use disk::DiskCache;
pub use fetch::{Fetcher, HttpFetcher};
pub use loader::{standard_chain, ResourceLoader};
pub use memory::MemoryCache;
pub use resource::{Decoder, Request, Resource};

pub use cascade_core::{CascadeError, Result};
