//! Shared request/cache engine for a Marvel-style comics catalog API.
//!
//! This crate provides the machinery every catalog screen depends on:
//! - Canonical query construction from typed filters
//! - Envelope decoding of the `{"data": {"total", "results"}}` wire format
//! - A response cache used as a speed-of-first-paint bridge on cold start
//! - A paginated fetch engine with offset/limit/total bookkeeping and
//!   incremental accumulation
//! - A request registry guaranteeing at most one live engine per filter
//! - A snapshot publisher that replays the latest value to late subscribers
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use marvel_catalog::{Catalog, CatalogConfig, ComicFilter, StaticSigner};
//!
//! let catalog = Catalog::new(
//!     CatalogConfig::default(),
//!     Arc::new(StaticSigner::new("ts=1&apikey=pk&hash=h")),
//! )?;
//!
//! let engine = catalog.fetch_comics(ComicFilter {
//!     character_id: Some(1009368),
//!     order_by: Some("-modified".to_string()),
//!     ..Default::default()
//! });
//! let mut sub = engine.subscribe();
//! while let Some(snapshot) = sub.next().await {
//!     // render snapshot.items; snapshot.has_more() drives the
//!     // load-more affordance
//! }
//! ```

mod auth;
mod cache;
mod catalog;
mod client;
mod config;
mod engine;
mod envelope;
mod error;
mod filter;
mod publisher;
mod query;
mod registry;
mod types;

pub use auth::{DigestFn, KeyedSigner, RequestSigner, StaticSigner};
pub use cache::{MemoryCache, ResponseCache};
pub use catalog::Catalog;
pub use client::Transport;
pub use config::{CatalogConfig, DEFAULT_GATEWAY_URL, DEFAULT_PAGE_SIZE};
pub use engine::{EngineOptions, FetchEngine, Snapshot};
pub use envelope::decode_page;
pub use error::{CacheError, CatalogError, DecodeError, TransportError};
pub use filter::{
    CatalogFilter,
    CharacterFilter,
    ComicFilter,
    CreatorFilter,
    EventFilter,
    SeriesFilter,
    StoryFilter,
};
pub use publisher::{Publisher, Subscription};
pub use query::{QueryBuilder, MAX_PAGE_SIZE};
pub use registry::RequestRegistry;
pub use types::{
    Character,
    Comic,
    Creator,
    EntityKind,
    Event,
    Identified,
    Image,
    Series,
    Story,
    SummaryRef,
    UrlRef,
};
