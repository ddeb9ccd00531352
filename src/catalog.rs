//! Consumer-facing catalog facade.
//!
//! Wires one transport and one response cache to a registry per entity
//! kind. Screens ask for an engine by filter: the first request for a
//! distinct filter constructs the engine (publishing any cached first
//! page immediately) and kicks off the initial fetch in the background;
//! every later request for an equal filter observes the same engine and
//! triggers no network traffic.

use std::sync::Arc;

use crate::auth::RequestSigner;
use crate::cache::{MemoryCache, ResponseCache};
use crate::client::Transport;
use crate::config::CatalogConfig;
use crate::engine::{EngineOptions, FetchEngine};
use crate::error::TransportError;
use crate::filter::{
    CatalogFilter,
    CharacterFilter,
    ComicFilter,
    CreatorFilter,
    EventFilter,
    SeriesFilter,
    StoryFilter,
};
use crate::registry::RequestRegistry;

/// One catalog session: shared transport, shared cache, one registry per
/// entity kind. Create it once at application start, or per search
/// session; [`Catalog::clear`] tears all registries down.
#[derive(Debug)]
pub struct Catalog {
    characters: RequestRegistry<CharacterFilter>,
    comics: RequestRegistry<ComicFilter>,
    creators: RequestRegistry<CreatorFilter>,
    events: RequestRegistry<EventFilter>,
    series: RequestRegistry<SeriesFilter>,
    stories: RequestRegistry<StoryFilter>,
}

impl Catalog {
    /// Catalog backed by a fresh in-memory response cache.
    pub fn new(config: CatalogConfig, signer: Arc<dyn RequestSigner>) -> Result<Self, TransportError> {
        Self::with_cache(config, signer, Arc::new(MemoryCache::new()))
    }

    /// Catalog backed by a caller-provided cache (e.g. one that survives
    /// restarts).
    pub fn with_cache(
        config: CatalogConfig,
        signer: Arc<dyn RequestSigner>,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(Transport::new(&config, signer)?);
        let options = EngineOptions {
            limit: config.page_size,
            use_cache: true,
        };
        macro_rules! registry {
            () => {
                RequestRegistry::new(Arc::clone(&transport), Arc::clone(&cache), options)
            };
        }
        Ok(Self {
            characters: registry!(),
            comics: registry!(),
            creators: registry!(),
            events: registry!(),
            series: registry!(),
            stories: registry!(),
        })
    }

    pub fn characters(&self) -> &RequestRegistry<CharacterFilter> {
        &self.characters
    }

    pub fn comics(&self) -> &RequestRegistry<ComicFilter> {
        &self.comics
    }

    pub fn creators(&self) -> &RequestRegistry<CreatorFilter> {
        &self.creators
    }

    pub fn events(&self) -> &RequestRegistry<EventFilter> {
        &self.events
    }

    pub fn series(&self) -> &RequestRegistry<SeriesFilter> {
        &self.series
    }

    pub fn stories(&self) -> &RequestRegistry<StoryFilter> {
        &self.stories
    }

    pub fn fetch_characters(&self, filter: CharacterFilter) -> Arc<FetchEngine<CharacterFilter>> {
        fetch_in(&self.characters, filter)
    }

    pub fn fetch_comics(&self, filter: ComicFilter) -> Arc<FetchEngine<ComicFilter>> {
        fetch_in(&self.comics, filter)
    }

    pub fn fetch_creators(&self, filter: CreatorFilter) -> Arc<FetchEngine<CreatorFilter>> {
        fetch_in(&self.creators, filter)
    }

    pub fn fetch_events(&self, filter: EventFilter) -> Arc<FetchEngine<EventFilter>> {
        fetch_in(&self.events, filter)
    }

    pub fn fetch_series(&self, filter: SeriesFilter) -> Arc<FetchEngine<SeriesFilter>> {
        fetch_in(&self.series, filter)
    }

    pub fn fetch_stories(&self, filter: StoryFilter) -> Arc<FetchEngine<StoryFilter>> {
        fetch_in(&self.stories, filter)
    }

    /// Ephemeral character search: the engine is neither registered nor
    /// cached, so per-keystroke queries cannot grow the registry.
    pub fn search_characters(&self, filter: CharacterFilter) -> Arc<FetchEngine<CharacterFilter>> {
        search_in(&self.characters, filter)
    }

    /// Ephemeral comic search; see [`Catalog::search_characters`].
    pub fn search_comics(&self, filter: ComicFilter) -> Arc<FetchEngine<ComicFilter>> {
        search_in(&self.comics, filter)
    }

    /// Evict every live engine across all entity kinds.
    pub fn clear(&self) {
        self.characters.clear();
        self.comics.clear();
        self.creators.clear();
        self.events.clear();
        self.series.clear();
        self.stories.clear();
    }
}

fn fetch_in<F: CatalogFilter>(
    registry: &RequestRegistry<F>,
    filter: F,
) -> Arc<FetchEngine<F>> {
    let (engine, created) = registry.get_or_create(filter);
    if created {
        engine.spawn_fetch();
    }
    engine
}

fn search_in<F: CatalogFilter>(
    registry: &RequestRegistry<F>,
    filter: F,
) -> Arc<FetchEngine<F>> {
    let engine = registry.detached(filter);
    engine.spawn_fetch();
    engine
}
