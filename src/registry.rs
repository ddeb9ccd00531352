//! Dedup registry mapping filters to live engines.
//!
//! The single authority preventing two independent engines from existing
//! for equal filters, which would double-fetch and double-count pagination
//! offsets. Registries are constructor-injected, never module-level
//! globals: create one per session (or application) and clear it when the
//! session ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::cache::ResponseCache;
use crate::client::Transport;
use crate::engine::{EngineOptions, FetchEngine};
use crate::filter::CatalogFilter;

pub struct RequestRegistry<F: CatalogFilter> {
    transport: Arc<Transport>,
    cache: Arc<dyn ResponseCache>,
    options: EngineOptions,
    engines: Mutex<HashMap<F, Arc<FetchEngine<F>>>>,
}

impl<F: CatalogFilter> std::fmt::Debug for RequestRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRegistry")
            .field("kind", &F::KIND)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<F: CatalogFilter> RequestRegistry<F> {
    pub fn new(
        transport: Arc<Transport>,
        cache: Arc<dyn ResponseCache>,
        options: EngineOptions,
    ) -> Self {
        Self {
            transport,
            cache,
            options,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// The live engine for `filter`, constructing one if absent.
    ///
    /// Structural equality of the filter is the sole dedup key. The check
    /// and the insert happen under one lock, so concurrent callers can
    /// never double-construct. Returns whether the engine is newly
    /// created, so callers know when to kick off the initial fetch.
    pub fn get_or_create(&self, filter: F) -> (Arc<FetchEngine<F>>, bool) {
        let mut engines = self.lock_engines();
        if let Some(engine) = engines.get(&filter) {
            return (Arc::clone(engine), false);
        }
        debug!(?filter, kind = ?F::KIND, "creating engine");
        let engine = FetchEngine::new(
            filter.clone(),
            self.options,
            Arc::clone(&self.transport),
            Arc::clone(&self.cache),
        );
        engines.insert(filter, Arc::clone(&engine));
        (engine, true)
    }

    /// Build an engine without registering it and with the cache disabled.
    ///
    /// The opt-out mode for ephemeral per-keystroke search queries, which
    /// would otherwise grow the registry without bound.
    pub fn detached(&self, filter: F) -> Arc<FetchEngine<F>> {
        FetchEngine::new(
            filter,
            EngineOptions {
                use_cache: false,
                ..self.options
            },
            Arc::clone(&self.transport),
            Arc::clone(&self.cache),
        )
    }

    pub fn len(&self) -> usize {
        self.lock_engines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, filter: &F) -> bool {
        self.lock_engines().contains_key(filter)
    }

    /// Evict one engine, stopping any outstanding call first.
    pub fn remove(&self, filter: &F) -> bool {
        match self.lock_engines().remove(filter) {
            Some(engine) => {
                engine.stop();
                true
            }
            None => false,
        }
    }

    /// Evict everything; used when a session ends.
    pub fn clear(&self) {
        let mut engines = self.lock_engines();
        for engine in engines.values() {
            engine.stop();
        }
        engines.clear();
    }

    fn lock_engines(&self) -> std::sync::MutexGuard<'_, HashMap<F, Arc<FetchEngine<F>>>> {
        self.engines.lock().expect("registry state poisoned")
    }
}
