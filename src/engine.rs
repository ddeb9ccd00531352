//! Paginated fetch engine: offset/limit/total bookkeeping for one filter.
//!
//! One engine owns one logical query. It issues at most one network call at
//! a time, merges each decoded window into an accumulated item list, and
//! publishes snapshots through a replay-last-value channel. Failures of any
//! class (transport, decode, cache) degrade to "no progress this round";
//! prior state is never corrupted.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::cache::ResponseCache;
use crate::client::Transport;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::envelope::decode_page;
use crate::error::CatalogError;
use crate::filter::CatalogFilter;
use crate::publisher::{Publisher, Subscription};
use crate::query::QueryBuilder;
use crate::types::Identified;

/// Per-engine construction options.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Page window size, clamped to the gateway bounds at query time.
    pub limit: u32,
    /// Whether to bridge from / write to the response cache.
    pub use_cache: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            use_cache: true,
        }
    }
}

/// The value published to subscribers after every completed round.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Accumulated items in fetch order, deduplicated by identity.
    pub items: Vec<T>,
    /// Server-side count for the filter; `0` until the first successful
    /// round.
    pub total: u64,
    /// Whether at least one live round has completed. Lets consumers
    /// distinguish "still loading" from "collection is empty".
    pub primed: bool,
    /// Snapshot decoded from the response cache, awaiting live
    /// supersession.
    pub from_cache: bool,
}

impl<T> Snapshot<T> {
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            primed: false,
            from_cache: false,
        }
    }

    /// Conservatively false until `total` is known.
    pub fn has_more(&self) -> bool {
        (self.items.len() as u64) < self.total
    }

    pub fn is_exhausted(&self) -> bool {
        self.primed && !self.has_more()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
struct EngineState<T> {
    accumulated: Vec<T>,
    seen: HashSet<u64>,
    total: u64,
    /// Completed (non-cancelled) fetch rounds.
    rounds: u32,
}

impl<T> EngineState<T> {
    fn new() -> Self {
        Self {
            accumulated: Vec::new(),
            seen: HashSet::new(),
            total: 0,
            rounds: 0,
        }
    }

    /// Next page start. Always the count of items already merged, so pages
    /// are requested in non-decreasing offset order by construction.
    fn offset(&self) -> u64 {
        self.accumulated.len() as u64
    }

    fn exhausted(&self) -> bool {
        self.rounds > 0 && (self.accumulated.len() as u64) >= self.total
    }
}

/// Stateful owner of one filter's pagination/accumulation lifecycle.
pub struct FetchEngine<F: CatalogFilter> {
    filter: F,
    limit: u32,
    use_cache: bool,
    transport: Arc<Transport>,
    cache: Arc<dyn ResponseCache>,
    state: Mutex<EngineState<F::Item>>,
    in_flight: AtomicBool,
    cancel: Mutex<CancellationToken>,
    publisher: Publisher<Snapshot<F::Item>>,
}

impl<F: CatalogFilter> Debug for FetchEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("filter", &self.filter)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when a round ends, panic or not.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<F: CatalogFilter> FetchEngine<F> {
    pub(crate) fn new(
        filter: F,
        options: EngineOptions,
        transport: Arc<Transport>,
        cache: Arc<dyn ResponseCache>,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            filter,
            limit: options.limit,
            use_cache: options.use_cache,
            transport,
            cache,
            state: Mutex::new(EngineState::new()),
            in_flight: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            publisher: Publisher::new(Snapshot::empty()),
        });
        engine.bridge_from_cache();
        engine
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Snapshot<F::Item> {
        self.publisher.current()
    }

    pub fn subscribe(&self) -> Subscription<Snapshot<F::Item>> {
        self.publisher.subscribe()
    }

    pub fn total(&self) -> u64 {
        self.lock_state().total
    }

    pub fn len(&self) -> usize {
        self.lock_state().accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `accumulated.len() < total`; false before the first successful round.
    pub fn has_more(&self) -> bool {
        let state = self.lock_state();
        (state.accumulated.len() as u64) < state.total
    }

    /// Whether at least one live round has completed.
    pub fn primed(&self) -> bool {
        self.lock_state().rounds > 0
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// One fetch round at the current offset. Returns whether new items
    /// were merged. Ignored (returns false) while another round is in
    /// flight.
    pub async fn fetch(&self) -> bool {
        self.run_round(false).await
    }

    /// Fetch the next page window. No-op once the collection is exhausted.
    pub async fn load_more(&self) -> bool {
        if self.lock_state().exhausted() {
            trace!(kind = ?F::KIND, "collection exhausted; ignoring load-more");
            return false;
        }
        self.fetch().await
    }

    /// Run rounds until the collection is exhausted, then return the final
    /// snapshot. Stops early if a round makes no progress (failure, empty
    /// window, or a concurrent round holding the in-flight slot).
    pub async fn fetch_all(&self) -> Snapshot<F::Item> {
        loop {
            if self.primed() && !self.has_more() {
                break;
            }
            if !self.fetch().await {
                break;
            }
        }
        self.snapshot()
    }

    /// Forced refetch: clears accumulated state and starts over at offset
    /// zero. Ignored while a round is in flight.
    pub async fn refresh(&self) -> bool {
        self.run_round(true).await
    }

    /// Kick off one round in the background.
    pub fn spawn_fetch(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.fetch().await;
        });
    }

    /// Cancel any outstanding call without discarding accumulated state.
    /// Idempotent; safe to call while idle. A later fetch resumes at the
    /// current offset.
    pub fn stop(&self) {
        self.cancel.lock().expect("cancel slot poisoned").cancel();
    }

    #[instrument(skip_all, fields(kind = ?F::KIND, reset))]
    async fn run_round(&self, reset: bool) -> bool {
        // Redundant triggers while a round is in flight are ignored, never
        // queued; one outstanding call per engine at a time.
        if self.in_flight.swap(true, Ordering::AcqRel) {
            trace!("round already in flight; ignoring trigger");
            return false;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel slot poisoned") = token.clone();

        let offset = {
            let mut state = self.lock_state();
            if reset {
                state.accumulated.clear();
                state.seen.clear();
                state.total = 0;
                state.rounds = 0;
            }
            state.offset()
        };
        let query = self.page_query(offset);

        let response = tokio::select! {
            _ = token.cancelled() => {
                debug!(%query, "fetch cancelled");
                return false;
            }
            response = self.transport.get(&query) => response,
        };

        let outcome = response.map_err(CatalogError::from).and_then(|bytes| {
            let page = decode_page::<F::Item>(&bytes)?;
            Ok((bytes, page))
        });

        match outcome {
            Ok((bytes, (items, total))) if !items.is_empty() => {
                if self.use_cache {
                    if let Err(err) = self.cache.write(&self.cache_key(offset), &bytes) {
                        debug!(%err, "cache write failed; continuing without");
                    }
                }
                let (snapshot, merged) = {
                    let mut state = self.lock_state();
                    let merged = merge(&mut state, items);
                    state.total = total;
                    state.rounds += 1;
                    (snapshot_of(&state), merged)
                };
                debug!(merged, total, len = snapshot.len(), "page merged");
                self.publisher.publish(snapshot);
                merged > 0
            }
            Ok(_) => {
                // Valid envelope, empty window: no progress this round and
                // total stays untouched.
                debug!(%query, "empty page window");
                self.finish_without_progress();
                false
            }
            Err(err) => {
                debug!(%err, "fetch round failed; keeping prior state");
                self.finish_without_progress();
                false
            }
        }
    }

    /// Complete a round that produced nothing: republish whatever we
    /// already had so subscribers observe the round, leave items and total
    /// untouched.
    fn finish_without_progress(&self) {
        let snapshot = {
            let mut state = self.lock_state();
            state.rounds += 1;
            snapshot_of(&state)
        };
        self.publisher.publish(snapshot);
    }

    /// Publish a cached first page, if any, before the first live round.
    ///
    /// The decoded items go straight to the publisher and never into the
    /// accumulated state: the first live round always starts at offset
    /// zero and supersedes this bridge.
    fn bridge_from_cache(&self) {
        if !self.use_cache {
            return;
        }
        let key = self.cache_key(0);
        let bytes = match self.cache.read(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(err) => {
                debug!(%err, "cache read failed; skipping bridge");
                return;
            }
        };
        match decode_page::<F::Item>(&bytes) {
            Ok((items, total)) if !items.is_empty() => {
                debug!(n = items.len(), total, "bridging cached first page");
                self.publisher.publish(Snapshot {
                    items,
                    total,
                    primed: false,
                    from_cache: true,
                });
            }
            Ok(_) => {}
            Err(err) => debug!(%err, "ignoring undecodable cache entry"),
        }
    }

    fn page_query(&self, offset: u64) -> String {
        let mut query = QueryBuilder::new(&self.filter.path());
        self.filter.append_params(&mut query);
        query.limit(self.limit);
        query.offset(offset);
        query.finish()
    }

    /// Engine-qualified cache key; the page window is part of it.
    pub(crate) fn cache_key(&self, offset: u64) -> String {
        format!("{:?}.{}", F::KIND, self.page_query(offset))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState<F::Item>> {
        self.state.lock().expect("engine state poisoned")
    }
}

/// Append new items in fetch order, skipping identities already merged.
/// Duplicates across page windows are possible on the wire.
fn merge<T: Identified>(state: &mut EngineState<T>, items: Vec<T>) -> usize {
    let mut merged = 0;
    for item in items {
        if state.seen.insert(item.id()) {
            state.accumulated.push(item);
            merged += 1;
        }
    }
    merged
}

fn snapshot_of<T: Clone>(state: &EngineState<T>) -> Snapshot<T> {
    Snapshot {
        items: state.accumulated.clone(),
        total: state.total,
        primed: state.rounds > 0,
        from_cache: false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::StaticSigner;
    use crate::cache::MemoryCache;
    use crate::config::CatalogConfig;
    use crate::filter::CharacterFilter;

    fn character(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("Character {id}"),
            "description": "",
            "modified": "2016-09-28T12:08:19-0400",
            "urls": [],
            "thumbnail": {"path": "http://i.annihil.us/x", "extension": "jpg"}
        })
    }

    /// Matches the first-page request, which never carries an offset.
    fn without_offset(req: &HttpMockRequest) -> bool {
        req.query_params
            .as_ref()
            .map_or(true, |params| {
                params.iter().all(|(name, _)| name.as_str() != "offset")
            })
    }

    fn page(ids: std::ops::Range<u64>, total: u64) -> serde_json::Value {
        json!({"data": {
            "total": total,
            "results": ids.map(character).collect::<Vec<_>>()
        }})
    }

    fn transport_for(server: &MockServer) -> Arc<Transport> {
        let config = CatalogConfig {
            gateway_url: server.base_url(),
            ..Default::default()
        };
        Arc::new(Transport::new(&config, Arc::new(StaticSigner::new("ts=1&apikey=pk&hash=h"))).unwrap())
    }

    fn engine_for(
        server: &MockServer,
        cache: Arc<dyn ResponseCache>,
        use_cache: bool,
    ) -> Arc<FetchEngine<CharacterFilter>> {
        FetchEngine::new(
            CharacterFilter::default(),
            EngineOptions {
                limit: 10,
                use_cache,
            },
            transport_for(server),
            cache,
        )
    }

    #[tokio::test]
    async fn accumulates_pages_until_exhausted() {
        let server = MockServer::start_async().await;
        let first_page = server.mock(|when, then| {
            when.path("/characters")
                .query_param("limit", "10")
                .matches(without_offset);
            then.status(200).json_body(page(0..10, 25));
        });
        let second_page = server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            then.status(200).json_body(page(10..20, 25));
        });
        let third_page = server.mock(|when, then| {
            when.path("/characters").query_param("offset", "20");
            then.status(200).json_body(page(20..25, 25));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);

        assert!(engine.fetch().await);
        assert_eq!(engine.len(), 10);
        assert_eq!(engine.total(), 25);
        assert!(engine.has_more());
        first_page.assert_async().await;

        assert!(engine.load_more().await);
        assert_eq!(engine.len(), 20);
        second_page.assert_async().await;

        assert!(engine.load_more().await);
        assert_eq!(engine.len(), 25);
        assert!(!engine.has_more());
        third_page.assert_async().await;

        // Exhausted: a further load-more is a no-op without network I/O.
        assert!(!engine.load_more().await);
        assert_eq!(third_page.hits_async().await, 1);
    }

    #[tokio::test]
    async fn fetch_all_drains_every_window() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/characters").matches(without_offset);
            then.status(200).json_body(page(0..10, 23));
        });
        server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            then.status(200).json_body(page(10..20, 23));
        });
        server.mock(|when, then| {
            when.path("/characters").query_param("offset", "20");
            then.status(200).json_body(page(20..23, 23));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        let snapshot = engine.fetch_all().await;

        assert_eq!(snapshot.len(), 23);
        assert_eq!(snapshot.total, 23);
        assert!(snapshot.is_exhausted());
    }

    #[tokio::test]
    async fn duplicate_items_across_windows_are_merged_once() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/characters").matches(without_offset);
            then.status(200).json_body(page(0..10, 18));
        });
        server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            // Overlaps ids 8 and 9 from the first window.
            then.status(200).json_body(page(8..18, 18));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        engine.fetch().await;
        engine.load_more().await;

        assert_eq!(engine.len(), 18);
        let ids: Vec<u64> = engine.snapshot().items.iter().map(|c| c.id).collect();
        assert_eq!(ids, (0..18).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_round_keeps_prior_state() {
        let server = MockServer::start_async().await;
        let first_page = server.mock(|when, then| {
            when.path("/characters").matches(without_offset);
            then.status(200).json_body(page(0..10, 42));
        });
        let failing = server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            then.status(500).body("upstream exploded");
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        engine.fetch().await;
        assert!(!engine.load_more().await);

        first_page.assert_async().await;
        failing.assert_async().await;
        assert_eq!(engine.len(), 10);
        assert_eq!(engine.total(), 42);
        assert!(engine.has_more());

        let snapshot = engine.snapshot();
        assert!(snapshot.primed);
        assert_eq!(snapshot.len(), 10);
    }

    #[tokio::test]
    async fn malformed_body_is_no_progress() {
        let server = MockServer::start_async().await;
        server.mock(|_, then| {
            then.status(200).body("<html>rate limited</html>");
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        assert!(!engine.fetch().await);
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.total(), 0);
        // Completed round: "empty" is distinguishable from "still loading".
        assert!(engine.primed());
        assert!(!engine.has_more());
    }

    #[tokio::test]
    async fn refresh_restarts_from_offset_zero() {
        let server = MockServer::start_async().await;
        let first_window = server.mock(|when, then| {
            when.path("/characters").matches(without_offset);
            then.status(200).json_body(page(0..10, 12));
        });
        server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            then.status(200).json_body(page(10..12, 12));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        engine.fetch().await;
        engine.load_more().await;
        assert_eq!(engine.len(), 12);

        assert!(engine.refresh().await);
        assert_eq!(engine.len(), 10);
        assert!(engine.has_more());
        assert_eq!(first_window.hits_async().await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_cancels_without_corrupting_state() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/characters").matches(without_offset);
            then.status(200).json_body(page(0..10, 20));
        });
        let slow = server.mock(|when, then| {
            when.path("/characters").query_param("offset", "10");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(page(10..20, 20));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        engine.fetch().await;
        assert_eq!(engine.len(), 10);

        engine.spawn_fetch();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(engine.is_fetching());
        engine.stop();
        // Idempotent.
        engine.stop();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!engine.is_fetching());
        assert_eq!(engine.len(), 10);
        assert_eq!(engine.total(), 20);
        assert_eq!(slow.hits_async().await, 1);
    }

    #[tokio::test]
    async fn cache_bridge_publishes_before_any_network_round() {
        let server = MockServer::start_async().await;
        let live = server.mock(|when, then| {
            when.path("/characters");
            then.status(200).json_body(page(0..10, 40));
        });

        // Seed the cache with a stale first page for the same window.
        let cache = Arc::new(MemoryCache::new());
        cache
            .write(
                "Characters.characters?limit=10",
                page(0..3, 3).to_string().as_bytes(),
            )
            .unwrap();

        let engine = engine_for(&server, cache, true);
        let bridged = engine.snapshot();
        assert!(bridged.from_cache);
        assert!(!bridged.primed);
        assert_eq!(bridged.len(), 3);
        assert_eq!(bridged.total, 3);
        assert_eq!(live.hits_async().await, 0);

        // The live round supersedes the bridge entirely.
        engine.fetch().await;
        let snapshot = engine.snapshot();
        assert!(!snapshot.from_cache);
        assert!(snapshot.primed);
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot.total, 40);
    }

    #[tokio::test]
    async fn successful_rounds_write_back_to_the_cache() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/characters");
            then.status(200).json_body(page(0..10, 40));
        });

        let cache = Arc::new(MemoryCache::new());
        let engine = engine_for(&server, cache.clone(), true);
        engine.fetch().await;

        // The key is engine-qualified and includes the page window.
        let cached = cache.read("Characters.characters?limit=10").unwrap();
        assert!(cached.is_some());
        assert_eq!(engine.cache_key(0), "Characters.characters?limit=10");
    }

    #[tokio::test]
    async fn late_subscriber_replays_accumulated_snapshot() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/characters");
            then.status(200).json_body(page(0..10, 10));
        });

        let engine = engine_for(&server, Arc::new(MemoryCache::new()), false);
        engine.fetch().await;

        let mut sub = engine.subscribe();
        assert_eq!(sub.current().len(), 10);
        let first = sub.next().await.unwrap();
        assert_eq!(first.len(), 10);
        assert!(first.is_exhausted());
    }

    #[tokio::test]
    async fn snapshot_has_more_is_conservative_before_first_round() {
        let snapshot: Snapshot<crate::types::Character> = Snapshot::empty();
        assert!(!snapshot.has_more());
        assert!(!snapshot.primed);
        assert!(!snapshot.is_exhausted());
    }
}
