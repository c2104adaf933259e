//! # Chunk Manager
//!
//! Keeps the chunks around a moving observer loaded, and everything else
//! released.
//!
//! ## Tick Policy
//!
//! A tick runs when the observer enters a new chunk, or when an earlier
//! tick left work behind (deferred candidates, failed loads):
//!
//! 1. Load candidates: coordinates within `render_radius` (Chebyshev) that
//!    are neither loaded nor in flight
//! 2. Unload candidates: loaded coordinates beyond `unload_radius`
//! 3. Unloads run first, to completion (harvest, persist, release)
//! 4. Load candidates are sorted by Manhattan distance to the observer
//! 5. At most `batch_size` loads start; the rest wait for the next tick
//!
//! ## Concurrency
//!
//! Single-threaded cooperative: the manager's futures are driven by one
//! task. Bookkeeping lives behind a `parking_lot::Mutex` that is never held
//! across an await, so membership checks and in-flight markers are updated
//! atomically between suspension points.
//!
//! ## Failure Policy
//!
//! Nothing here returns an error to the caller once constructed. Failed
//! loads are retried on a later tick, failed writes are kept in a
//! write-back cache until they succeed, failed meshes leave their entity
//! without a renderable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;

use meridian_core::{NodeId, Vec3};
use meridian_procedural::{AssemblageRegistry, ChunkCoord, ChunkGenerator, ChunkState, WorldSeed};

use crate::bridge::Bridges;
use crate::config::StreamingConfig;
use crate::error::StreamingResult;
use crate::harvest::harvest;
use crate::lifecycle::{ChunkPhase, InFlightTable, LifecycleToken};
use crate::loaded::LoadedChunk;
use crate::spawn::{spawn_chunk, SpawnContext};

/// Streaming counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Chunks currently in the loaded set.
    pub loaded_chunks: usize,
    /// Loads currently in flight.
    pub in_flight: usize,
    /// Chunks generated this session.
    pub generated: u64,
    /// Chunks restored from storage or the write-back cache.
    pub rehydrated: u64,
    /// Chunks unloaded this session.
    pub unloaded: u64,
    /// Loads abandoned after an error.
    pub load_failures: u64,
    /// Failed persistence writes.
    pub persist_failures: u64,
    /// Loads whose results were thrown away after cancellation.
    pub discarded_loads: u64,
    /// Mesh bindings that failed.
    pub failed_bindings: u64,
    /// Snapshots waiting in the write-back cache.
    pub pending_writes: usize,
}

#[derive(Debug)]
struct ManagerState {
    environment: String,
    current: Option<ChunkCoord>,
    loaded: HashMap<ChunkCoord, LoadedChunk>,
    unloading: HashSet<ChunkCoord>,
    pending: bool,
    root: Option<NodeId>,
    write_back: HashMap<String, ChunkState>,
    stats: StreamingStats,
}

/// Streams chunks in and out around an observer.
#[derive(Debug)]
pub struct ChunkManager {
    config: StreamingConfig,
    bridges: Bridges,
    generator: ChunkGenerator,
    token: LifecycleToken,
    in_flight: InFlightTable,
    state: Mutex<ManagerState>,
}

impl ChunkManager {
    /// Creates a manager and its root scene node.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(
        config: StreamingConfig,
        seed: WorldSeed,
        registry: Arc<AssemblageRegistry>,
        bridges: Bridges,
        environment: impl Into<String>,
    ) -> StreamingResult<Self> {
        config.validate()?;
        let generator = ChunkGenerator::new(seed, registry).with_grid_cells(config.grid_cells);
        let root = bridges.scene.create_node("chunk_manager", None);
        let environment = environment.into();

        tracing::info!(
            environment = %environment,
            render_radius = config.render_radius,
            unload_radius = config.unload_radius,
            batch_size = config.batch_size,
            "chunk manager created"
        );

        Ok(Self {
            config,
            bridges,
            generator,
            token: LifecycleToken::new(),
            in_flight: InFlightTable::new(),
            state: Mutex::new(ManagerState {
                environment,
                current: None,
                loaded: HashMap::new(),
                unloading: HashSet::new(),
                pending: false,
                root: Some(root),
                write_back: HashMap::new(),
                stats: StreamingStats::default(),
            }),
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Active environment identifier.
    #[must_use]
    pub fn environment(&self) -> String {
        self.state.lock().environment.clone()
    }

    /// Observer chunk as of the last update.
    #[must_use]
    pub fn current_chunk(&self) -> Option<ChunkCoord> {
        self.state.lock().current
    }

    /// Returns true once `dispose` has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_disposed()
    }

    /// Lifecycle phase of a coordinate.
    #[must_use]
    pub fn phase(&self, coord: ChunkCoord) -> ChunkPhase {
        if self.token.is_disposed() {
            return ChunkPhase::Unloaded;
        }
        {
            let state = self.state.lock();
            if state.unloading.contains(&coord) {
                return ChunkPhase::Unloading;
            }
            if state.loaded.contains_key(&coord) {
                return ChunkPhase::Active;
            }
        }
        self.in_flight.phase(coord).unwrap_or(ChunkPhase::Unloaded)
    }

    /// Returns true if `coord` is in the loaded set.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.state.lock().loaded.contains_key(&coord)
    }

    /// Loaded coordinates, sorted.
    #[must_use]
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.state.lock().loaded.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn loaded_chunk_count(&self) -> usize {
        self.state.lock().loaded.len()
    }

    /// Returns true if a later `update` will run a tick without movement.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.state.lock().pending
    }

    /// Runs `f` against a loaded chunk.
    pub fn inspect<R>(&self, coord: ChunkCoord, f: impl FnOnce(&LoadedChunk) -> R) -> Option<R> {
        self.state.lock().loaded.get(&coord).map(f)
    }

    /// Snapshot counters.
    #[must_use]
    pub fn stats(&self) -> StreamingStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.loaded_chunks = state.loaded.len();
        stats.pending_writes = state.write_back.len();
        stats.in_flight = self.in_flight.len();
        stats
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Observer position refresh. Runs a tick on chunk-boundary crossings
    /// and while deferred work remains.
    pub async fn update(&self, position: Vec3) {
        if self.token.is_disposed() {
            return;
        }
        let coord = ChunkCoord::from_world_pos(position.x, position.z, self.config.chunk_size);
        let run = {
            let mut state = self.state.lock();
            let crossed = state.current != Some(coord);
            state.current = Some(coord);
            crossed || state.pending
        };
        if run {
            self.tick(coord).await;
        }
    }

    async fn tick(&self, center: ChunkCoord) {
        let epoch = self.token.epoch();
        let render = self.config.render_radius;
        let unload = self.config.unload_radius;

        let (unloads, mut loads) = {
            let state = self.state.lock();
            let mut unloads: Vec<ChunkCoord> = state
                .loaded
                .keys()
                .copied()
                .filter(|c| c.chebyshev_distance(center) > unload && !state.unloading.contains(c))
                .collect();
            unloads.sort_unstable();
            let loads: Vec<ChunkCoord> = center
                .neighborhood(render)
                .filter(|c| !state.loaded.contains_key(c) && !self.in_flight.contains(*c))
                .collect();
            (unloads, loads)
        };

        for coord in unloads {
            self.unload_chunk(coord).await;
        }

        loads.sort_by_key(|c| (c.manhattan_distance(center), c.z, c.x));
        let deferred = loads.len() > self.config.batch_size;
        loads.truncate(self.config.batch_size);

        tracing::trace!(
            x = center.x,
            z = center.z,
            loads = loads.len(),
            deferred,
            "streaming tick"
        );

        let results = join_all(loads.into_iter().map(|coord| self.load_chunk(coord, epoch))).await;
        let failed = results.iter().any(|loaded| !loaded);
        self.state.lock().pending = deferred || failed;
    }

    // ========================================================================
    // LOAD
    // ========================================================================

    /// Loads one coordinate unless it is already loaded or in flight.
    ///
    /// Concurrent requests for the same coordinate collapse into one load.
    pub async fn request_load(&self, coord: ChunkCoord) {
        if self.token.is_disposed() {
            return;
        }
        self.load_chunk(coord, self.token.epoch()).await;
    }

    /// Returns false only when the load failed and should be retried.
    async fn load_chunk(&self, coord: ChunkCoord, epoch: u64) -> bool {
        if self.is_loaded(coord) {
            return true;
        }
        let Some(guard) = self.in_flight.try_begin(coord, epoch) else {
            return true;
        };

        let environment = self.environment();
        let state = match self.fetch_or_generate(coord, &environment, epoch).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                self.discard(coord);
                return true;
            }
            Err(error) => {
                tracing::warn!(x = coord.x, z = coord.z, environment = %environment, %error, "chunk load failed");
                self.state.lock().stats.load_failures += 1;
                return false;
            }
        };

        if !self.token.is_current(epoch) {
            self.discard(coord);
            return true;
        }
        let Some(root) = self.state.lock().root else {
            return true;
        };

        guard.set_phase(ChunkPhase::Spawning);
        let ctx = SpawnContext {
            bridges: &self.bridges,
            registry: self.generator.registry(),
            config: &self.config,
        };
        let mut chunk = spawn_chunk(ctx, state, root).await;

        if !self.token.is_current(epoch) {
            chunk.dispose(&self.bridges);
            self.discard(coord);
            return true;
        }

        let mut state = self.state.lock();
        if state.loaded.contains_key(&coord) {
            drop(state);
            chunk.dispose(&self.bridges);
            return true;
        }
        let failed = chunk.failed_bindings();
        tracing::debug!(
            x = coord.x,
            z = coord.z,
            entities = chunk.entities.len(),
            bindings = chunk.bindings.len(),
            failed_bindings = failed,
            "chunk loaded"
        );
        state.stats.failed_bindings += failed as u64;
        state.loaded.insert(coord, chunk);
        true
    }

    fn discard(&self, coord: ChunkCoord) {
        tracing::debug!(x = coord.x, z = coord.z, "load superseded, results discarded");
        self.state.lock().stats.discarded_loads += 1;
    }

    /// Stored, cached or freshly generated state for `coord`.
    ///
    /// Returns `None` once `epoch` is stale. Nothing is counted or written
    /// after that point.
    async fn fetch_or_generate(
        &self,
        coord: ChunkCoord,
        environment: &str,
        epoch: u64,
    ) -> StreamingResult<Option<ChunkState>> {
        let key = ChunkState::storage_key_for(environment, coord);
        let now = meridian_procedural::now_millis();

        if !self.token.is_current(epoch) {
            return Ok(None);
        }
        let cached = self.state.lock().write_back.get(&key).cloned();
        if let Some(mut state) = cached {
            state.touch(now);
            self.state.lock().stats.rehydrated += 1;
            return Ok(Some(state));
        }

        let read = self.bridges.persistence.get(&key).await;
        if !self.token.is_current(epoch) {
            return Ok(None);
        }
        let read_ok = match read {
            Ok(Some(text)) => {
                let mut state = ChunkState::from_json(&text)?;
                state.touch(now);
                self.state.lock().stats.rehydrated += 1;
                return Ok(Some(state));
            }
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(key = %key, %error, "persistence read failed, treating as miss");
                false
            }
        };

        let state = self.generator.generate_at(coord, environment, now);
        self.state.lock().stats.generated += 1;
        // A failed read may be hiding a stored snapshot; leave it untouched.
        if read_ok {
            self.persist(state.clone()).await;
        }
        Ok(Some(state))
    }

    // ========================================================================
    // UNLOAD / PERSIST
    // ========================================================================

    /// Harvests, persists and releases one loaded chunk.
    pub async fn request_unload(&self, coord: ChunkCoord) {
        self.unload_chunk(coord).await;
    }

    async fn unload_chunk(&self, coord: ChunkCoord) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.unloading.contains(&coord) {
                return;
            }
            let Some(chunk) = state.loaded.get_mut(&coord) else {
                return;
            };
            harvest(chunk, self.bridges.entities.as_ref());
            let snapshot = chunk.state.clone();
            state.unloading.insert(coord);
            snapshot
        };

        self.persist(snapshot).await;

        let mut state = self.state.lock();
        state.unloading.remove(&coord);
        if let Some(chunk) = state.loaded.get_mut(&coord) {
            chunk.dispose(&self.bridges);
            state.loaded.remove(&coord);
            state.stats.unloaded += 1;
            tracing::debug!(x = coord.x, z = coord.z, "chunk unloaded");
        }
    }

    /// Writes a snapshot; on failure keeps it in the write-back cache.
    async fn persist(&self, snapshot: ChunkState) -> bool {
        let key = snapshot.storage_key();
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(key = %key, %error, "chunk state encode failed");
                return false;
            }
        };

        match self.bridges.persistence.set(&key, json).await {
            Ok(()) => {
                self.state.lock().write_back.remove(&key);
                true
            }
            Err(error) => {
                tracing::warn!(key = %key, %error, "persistence write failed, kept for retry");
                let mut state = self.state.lock();
                state.stats.persist_failures += 1;
                state.write_back.insert(key, snapshot);
                false
            }
        }
    }

    /// Harvests and persists every active chunk, then retries the
    /// write-back cache. Returns the number of snapshots written.
    pub async fn flush(&self) -> usize {
        if self.token.is_disposed() {
            return 0;
        }
        let snapshots: Vec<ChunkState> = {
            let mut state = self.state.lock();
            let ManagerState {
                loaded,
                unloading,
                write_back,
                ..
            } = &mut *state;
            let mut pending: HashMap<String, ChunkState> = write_back.drain().collect();
            for (coord, chunk) in loaded.iter_mut() {
                if unloading.contains(coord) {
                    continue;
                }
                harvest(chunk, self.bridges.entities.as_ref());
                pending.insert(chunk.state.storage_key(), chunk.state.clone());
            }
            pending.into_values().collect()
        };

        let written = join_all(snapshots.into_iter().map(|s| self.persist(s)))
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        tracing::debug!(written, "chunk states flushed");
        written
    }

    // ========================================================================
    // RELOAD / ENVIRONMENT / DISPOSE
    // ========================================================================

    /// Unloads every chunk, then reloads around the observer.
    ///
    /// Loads started before the call are discarded when they resume.
    pub async fn force_full_reload(&self) {
        if self.token.is_disposed() {
            return;
        }
        self.token.advance();
        self.in_flight.clear();

        let coords = self.loaded_coords();
        tracing::info!(chunks = coords.len(), "full chunk reload");
        for coord in coords {
            self.unload_chunk(coord).await;
        }

        let center = self.current_chunk().unwrap_or_default();
        self.tick(center).await;
    }

    /// Switches environment: warms its assets, then reloads everything.
    pub async fn set_environment(&self, environment: &str) {
        if self.token.is_disposed() {
            return;
        }
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.environment, environment.to_owned())
        };
        tracing::info!(from = %previous, to = %environment, "environment switch");

        self.warm_assets(environment).await;
        self.force_full_reload().await;
    }

    /// Loads every asset the environment's assemblages reference.
    async fn warm_assets(&self, environment: &str) {
        let registry = self.generator.registry();
        let mut paths: Vec<&str> = registry
            .for_environment(environment)
            .into_iter()
            .flat_map(|def| def.asset_paths())
            .filter(|path| !self.bridges.assets.is_path_cached(path))
            .collect();
        paths.sort_unstable();
        paths.dedup();

        let results = join_all(paths.iter().map(|path| self.bridges.assets.load_asset_by_path(path))).await;
        for (path, result) in paths.iter().zip(results) {
            if let Err(error) = result {
                tracing::warn!(path = %path, %error, "asset warm-up failed");
            }
        }
    }

    /// Releases every loaded chunk and the manager root. Idempotent.
    ///
    /// Nothing is persisted; call `flush` first to keep unsaved facts.
    pub fn dispose(&self) {
        if !self.token.dispose() {
            return;
        }
        self.in_flight.clear();

        let mut state = self.state.lock();
        let chunks = state.loaded.len();
        for (_, mut chunk) in state.loaded.drain() {
            chunk.dispose(&self.bridges);
        }
        state.unloading.clear();
        state.pending = false;
        if let Some(root) = state.root.take() {
            self.bridges.scene.dispose_node(root);
        }
        tracing::info!(chunks, "chunk manager disposed");
    }
}

impl Drop for ChunkManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
