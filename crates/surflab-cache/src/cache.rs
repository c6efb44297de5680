//! The resolution cache — focus-driven block residency.
//!
//! Each tick the viewer reports a focus point; the cache computes, per
//! block, the resolution level that should be resident, schedules a
//! bounded amount of promotion/demotion work on the background loader,
//! and evicts least-recently-focused residents when over the memory
//! ceiling. Finished loads are applied only at `commit_loaded()`, the
//! synchronization point between frames — the renderer never observes a
//! partially loaded level.

use std::collections::HashMap;
use std::sync::Arc;

use surflab_store::{LevelMeta, SceneStore};
use surflab_types::{BlockId, Surfel};

use crate::loader::BlockLoader;
use crate::CacheError;

/// Default memory ceiling for dynamic mode: 512 MiB.
pub const DEFAULT_MEMORY_CEILING: u64 = 512 << 20;

/// Default number of loads scheduled per tick.
pub const DEFAULT_LOADS_PER_TICK: usize = 8;

const INITIAL_RETRY_DELAY_TICKS: u64 = 2;
const MAX_RETRY_DELAY_TICKS: u64 = 256;

/// Residency policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum CacheMode {
    /// Everything loaded eagerly at startup, nothing evicted. Trades
    /// startup latency for glitch-free navigation.
    #[strum(serialize = "static")]
    Static,
    /// Bounded working set converging toward the focus target.
    #[strum(serialize = "dynamic")]
    Dynamic,
}

/// One resident level of one block.
struct Residency {
    level: usize,
    surfels: Arc<[Surfel]>,
    bytes: u64,
}

/// Exponential backoff state for a block whose load failed.
struct Retry {
    next_tick: u64,
    delay: u64,
}

#[derive(Default)]
struct Entry {
    resident: Option<Residency>,
    /// Level requested from the loader, not yet committed.
    pending: Option<usize>,
    /// Last tick this block was inside the focus radius. LRU key.
    last_focus_tick: u64,
    in_radius: bool,
    retry: Option<Retry>,
}

impl Entry {
    fn resident_level(&self) -> Option<usize> {
        self.resident.as_ref().map(|r| r.level)
    }
}

/// Pick the level whose spacing satisfies the target resolution at the
/// given distance: the coarsest level fine enough, or the finest if none
/// is. `target_resolution = INFINITY` forces the finest level.
fn desired_level(
    levels: &[LevelMeta],
    finest: usize,
    in_radius: bool,
    distance: f32,
    target_resolution: f32,
) -> usize {
    if !in_radius {
        return 0;
    }
    if target_resolution.is_infinite() {
        return finest;
    }
    let want = distance.max(1.0) / target_resolution;
    levels
        .iter()
        .position(|l| l.spacing <= want)
        .unwrap_or(finest)
}

/// In-memory working set of blocks at per-block resolution levels.
pub struct ResolutionCache {
    store: Arc<SceneStore>,
    loader: BlockLoader,
    entries: HashMap<BlockId, Entry>,
    mode: CacheMode,
    memory_ceiling: u64,
    resident_bytes: u64,
    focus_radius: f32,
    target_resolution: f32,
    loads_per_tick: usize,
    tick: u64,
    /// Bumped on close/reset; completions from older generations are
    /// discarded at commit.
    generation: u64,
    closed: bool,
}

impl ResolutionCache {
    /// Create a cache over the given store.
    pub fn new(store: Arc<SceneStore>, mode: CacheMode) -> Result<Self, CacheError> {
        let loader = BlockLoader::new(Arc::clone(&store))?;
        Ok(Self {
            store,
            loader,
            entries: HashMap::new(),
            mode,
            memory_ceiling: DEFAULT_MEMORY_CEILING,
            resident_bytes: 0,
            focus_radius: f32::INFINITY,
            target_resolution: 0.0,
            loads_per_tick: DEFAULT_LOADS_PER_TICK,
            tick: 0,
            generation: 0,
            closed: false,
        })
    }

    /// Current residency policy.
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Set the focus radius. `INFINITY` disables radius-based demotion —
    /// every block is eligible for promotion.
    pub fn set_focus_radius(&mut self, radius: f32) {
        self.focus_radius = radius;
    }

    /// Set the target resolution. `INFINITY` promotes in-radius blocks to
    /// their finest available level.
    pub fn set_target_resolution(&mut self, target: f32) {
        self.target_resolution = target;
    }

    /// Set the dynamic-mode memory ceiling in bytes.
    pub fn set_memory_ceiling(&mut self, bytes: u64) {
        self.memory_ceiling = bytes;
    }

    /// Cap the number of loads scheduled per tick.
    pub fn set_loads_per_tick(&mut self, loads: usize) {
        self.loads_per_tick = loads.max(1);
    }

    /// Bytes of surfel data currently resident.
    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    /// The level currently resident for a block, if any.
    pub fn resident_level(&self, id: BlockId) -> Option<usize> {
        self.entries.get(&id).and_then(|e| e.resident_level())
    }

    /// Shared view of a block's resident surfels.
    pub fn resident_points(&self, id: BlockId) -> Option<Arc<[Surfel]>> {
        self.entries
            .get(&id)
            .and_then(|e| e.resident.as_ref())
            .map(|r| Arc::clone(&r.surfels))
    }

    /// Whether a block is in backoff after a failed load.
    pub fn is_degraded(&self, id: BlockId) -> bool {
        self.entries
            .get(&id)
            .map(|e| e.retry.is_some())
            .unwrap_or(false)
    }

    /// The resident working set as (block, level) pairs.
    pub fn working_set(&self) -> Vec<(BlockId, usize)> {
        let mut set: Vec<(BlockId, usize)> = self
            .entries
            .iter()
            .filter_map(|(&id, e)| e.resident_level().map(|l| (id, l)))
            .collect();
        set.sort();
        set
    }

    /// Loads requested but not yet committed.
    pub fn pending_loads(&self) -> usize {
        self.entries.values().filter(|e| e.pending.is_some()).count()
    }

    /// Eagerly load every block at its coarsest level, in spatial order,
    /// until `budget` bytes are resident (`f64::INFINITY` = everything).
    ///
    /// This is the static-mode startup path; loads run synchronously on
    /// the calling thread. Returns the number of blocks loaded.
    pub fn read_coarsest_blocks(&mut self, budget: f64) -> Result<usize, CacheError> {
        if self.closed {
            return Err(CacheError::Closed);
        }
        let ids = self.store.block_ids().to_vec();
        let mut loaded = 0;
        for id in ids {
            if (self.resident_bytes as f64) >= budget {
                break;
            }
            if self
                .entries
                .get(&id)
                .map(|e| e.resident.is_some())
                .unwrap_or(false)
            {
                continue;
            }
            let surfels: Arc<[Surfel]> = Arc::from(self.store.load_level(id, 0)?);
            let bytes = surfels.len() as u64 * Surfel::MEM_SIZE;
            let entry = self.entries.entry(id).or_default();
            entry.resident = Some(Residency {
                level: 0,
                surfels,
                bytes,
            });
            self.resident_bytes += bytes;
            loaded += 1;
        }
        tracing::info!(
            loaded,
            resident_bytes = self.resident_bytes,
            "eager coarsest-level load complete"
        );
        Ok(loaded)
    }

    /// One update tick: recompute desired levels for the given focus
    /// point and schedule up to `loads_per_tick` promotions/demotions.
    /// Work beyond the budget is deferred to later ticks.
    pub fn update_focus(&mut self, focus: [f32; 3]) {
        if self.closed {
            return;
        }
        self.tick += 1;
        let mut scheduled = 0usize;

        // Plan first (immutable pass over store metadata), then apply, so
        // the per-tick budget is spent on the closest blocks first.
        let mut plan: Vec<(BlockId, bool, usize)> = Vec::new();
        for &id in self.store.block_ids() {
            let Ok(meta) = self.store.block(id) else {
                continue;
            };
            let distance = meta.bounds.distance_to(focus);
            let in_radius = self.focus_radius.is_infinite() || distance <= self.focus_radius;
            let desired = desired_level(
                &meta.levels,
                meta.finest_level(),
                in_radius,
                distance,
                self.target_resolution,
            );
            plan.push((id, in_radius, desired));
        }

        for (id, in_radius, desired) in plan {
            let entry = self.entries.entry(id).or_default();
            entry.in_radius = in_radius;
            if in_radius {
                entry.last_focus_tick = self.tick;
            }

            if let Some(retry) = &entry.retry {
                if self.tick < retry.next_tick {
                    continue;
                }
            }

            let current = entry.resident_level();
            let wanted = match current {
                // Never loaded: load only when the focus wants it.
                None => {
                    if in_radius {
                        Some(desired)
                    } else {
                        None
                    }
                }
                Some(level) if level != desired => {
                    // Static mode never demotes.
                    if self.mode == CacheMode::Static && desired < level {
                        None
                    } else {
                        Some(desired)
                    }
                }
                Some(_) => None,
            };

            if let Some(level) = wanted {
                if entry.pending != Some(level) && scheduled < self.loads_per_tick {
                    entry.pending = Some(level);
                    self.loader.request(id, level, self.generation);
                    scheduled += 1;
                }
            }
        }

        if self.mode == CacheMode::Dynamic {
            self.evict_over_ceiling();
        }
    }

    /// Apply finished background loads. Call once per frame, between
    /// rendering passes — this is the only place the working set changes
    /// from loader results.
    pub fn commit_loaded(&mut self) {
        while let Some(done) = self.loader.poll() {
            if self.closed || done.generation != self.generation {
                // Abandoned load (session closed or working set reset).
                continue;
            }
            let Some(entry) = self.entries.get_mut(&done.block) else {
                continue;
            };
            if entry.pending != Some(done.level) {
                // Superseded by a newer request for this block.
                continue;
            }
            entry.pending = None;
            match done.result {
                Ok(surfels) => {
                    let bytes = surfels.len() as u64 * Surfel::MEM_SIZE;
                    // Swap: the coarser level is released in the same
                    // commit that installs the finer one.
                    if let Some(old) = entry.resident.take() {
                        self.resident_bytes -= old.bytes;
                    }
                    entry.resident = Some(Residency {
                        level: done.level,
                        surfels,
                        bytes,
                    });
                    self.resident_bytes += bytes;
                    entry.retry = None;
                }
                Err(e) => {
                    let delay = entry
                        .retry
                        .as_ref()
                        .map(|r| (r.delay * 2).min(MAX_RETRY_DELAY_TICKS))
                        .unwrap_or(INITIAL_RETRY_DELAY_TICKS);
                    tracing::warn!(
                        block = %done.block,
                        level = done.level,
                        retry_in_ticks = delay,
                        error = %e,
                        "block load failed; keeping previous resident level"
                    );
                    entry.retry = Some(Retry {
                        next_tick: self.tick + delay,
                        delay,
                    });
                }
            }
        }

        if self.mode == CacheMode::Dynamic {
            self.evict_over_ceiling();
        }
    }

    /// Evict least-recently-focused residents until under the ceiling.
    ///
    /// Only out-of-radius blocks are evicted outright; in-radius blocks
    /// are never dropped below their coarsest level — over-budget finer
    /// levels shrink through demotion swaps scheduled by `update_focus`.
    fn evict_over_ceiling(&mut self) {
        while self.resident_bytes > self.memory_ceiling {
            let victim = self
                .entries
                .iter()
                .filter(|(_, e)| e.resident.is_some() && !e.in_radius)
                .min_by_key(|(_, e)| e.last_focus_tick)
                .map(|(&id, _)| id);
            let Some(id) = victim else {
                break;
            };
            if let Some(entry) = self.entries.get_mut(&id) {
                if let Some(old) = entry.resident.take() {
                    self.resident_bytes -= old.bytes;
                    tracing::debug!(block = %id, level = old.level, "evicted block");
                }
            }
        }
    }

    /// Shut the cache down: discard pending loads and stop the loader.
    /// Outstanding background loads are abandoned, never applied.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.generation += 1;
        for entry in self.entries.values_mut() {
            entry.pending = None;
        }
        self.loader.shutdown();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
