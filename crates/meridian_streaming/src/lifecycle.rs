//! # Chunk Lifecycle
//!
//! ```text
//! Unloaded ──> Loading ──> Spawning ──> Active ──> Unloading ──> Unloaded
//!                 │            │
//!                 └── error ───┴──> Unloaded (retried on a later tick)
//! ```
//!
//! ## Cancellation
//!
//! Loads are not aborted. Each load captures the manager's epoch when it
//! starts; dispose, full reload and environment switch advance the epoch.
//! A load that resumes under a newer epoch releases whatever it spawned
//! and inserts nothing.
//!
//! ## In-flight markers
//!
//! A coordinate is marked in-flight before the first await of its load.
//! The marker is owned by an `InFlightGuard`, so it is cleared on every
//! exit path. A guard only clears the marker it created: after an epoch
//! change a newer load may already own the coordinate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use meridian_procedural::ChunkCoord;

/// Lifecycle phase of one chunk coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkPhase {
    /// Not loaded and not being loaded.
    #[default]
    Unloaded,
    /// Fetching or generating the chunk state.
    Loading,
    /// Creating entities and renderables.
    Spawning,
    /// In the loaded set.
    Active,
    /// Harvesting and persisting before release.
    Unloading,
}

/// Owner-side cancellation state: a disposed flag plus an epoch counter.
#[derive(Debug, Default)]
pub struct LifecycleToken {
    disposed: AtomicBool,
    epoch: AtomicU64,
}

impl LifecycleToken {
    /// Creates a live token at epoch 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Invalidates every load started so far. Returns the new epoch.
    pub fn advance(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Marks the owner disposed. Returns false if it already was.
    pub fn dispose(&self) -> bool {
        let first = !self.disposed.swap(true, Ordering::AcqRel);
        if first {
            self.advance();
        }
        first
    }

    /// Returns true once `dispose` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns true if work started at `epoch` may still publish results.
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        !self.is_disposed() && self.epoch() == epoch
    }
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    epoch: u64,
    phase: ChunkPhase,
}

/// Coordinates with a load in progress.
#[derive(Debug, Default)]
pub struct InFlightTable {
    entries: Mutex<HashMap<ChunkCoord, InFlight>>,
}

impl InFlightTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `coord` as loading under `epoch`.
    ///
    /// Returns `None` if a load for `coord` is already in flight.
    pub fn try_begin(&self, coord: ChunkCoord, epoch: u64) -> Option<InFlightGuard<'_>> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&coord) {
            return None;
        }
        entries.insert(
            coord,
            InFlight {
                epoch,
                phase: ChunkPhase::Loading,
            },
        );
        Some(InFlightGuard {
            table: self,
            coord,
            epoch,
        })
    }

    /// Phase of an in-flight load.
    #[must_use]
    pub fn phase(&self, coord: ChunkCoord) -> Option<ChunkPhase> {
        self.entries.lock().get(&coord).map(|e| e.phase)
    }

    /// Returns true if `coord` has a load in flight.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.entries.lock().contains_key(&coord)
    }

    /// Number of loads in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forgets every marker. Outstanding guards become no-ops unless a new
    /// marker with their epoch is created.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn release(&self, coord: ChunkCoord, epoch: u64) {
        let mut entries = self.entries.lock();
        if entries.get(&coord).is_some_and(|e| e.epoch == epoch) {
            entries.remove(&coord);
        }
    }

    fn set_phase(&self, coord: ChunkCoord, epoch: u64, phase: ChunkPhase) {
        if let Some(entry) = self.entries.lock().get_mut(&coord) {
            if entry.epoch == epoch {
                entry.phase = phase;
            }
        }
    }
}

/// Clears an in-flight marker when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    table: &'a InFlightTable,
    coord: ChunkCoord,
    epoch: u64,
}

impl InFlightGuard<'_> {
    /// Epoch the load started under.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Advances the marker's phase.
    pub fn set_phase(&self, phase: ChunkPhase) {
        self.table.set_phase(self.coord, self.epoch, phase);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.coord, self.epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_epochs() {
        let token = LifecycleToken::new();
        let start = token.epoch();
        assert!(token.is_current(start));

        token.advance();
        assert!(!token.is_current(start));
        assert!(token.is_current(start + 1));

        assert!(token.dispose());
        assert!(!token.dispose(), "dispose is idempotent");
        assert!(!token.is_current(token.epoch()));
    }

    #[test]
    fn test_single_marker_per_coord() {
        let table = InFlightTable::new();
        let coord = ChunkCoord::new(1, 2);

        let guard = table.try_begin(coord, 0).unwrap();
        assert!(table.try_begin(coord, 0).is_none());
        assert_eq!(table.phase(coord), Some(ChunkPhase::Loading));

        guard.set_phase(ChunkPhase::Spawning);
        assert_eq!(table.phase(coord), Some(ChunkPhase::Spawning));

        drop(guard);
        assert!(!table.contains(coord));
        assert!(table.try_begin(coord, 0).is_some());
    }

    #[test]
    fn test_stale_guard_keeps_newer_marker() {
        let table = InFlightTable::new();
        let coord = ChunkCoord::new(0, 0);

        let stale = table.try_begin(coord, 0).unwrap();
        table.clear();
        let fresh = table.try_begin(coord, 1).unwrap();

        stale.set_phase(ChunkPhase::Spawning);
        drop(stale);
        assert_eq!(table.phase(coord), Some(ChunkPhase::Loading));
        assert_eq!(table.len(), 1);

        drop(fresh);
        assert!(table.is_empty());
    }
}
