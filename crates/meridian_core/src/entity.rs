//! # Engine Handles
//!
//! Opaque identifiers handed out by the engine bridges.
//!
//! - `EntityId`: gameplay entity, index + generation for stale detection
//! - `NodeId`: scene-graph node (chunk roots, assemblage roots, mesh instances)

use std::fmt;

/// Unique identifier for a gameplay entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Slot index inside the entity store
/// - Upper 32 bits: Generation counter for detecting stale references
///
/// These are runtime handles only. What a chunk persists is a stable
/// chunk-scoped key, never an `EntityId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Handle for the same slot one generation later.
    #[inline]
    #[must_use]
    pub const fn next_generation(self) -> Self {
        Self::new(self.index(), self.generation().wrapping_add(1))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Handle to a node in the engine's scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw engine handle.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine handle.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
    }

    #[test]
    fn test_generation_distinguishes_reused_slot() {
        let first = EntityId::new(7, 1);
        let reused = EntityId::new(7, 2);
        assert_ne!(first, reused);
        assert_eq!(first.index(), reused.index());
    }

    #[test]
    fn test_next_generation_keeps_slot() {
        let id = EntityId::new(3, 4);
        let next = id.next_generation();
        assert_eq!((next.index(), next.generation()), (3, 5));
        assert_eq!(next.to_string(), "3v5");
        assert_eq!(EntityId::new(1, u32::MAX).next_generation().generation(), 0);
    }
}
