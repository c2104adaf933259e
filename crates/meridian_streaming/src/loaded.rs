//! # Loaded Chunks
//!
//! Runtime record of a spawned chunk. Owns every engine resource the
//! chunk created and is the only thing that releases them.
//!
//! Never persisted: `state` is the part that goes to storage, the rest is
//! rebuilt on every spawn.

use std::time::Instant;

use meridian_core::{EntityId, EntityKind, NodeId};
use meridian_procedural::{ChunkCoord, ChunkState};

use crate::bridge::Bridges;

/// Progress of one entity's mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// Scheduled, not started.
    Pending,
    /// Asset load or instancing in progress.
    Loading,
    /// Instance created and attached.
    Loaded,
    /// Asset unavailable; the entity has no renderable.
    Failed,
}

/// Link between an entity and its mesh instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshBinding {
    /// Owning entity.
    pub entity: EntityId,
    /// Asset path.
    pub path: String,
    /// Instance node, once loaded.
    pub node: Option<NodeId>,
    /// Load progress.
    pub state: BindingState,
}

/// An entity spawned for a chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnedEntity {
    /// Runtime handle.
    pub id: EntityId,
    /// Stable key used in the persisted state.
    pub key: String,
    /// Entity category.
    pub kind: EntityKind,
}

/// A chunk in the loaded set.
#[derive(Debug)]
pub struct LoadedChunk {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Persisted snapshot, with entity keys filled in.
    pub state: ChunkState,
    /// Chunk root node.
    pub root: NodeId,
    /// One root per spawned placement, children of `root`.
    pub assemblage_roots: Vec<NodeId>,
    /// Entities owned by the chunk.
    pub entities: Vec<SpawnedEntity>,
    /// Mesh instances owned by the chunk.
    pub renderables: Vec<NodeId>,
    /// Per-entity mesh bindings.
    pub bindings: Vec<MeshBinding>,
    /// LOD registrations owned by the chunk.
    pub lod_ids: Vec<String>,
    /// Last time the manager touched this chunk.
    pub last_accessed: Instant,
}

impl LoadedChunk {
    /// Creates a record around an existing root node.
    #[must_use]
    pub fn new(state: ChunkState, root: NodeId) -> Self {
        Self {
            coord: state.coord(),
            state,
            root,
            assemblage_roots: Vec::new(),
            entities: Vec::new(),
            renderables: Vec::new(),
            bindings: Vec::new(),
            lod_ids: Vec::new(),
            last_accessed: Instant::now(),
        }
    }

    /// Number of bindings that failed.
    #[must_use]
    pub fn failed_bindings(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.state == BindingState::Failed)
            .count()
    }

    /// Records an access, for instrumentation.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Releases every LOD registration, entity and node the chunk owns.
    ///
    /// Idempotent: the owned lists are drained.
    pub fn dispose(&mut self, bridges: &Bridges) {
        for id in self.lod_ids.drain(..) {
            bridges.lod.unregister_mesh(&id);
        }
        for entity in self.entities.drain(..) {
            bridges.entities.remove_entity(entity.id);
        }
        for node in self.renderables.drain(..) {
            if bridges.scene.is_alive(node) {
                bridges.scene.dispose_node(node);
            }
        }
        for node in self.assemblage_roots.drain(..) {
            bridges.scene.dispose_node(node);
        }
        if bridges.scene.is_alive(self.root) {
            bridges.scene.dispose_node(self.root);
        }
        for binding in &mut self.bindings {
            binding.node = None;
        }
        tracing::trace!(x = self.coord.x, z = self.coord.z, "chunk resources released");
    }
}
