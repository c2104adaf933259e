//! # Engine Bridges
//!
//! Narrow interfaces to the collaborators the chunk manager drives but
//! does not own: the key-value store, the asset loader, the LOD manager,
//! the entity store and the scene graph.
//!
//! ```text
//! ChunkManager          collaborator implements:
//! ┌──────────────┐      ┌──────────────────────┐
//! │ persist/load │ ───> │ PersistenceBridge    │
//! │ spawn        │ ───> │ AssetBridge, Scene.. │
//! │ harvest      │ ───> │ EntityBridge         │
//! └──────────────┘      └──────────────────────┘
//! ```
//!
//! Async calls return boxed `Send` futures so the traits stay object safe
//! and can be shared as `Arc<dyn ...>`. Implementations must tolerate
//! concurrent calls for distinct keys.

use std::sync::Arc;

use futures::future::BoxFuture;

use meridian_core::{Components, EntityId, EntityKind, NodeId, Transform};

use crate::error::BridgeResult;

// ============================================================================
// PERSISTENCE
// ============================================================================

/// String key-value store holding serialized chunk snapshots.
pub trait PersistenceBridge: Send + Sync {
    /// Reads a value. `Ok(None)` when the key is absent.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, BridgeResult<Option<String>>>;

    /// Writes a value, replacing any previous one.
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, BridgeResult<()>>;

    /// Removes a value. Removing an absent key succeeds.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, BridgeResult<()>>;
}

// ============================================================================
// ASSETS
// ============================================================================

/// Mesh loading and instancing.
pub trait AssetBridge: Send + Sync {
    /// Returns true if the asset is already loaded.
    fn is_path_cached(&self, path: &str) -> bool;

    /// Loads an asset into the cache. Idempotent.
    fn load_asset_by_path<'a>(&'a self, path: &'a str) -> BoxFuture<'a, BridgeResult<()>>;

    /// Instantiates a cached asset. `None` if the asset is not available.
    fn create_instance_by_path(
        &self,
        path: &str,
        instance_name: &str,
        apply_lod: bool,
        lod_category: EntityKind,
    ) -> Option<NodeId>;
}

// ============================================================================
// LEVEL OF DETAIL
// ============================================================================

/// Level-of-detail registration.
pub trait LodBridge: Send + Sync {
    /// Registers a mesh under `id`. Failures are non-fatal to callers.
    fn register_mesh<'a>(
        &'a self,
        id: &'a str,
        node: NodeId,
        category: EntityKind,
        is_static: bool,
    ) -> BoxFuture<'a, BridgeResult<()>>;

    /// Removes a registration. Unknown ids are ignored.
    fn unregister_mesh(&self, id: &str);
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Gameplay entity store.
pub trait EntityBridge: Send + Sync {
    /// Creates an entity carrying `components`.
    fn create_entity(&self, components: Components) -> EntityId;

    /// Removes an entity and any renderable attached to it.
    fn remove_entity(&self, entity: EntityId);

    /// Binds a renderable node to an entity.
    fn attach_renderable(&self, entity: EntityId, node: NodeId);

    /// Current component data of a live entity.
    fn components(&self, entity: EntityId) -> Option<Components>;
}

// ============================================================================
// SCENE GRAPH
// ============================================================================

/// Collision and shadow switches for a renderable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderFlags {
    /// Participates in collision.
    pub collision: bool,
    /// Casts shadows.
    pub cast_shadows: bool,
    /// Receives shadows.
    pub receive_shadows: bool,
}

impl RenderFlags {
    /// Flags appropriate for an entity kind.
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Structural => Self {
                collision: true,
                cast_shadows: true,
                receive_shadows: true,
            },
            EntityKind::Prop => Self {
                collision: true,
                cast_shadows: true,
                receive_shadows: false,
            },
            EntityKind::Door => Self {
                collision: true,
                cast_shadows: false,
                receive_shadows: false,
            },
            EntityKind::Light | EntityKind::Trigger | EntityKind::Spawn => Self {
                collision: false,
                cast_shadows: false,
                receive_shadows: false,
            },
        }
    }
}

/// Whether meshes of this kind never move after spawn.
#[must_use]
pub const fn is_static_kind(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Structural | EntityKind::Prop | EntityKind::Light)
}

/// Scene-graph nodes.
pub trait SceneBridge: Send + Sync {
    /// Creates an empty node, optionally under `parent`.
    fn create_node(&self, name: &str, parent: Option<NodeId>) -> NodeId;

    /// Reparents a node.
    fn set_parent(&self, node: NodeId, parent: NodeId);

    /// Sets a node's local transform.
    fn set_transform(&self, node: NodeId, transform: &Transform);

    /// Sets collision and shadow flags.
    fn set_render_flags(&self, node: NodeId, flags: RenderFlags);

    /// Releases a node and all of its descendants. Unknown nodes are ignored.
    fn dispose_node(&self, node: NodeId);

    /// Returns true if the node has not been disposed.
    fn is_alive(&self, node: NodeId) -> bool;
}

/// The full set of collaborators handed to a `ChunkManager`.
#[derive(Clone)]
pub struct Bridges {
    /// Chunk snapshot store.
    pub persistence: Arc<dyn PersistenceBridge>,
    /// Asset loader.
    pub assets: Arc<dyn AssetBridge>,
    /// LOD manager.
    pub lod: Arc<dyn LodBridge>,
    /// Entity store.
    pub entities: Arc<dyn EntityBridge>,
    /// Scene graph.
    pub scene: Arc<dyn SceneBridge>,
}

impl std::fmt::Debug for Bridges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridges").finish_non_exhaustive()
    }
}
