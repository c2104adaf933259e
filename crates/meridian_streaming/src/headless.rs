//! # Headless Backend
//!
//! In-process implementations of every bridge, for tests and tools that
//! run without an engine.
//!
//! - Persistence: a `BTreeMap<String, String>`
//! - Assets: a set of cached paths; loads succeed unless the path is marked failing
//! - LOD: a map of registered ids
//! - Entities: a slot map of component bags with attached renderables
//! - Scene: a parent-linked node table; disposing a node disposes its subtree
//!
//! Every async call yields to the scheduler (or sleeps for the configured
//! latency) before touching state, so concurrent loads really interleave.
//!
//! Failure injection: `fail_path`, `set_fail_reads`, `set_fail_writes`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use meridian_core::{Components, EntityId, EntityKind, NodeId, Transform};

use crate::bridge::{
    AssetBridge, Bridges, EntityBridge, LodBridge, PersistenceBridge, RenderFlags, SceneBridge,
};
use crate::error::{BridgeError, BridgeResult};

/// Call counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    /// Persistence reads.
    pub reads: u64,
    /// Persistence writes.
    pub writes: u64,
    /// Asset loads started.
    pub asset_loads: u64,
    /// Instances created.
    pub instances: u64,
    /// Entities created.
    pub entities_created: u64,
    /// Entities removed.
    pub entities_removed: u64,
}

#[derive(Clone, Debug)]
struct NodeRecord {
    name: String,
    parent: Option<NodeId>,
    transform: Transform,
    flags: RenderFlags,
}

#[derive(Clone, Debug)]
struct EntityRecord {
    components: Components,
    renderable: Option<NodeId>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    store: BTreeMap<String, String>,
    cached_paths: HashSet<String>,
    failing_paths: HashSet<String>,
    fail_reads: bool,
    fail_writes: bool,
    next_node: u64,
    nodes: HashMap<NodeId, NodeRecord>,
    lods: HashMap<String, (NodeId, EntityKind, bool)>,
    next_entity: u32,
    free_entities: Vec<EntityId>,
    entities: HashMap<EntityId, EntityRecord>,
    counters: HeadlessCounters,
}

impl HeadlessState {
    fn dispose_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.nodes.remove(&current).is_none() {
                continue;
            }
            stack.extend(
                self.nodes
                    .iter()
                    .filter(|(_, record)| record.parent == Some(current))
                    .map(|(id, _)| *id),
            );
        }
    }
}

/// In-process engine stand-in implementing every bridge.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
    latency: Option<Duration>,
}

impl HeadlessBackend {
    /// Creates a backend whose async calls only yield.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a backend whose async calls sleep for `latency`.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::default(),
            latency: Some(latency),
        })
    }

    /// Bundles this backend as every bridge.
    #[must_use]
    pub fn bridges(self: &Arc<Self>) -> Bridges {
        Bridges {
            persistence: self.clone(),
            assets: self.clone(),
            lod: self.clone(),
            entities: self.clone(),
            scene: self.clone(),
        }
    }

    async fn delay(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }

    // ========================================================================
    // FAILURE INJECTION
    // ========================================================================

    /// Makes every load of `path` fail.
    pub fn fail_path(&self, path: &str) {
        let mut state = self.state.lock();
        state.failing_paths.insert(path.to_owned());
        state.cached_paths.remove(path);
    }

    /// Makes persistence reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Makes persistence writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Stored value for `key`.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<String> {
        self.state.lock().store.get(key).cloned()
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn stored_keys(&self) -> Vec<String> {
        self.state.lock().store.keys().cloned().collect()
    }

    /// Writes a value directly, bypassing failure injection.
    pub fn insert_stored(&self, key: &str, value: &str) {
        self.state.lock().store.insert(key.to_owned(), value.to_owned());
    }

    /// Number of live scene nodes.
    #[must_use]
    pub fn alive_node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    /// Name of a live node.
    #[must_use]
    pub fn node_name(&self, node: NodeId) -> Option<String> {
        self.state.lock().nodes.get(&node).map(|n| n.name.clone())
    }

    /// Local transform of a live node.
    #[must_use]
    pub fn node_transform(&self, node: NodeId) -> Option<Transform> {
        self.state.lock().nodes.get(&node).map(|n| n.transform)
    }

    /// Render flags of a live node.
    #[must_use]
    pub fn node_flags(&self, node: NodeId) -> Option<RenderFlags> {
        self.state.lock().nodes.get(&node).map(|n| n.flags)
    }

    /// Parent of a live node.
    #[must_use]
    pub fn node_parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.lock().nodes.get(&node).and_then(|n| n.parent)
    }

    /// Number of LOD registrations.
    #[must_use]
    pub fn lod_count(&self) -> usize {
        self.state.lock().lods.len()
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn is_lod_registered(&self, id: &str) -> bool {
        self.state.lock().lods.contains_key(id)
    }

    /// Static flag a LOD id was registered with.
    #[must_use]
    pub fn lod_is_static(&self, id: &str) -> Option<bool> {
        self.state.lock().lods.get(id).map(|(_, _, is_static)| *is_static)
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_entity_count(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Returns true if the entity exists.
    #[must_use]
    pub fn is_entity_alive(&self, entity: EntityId) -> bool {
        self.state.lock().entities.contains_key(&entity)
    }

    /// Renderable attached to an entity.
    #[must_use]
    pub fn renderable_of(&self, entity: EntityId) -> Option<NodeId> {
        self.state.lock().entities.get(&entity).and_then(|e| e.renderable)
    }

    /// Live entities of one kind, sorted.
    #[must_use]
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .state
            .lock()
            .entities
            .iter()
            .filter(|(_, record)| record.components.kind() == kind)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Mutates a live entity's components, as gameplay would.
    ///
    /// Returns false if the entity does not exist.
    pub fn modify_entity(&self, entity: EntityId, f: impl FnOnce(&mut Components)) -> bool {
        match self.state.lock().entities.get_mut(&entity) {
            Some(record) => {
                f(&mut record.components);
                true
            }
            None => false,
        }
    }

    /// Call counters.
    #[must_use]
    pub fn counters(&self) -> HeadlessCounters {
        self.state.lock().counters
    }
}

// ============================================================================
// BRIDGE IMPLEMENTATIONS
// ============================================================================

impl PersistenceBridge for HeadlessBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, BridgeResult<Option<String>>> {
        Box::pin(async move {
            self.delay().await;
            let mut state = self.state.lock();
            state.counters.reads += 1;
            if state.fail_reads {
                return Err(BridgeError::Io(format!("read failed: {key}")));
            }
            Ok(state.store.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            self.delay().await;
            let mut state = self.state.lock();
            state.counters.writes += 1;
            if state.fail_writes {
                return Err(BridgeError::Io(format!("write failed: {key}")));
            }
            state.store.insert(key.to_owned(), value);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            self.delay().await;
            let mut state = self.state.lock();
            if state.fail_writes {
                return Err(BridgeError::Io(format!("delete failed: {key}")));
            }
            state.store.remove(key);
            Ok(())
        })
    }
}

impl AssetBridge for HeadlessBackend {
    fn is_path_cached(&self, path: &str) -> bool {
        self.state.lock().cached_paths.contains(path)
    }

    fn load_asset_by_path<'a>(&'a self, path: &'a str) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            self.state.lock().counters.asset_loads += 1;
            self.delay().await;
            let mut state = self.state.lock();
            if state.failing_paths.contains(path) {
                return Err(BridgeError::NotFound(path.to_owned()));
            }
            state.cached_paths.insert(path.to_owned());
            Ok(())
        })
    }

    fn create_instance_by_path(
        &self,
        path: &str,
        instance_name: &str,
        _apply_lod: bool,
        _lod_category: EntityKind,
    ) -> Option<NodeId> {
        let mut state = self.state.lock();
        if !state.cached_paths.contains(path) {
            return None;
        }
        state.next_node += 1;
        let id = NodeId::new(state.next_node);
        state.nodes.insert(
            id,
            NodeRecord {
                name: instance_name.to_owned(),
                parent: None,
                transform: Transform::IDENTITY,
                flags: RenderFlags::default(),
            },
        );
        state.counters.instances += 1;
        Some(id)
    }
}

impl LodBridge for HeadlessBackend {
    fn register_mesh<'a>(
        &'a self,
        id: &'a str,
        node: NodeId,
        category: EntityKind,
        is_static: bool,
    ) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            self.delay().await;
            let mut state = self.state.lock();
            if !state.nodes.contains_key(&node) {
                return Err(BridgeError::NotFound(format!("node {node}")));
            }
            state.lods.insert(id.to_owned(), (node, category, is_static));
            Ok(())
        })
    }

    fn unregister_mesh(&self, id: &str) {
        self.state.lock().lods.remove(id);
    }
}

impl EntityBridge for HeadlessBackend {
    fn create_entity(&self, components: Components) -> EntityId {
        let mut state = self.state.lock();
        let id = match state.free_entities.pop() {
            Some(id) => id,
            None => {
                state.next_entity += 1;
                EntityId::new(state.next_entity - 1, 0)
            }
        };
        state.entities.insert(
            id,
            EntityRecord {
                components,
                renderable: None,
            },
        );
        state.counters.entities_created += 1;
        id
    }

    fn remove_entity(&self, entity: EntityId) {
        let mut state = self.state.lock();
        if let Some(record) = state.entities.remove(&entity) {
            state.counters.entities_removed += 1;
            // Slot is reused; the old handle stays dead
            state.free_entities.push(entity.next_generation());
            if let Some(node) = record.renderable {
                state.dispose_subtree(node);
            }
        }
    }

    fn attach_renderable(&self, entity: EntityId, node: NodeId) {
        if let Some(record) = self.state.lock().entities.get_mut(&entity) {
            record.renderable = Some(node);
        }
    }

    fn components(&self, entity: EntityId) -> Option<Components> {
        self.state.lock().entities.get(&entity).map(|e| e.components.clone())
    }
}

impl SceneBridge for HeadlessBackend {
    fn create_node(&self, name: &str, parent: Option<NodeId>) -> NodeId {
        let mut state = self.state.lock();
        state.next_node += 1;
        let id = NodeId::new(state.next_node);
        state.nodes.insert(
            id,
            NodeRecord {
                name: name.to_owned(),
                parent,
                transform: Transform::IDENTITY,
                flags: RenderFlags::default(),
            },
        );
        id
    }

    fn set_parent(&self, node: NodeId, parent: NodeId) {
        if let Some(record) = self.state.lock().nodes.get_mut(&node) {
            record.parent = Some(parent);
        }
    }

    fn set_transform(&self, node: NodeId, transform: &Transform) {
        if let Some(record) = self.state.lock().nodes.get_mut(&node) {
            record.transform = *transform;
        }
    }

    fn set_render_flags(&self, node: NodeId, flags: RenderFlags) {
        if let Some(record) = self.state.lock().nodes.get_mut(&node) {
            record.flags = flags;
        }
    }

    fn dispose_node(&self, node: NodeId) {
        self.state.lock().dispose_subtree(node);
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.state.lock().nodes.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{DoorComponent, DoorState};

    #[test]
    fn test_dispose_releases_subtree() {
        let backend = HeadlessBackend::new();
        let root = backend.create_node("root", None);
        let child = backend.create_node("child", Some(root));
        let grandchild = backend.create_node("grandchild", Some(child));
        let other = backend.create_node("other", None);

        backend.dispose_node(root);
        assert!(!backend.is_alive(child));
        assert!(!backend.is_alive(grandchild));
        assert!(backend.is_alive(other));
        assert_eq!(backend.alive_node_count(), 1);

        backend.dispose_node(root);
        assert_eq!(backend.alive_node_count(), 1, "disposing twice is harmless");
    }

    #[test]
    fn test_remove_entity_releases_renderable() {
        let backend = HeadlessBackend::new();
        let entity = backend.create_entity(Components::Door(DoorComponent::default()));
        let node = backend.create_node("door", None);
        backend.attach_renderable(entity, node);

        assert!(backend.modify_entity(entity, |c| c.set_door_state(DoorState::Open)));
        assert_eq!(backend.components(entity).unwrap().door_state(), Some(DoorState::Open));

        backend.remove_entity(entity);
        assert!(!backend.is_entity_alive(entity));
        assert!(!backend.is_alive(node));
        assert_eq!(backend.counters().entities_removed, 1);
    }

    #[test]
    fn test_reused_slot_rejects_stale_handle() {
        let backend = HeadlessBackend::new();
        let first = backend.create_entity(Components::Door(DoorComponent::default()));
        backend.remove_entity(first);
        let second = backend.create_entity(Components::Door(DoorComponent {
            state: DoorState::Locked,
        }));

        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert!(!backend.is_entity_alive(first));
        assert!(!backend.modify_entity(first, |c| c.set_door_state(DoorState::Open)));

        backend.remove_entity(first);
        assert!(backend.is_entity_alive(second));
        assert_eq!(backend.components(second).unwrap().door_state(), Some(DoorState::Locked));
        assert_eq!(backend.counters().entities_removed, 1);
    }

    #[tokio::test]
    async fn test_persistence_and_failures() {
        let backend = HeadlessBackend::new();
        backend.set("k", "v".into()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".into()));
        assert_eq!(backend.get("missing").await.unwrap(), None);

        backend.set_fail_reads(true);
        assert!(backend.get("k").await.is_err());
        backend.set_fail_writes(true);
        assert!(backend.set("k", "w".into()).await.is_err());
        assert_eq!(backend.stored("k"), Some("v".into()));

        backend.set_fail_writes(false);
        backend.delete("k").await.unwrap();
        assert!(backend.stored_keys().is_empty());
    }

    #[tokio::test]
    async fn test_asset_cache_and_instances() {
        let backend = HeadlessBackend::new();
        assert_eq!(backend.create_instance_by_path("a.glb", "a", true, EntityKind::Prop), None);

        backend.load_asset_by_path("a.glb").await.unwrap();
        assert!(backend.is_path_cached("a.glb"));
        let node = backend
            .create_instance_by_path("a.glb", "a", true, EntityKind::Prop)
            .unwrap();
        backend.register_mesh("lod_a", node, EntityKind::Prop, true).await.unwrap();
        assert!(backend.is_lod_registered("lod_a"));
        backend.unregister_mesh("lod_a");
        assert_eq!(backend.lod_count(), 0);

        backend.fail_path("b.glb");
        assert!(matches!(
            backend.load_asset_by_path("b.glb").await,
            Err(BridgeError::NotFound(_))
        ));
    }
}
