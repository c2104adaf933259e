//! # Spawn Procedure
//!
//! Turns a `ChunkState` into live engine resources:
//!
//! 1. Chunk root node at the chunk's world origin
//! 2. Per placement: an assemblage root at the grid offset, rotated
//! 3. Per entity definition: roll spawn tables, apply stored facts,
//!    create the entity, record its stable key
//! 4. Per entity with an asset: load, instance, parent, flag, register
//!    LOD, attach. All mesh jobs of the chunk run concurrently and the
//!    spawn completes when every one has settled.
//!
//! A failed mesh job only marks its binding failed. Unknown assemblage
//! types are logged and skipped.

use futures::future::join_all;

use meridian_core::{Components, EntityId, EntityKind, NodeId, Transform, Vec3};
use meridian_procedural::{
    derive_seed, entity_key, AssemblageDefinition, AssemblageRegistry, ChunkState, EntityDefinition,
    SeededRng,
};

use crate::bridge::{is_static_kind, Bridges, RenderFlags};
use crate::config::StreamingConfig;
use crate::harvest::rehydrate;
use crate::loaded::{BindingState, LoadedChunk, MeshBinding, SpawnedEntity};

/// Everything a spawn reads besides the chunk state.
#[derive(Clone, Copy, Debug)]
pub struct SpawnContext<'a> {
    /// Engine collaborators.
    pub bridges: &'a Bridges,
    /// Assemblage catalog.
    pub registry: &'a AssemblageRegistry,
    /// Grid geometry.
    pub config: &'a StreamingConfig,
}

/// One scheduled mesh load.
#[derive(Clone, Debug)]
struct MeshJob {
    entity: EntityId,
    path: String,
    instance_name: String,
    kind: EntityKind,
    parent: NodeId,
    transform: Transform,
    lod_id: String,
}

/// Spawns every placement of `state` under `parent`.
pub async fn spawn_chunk(ctx: SpawnContext<'_>, mut state: ChunkState, parent: NodeId) -> LoadedChunk {
    let coord = state.coord();
    let scene = &ctx.bridges.scene;
    let cell = ctx.config.grid_cell_size;

    let root = scene.create_node(&format!("chunk_{}_{}", coord.x, coord.z), Some(parent));
    scene.set_transform(root, &Transform::from_position(coord.world_origin(ctx.config.chunk_size)));

    let mut assemblage_roots = Vec::with_capacity(state.assemblages.len());
    let mut entities = Vec::new();
    let mut jobs = Vec::new();
    let mut spawned_keys = Vec::with_capacity(state.assemblages.len());

    for (index, placement) in state.assemblages.iter().enumerate() {
        let Some(def) = ctx.registry.get(&placement.assemblage_type) else {
            tracing::warn!(
                x = coord.x,
                z = coord.z,
                assemblage = %placement.assemblage_type,
                "unknown assemblage type, placement skipped"
            );
            continue;
        };

        let offset = Vec3::new(placement.grid_x as f32 * cell, 0.0, placement.grid_z as f32 * cell);
        let placement_root = scene.create_node(&format!("{}_{index}", def.type_name), Some(root));
        scene.set_transform(
            placement_root,
            &Transform::from_position_yaw(offset, placement.rotation.quarter_turns()),
        );
        assemblage_roots.push(placement_root);

        let mut keys = Vec::with_capacity(def.entities.len());
        for (entity_index, entity_def) in def.entities.iter().enumerate() {
            let key = entity_key(coord, index, entity_index);
            let mut components = entity_def.components.clone();
            roll_tables(&mut components, def, derive_seed(state.seed, index as u32, entity_index as u32));
            rehydrate(&state, &key, &mut components);

            let kind = components.kind();
            let id = ctx.bridges.entities.create_entity(components);
            if let Some(path) = &entity_def.asset {
                jobs.push(MeshJob {
                    entity: id,
                    path: path.clone(),
                    instance_name: instance_name(def, entity_def, &key),
                    kind,
                    parent: placement_root,
                    transform: entity_def.transform,
                    lod_id: format!("chunk_{key}"),
                });
            }
            entities.push(SpawnedEntity {
                id,
                key: key.clone(),
                kind,
            });
            keys.push(key);
        }
        spawned_keys.push((index, keys));
    }

    for (index, keys) in spawned_keys {
        state.assemblages[index].entity_ids = keys;
    }

    let mut bindings: Vec<MeshBinding> = jobs
        .iter()
        .map(|job| MeshBinding {
            entity: job.entity,
            path: job.path.clone(),
            node: None,
            state: BindingState::Pending,
        })
        .collect();

    let lod_registered = join_all(
        bindings
            .iter_mut()
            .zip(&jobs)
            .map(|(binding, job)| bind_mesh(ctx.bridges, job, binding)),
    )
    .await;

    let mut chunk = LoadedChunk::new(state, root);
    for ((binding, job), registered) in bindings.iter().zip(&jobs).zip(lod_registered) {
        if let Some(node) = binding.node {
            chunk.renderables.push(node);
        }
        if registered {
            chunk.lod_ids.push(job.lod_id.clone());
        }
    }
    chunk.assemblage_roots = assemblage_roots;
    chunk.entities = entities;
    chunk.bindings = bindings;
    chunk
}

/// Draws enemy and loot content left open by the definition.
fn roll_tables(components: &mut Components, def: &AssemblageDefinition, seed: u32) {
    let mut rng = SeededRng::new(seed);
    if let Some(spawn) = components.spawn_mut() {
        if spawn.enemy.is_none() {
            spawn.enemy = def
                .enemy_table
                .as_ref()
                .and_then(|table| table.roll(&mut rng))
                .map(str::to_owned);
        }
    }
    if let Some(loot) = components.loot_mut() {
        if loot.item.is_none() {
            loot.item = def
                .loot_table
                .as_ref()
                .and_then(|table| table.roll(&mut rng))
                .map(str::to_owned);
        }
    }
}

fn instance_name(def: &AssemblageDefinition, entity: &EntityDefinition, key: &str) -> String {
    match &entity.name {
        Some(name) => format!("{}_{name}_{key}", def.type_name),
        None => format!("{}_{}_{key}", def.type_name, entity.kind().as_str()),
    }
}

/// Runs one mesh job, advancing `binding` as it goes.
///
/// Returns true if the instance was registered with the LOD bridge.
async fn bind_mesh(bridges: &Bridges, job: &MeshJob, binding: &mut MeshBinding) -> bool {
    binding.state = BindingState::Loading;
    let assets = &bridges.assets;
    if !assets.is_path_cached(&job.path) {
        if let Err(error) = assets.load_asset_by_path(&job.path).await {
            tracing::warn!(path = %job.path, %error, "asset load failed");
            binding.state = BindingState::Failed;
            return false;
        }
    }

    let Some(node) = assets.create_instance_by_path(&job.path, &job.instance_name, true, job.kind) else {
        tracing::warn!(path = %job.path, "asset instancing failed");
        binding.state = BindingState::Failed;
        return false;
    };

    let scene = &bridges.scene;
    scene.set_parent(node, job.parent);
    scene.set_transform(node, &job.transform);
    scene.set_render_flags(node, RenderFlags::for_kind(job.kind));

    let lod_registered = match bridges
        .lod
        .register_mesh(&job.lod_id, node, job.kind, is_static_kind(job.kind))
        .await
    {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(id = %job.lod_id, %error, "lod registration failed, ignored");
            false
        }
    };

    bridges.entities.attach_renderable(job.entity, node);
    binding.node = Some(node);
    binding.state = BindingState::Loaded;
    lod_registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use meridian_core::{LootComponent, PropComponent, SpawnComponent};
    use meridian_procedural::{ChunkCoord, ChunkGenerator, WorldSeed};

    use crate::bridge::SceneBridge;
    use crate::headless::HeadlessBackend;

    #[test]
    fn test_table_rolls_are_reproducible() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let chamber = registry.get("cavern_chamber").unwrap();

        let roll = |seed| {
            let mut spawn = Components::Spawn(SpawnComponent::default());
            roll_tables(&mut spawn, chamber, seed);
            spawn.spawn().unwrap().enemy.clone()
        };
        assert!(roll(5).is_some());
        assert_eq!(roll(5), roll(5));
    }

    #[test]
    fn test_fixed_content_is_kept() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let chamber = registry.get("cavern_chamber").unwrap();

        let mut prop = Components::Prop(PropComponent {
            loot: Some(LootComponent {
                item: Some("fixed".into()),
                collected: false,
            }),
        });
        roll_tables(&mut prop, chamber, 1);
        assert_eq!(prop.loot().unwrap().item.as_deref(), Some("fixed"));

        let mut decorative = Components::Prop(PropComponent::default());
        roll_tables(&mut decorative, chamber, 1);
        assert_eq!(decorative.loot(), None);
    }

    #[tokio::test]
    async fn test_bindings_settle_as_loaded_or_failed() {
        const BROKEN: &str = "models/station/light_panel.glb";
        let backend = HeadlessBackend::new();
        backend.fail_path(BROKEN);
        let bridges = backend.bridges();
        let registry = Arc::new(AssemblageRegistry::builtin().unwrap());
        let config = StreamingConfig::production();
        let ctx = SpawnContext {
            bridges: &bridges,
            registry: registry.as_ref(),
            config: &config,
        };

        let state = ChunkGenerator::new(WorldSeed::new(1234), registry.clone())
            .generate(ChunkCoord::new(0, 0), "station_interior");
        let parent = backend.create_node("root", None);
        let chunk = spawn_chunk(ctx, state, parent).await;

        assert!(!chunk.bindings.is_empty());
        for binding in &chunk.bindings {
            match binding.state {
                BindingState::Loaded => assert!(binding.node.is_some()),
                BindingState::Failed => {
                    assert_eq!(binding.path, BROKEN);
                    assert_eq!(binding.node, None);
                }
                unsettled => panic!("binding for {} left {unsettled:?}", binding.path),
            }
        }
        let broken = chunk.bindings.iter().filter(|b| b.path == BROKEN).count();
        assert_eq!(chunk.failed_bindings(), broken);
        assert_eq!(chunk.renderables.len(), chunk.bindings.len() - broken);
    }
}
