//! # Harvest and Rehydration
//!
//! The two directions of the fact round trip:
//!
//! - `rehydrate`: stored facts -> component data, before an entity is created
//! - `harvest`: live component data -> stored facts, before a chunk is persisted
//!
//! Facts are keyed by the entity's stable key, so they survive any number
//! of respawns.

use meridian_core::{Components, EntityKind};
use meridian_procedural::{now_millis, ChunkState};

use crate::bridge::EntityBridge;
use crate::loaded::LoadedChunk;

/// Applies stored facts for `key` to freshly built component data.
pub fn rehydrate(state: &ChunkState, key: &str, components: &mut Components) {
    match components.kind() {
        EntityKind::Door => {
            if let Some(door) = state.door(key) {
                components.set_door_state(door);
            }
        }
        EntityKind::Spawn => {
            if let (Some(stored), Some(spawn)) = (state.enemy(key), components.spawn_mut()) {
                spawn.dead = stored.dead;
                spawn.position = stored.position;
            }
        }
        EntityKind::Prop => {
            if let (Some(stored), Some(loot)) = (state.loot(key), components.loot_mut()) {
                loot.collected = stored.collected;
            }
        }
        EntityKind::Trigger => {
            if let Some(stored) = state.trigger(key) {
                components.set_trigger_fired(stored.fired);
            }
        }
        EntityKind::Structural | EntityKind::Light => {}
    }
}

/// Copies the facts of every live entity of `chunk` into its state.
///
/// Entities the store no longer knows are skipped; their last recorded
/// facts stay as they were. Refreshes `fully_explored` and `last_visited`.
pub fn harvest(chunk: &mut LoadedChunk, entities: &dyn EntityBridge) {
    let state = &mut chunk.state;
    for entity in &chunk.entities {
        let Some(components) = entities.components(entity.id) else {
            continue;
        };
        match &components {
            Components::Door(door) => state.record_door(&entity.key, door.state),
            Components::Spawn(spawn) => state.record_enemy(&entity.key, spawn.dead, spawn.position),
            Components::Prop(prop) => {
                if let Some(loot) = &prop.loot {
                    state.record_loot(&entity.key, loot.collected);
                }
            }
            Components::Trigger(trigger) => state.record_trigger(&entity.key, trigger.fired),
            Components::Structural(_) | Components::Light(_) => {}
        }
    }
    state.refresh_explored();
    state.touch(now_millis());
    chunk.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{
        DoorComponent, DoorState, LootComponent, PropComponent, SpawnComponent, TriggerComponent, Vec3,
    };
    use meridian_procedural::ChunkCoord;

    fn state() -> ChunkState {
        ChunkState::new(ChunkCoord::new(0, 0), "test", 1, 0)
    }

    #[test]
    fn test_rehydrate_each_kind() {
        let mut stored = state();
        stored.record_door("d", DoorState::Breached);
        stored.record_enemy("s", true, Some(Vec3::new(4.0, 0.0, 4.0)));
        stored.record_loot("p", true);
        stored.record_trigger("t", true);

        let mut door = Components::Door(DoorComponent::default());
        rehydrate(&stored, "d", &mut door);
        assert_eq!(door.door_state(), Some(DoorState::Breached));

        let mut spawn = Components::Spawn(SpawnComponent::default());
        rehydrate(&stored, "s", &mut spawn);
        assert!(spawn.spawn().unwrap().dead);
        assert_eq!(spawn.spawn().unwrap().position, Some(Vec3::new(4.0, 0.0, 4.0)));

        let mut prop = Components::Prop(PropComponent {
            loot: Some(LootComponent::default()),
        });
        rehydrate(&stored, "p", &mut prop);
        assert!(prop.loot().unwrap().collected);

        let mut trigger = Components::Trigger(TriggerComponent::default());
        rehydrate(&stored, "t", &mut trigger);
        assert_eq!(trigger.trigger_fired(), Some(true));
    }

    #[test]
    fn test_rehydrate_without_facts_is_noop() {
        let mut door = Components::Door(DoorComponent {
            state: DoorState::Locked,
        });
        rehydrate(&state(), "missing", &mut door);
        assert_eq!(door.door_state(), Some(DoorState::Locked));

        let mut decorative = Components::Prop(PropComponent::default());
        let mut stored = state();
        stored.record_loot("p", true);
        rehydrate(&stored, "p", &mut decorative);
        assert_eq!(decorative.loot(), None);
    }
}
