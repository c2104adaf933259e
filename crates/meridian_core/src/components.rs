//! # Entity Components
//!
//! The closed set of component bags a streamed entity can carry.
//!
//! Assemblage content declares one `Components` value per entity. The
//! spawn path hands it to the entity bridge, and the harvest path reads
//! the live value back to extract the facts worth persisting:
//!
//! | kind       | persisted fact              |
//! |------------|-----------------------------|
//! | door       | `DoorState`                 |
//! | spawn      | dead flag, last position    |
//! | prop       | loot collected flag         |
//! | trigger    | fired flag                  |
//!
//! Structural pieces and lights carry no mutable facts.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Entity category, mirrors the `Components` variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Walls, floors, terrain pieces.
    Structural,
    /// Decorative or lootable props.
    Prop,
    /// Light sources.
    Light,
    /// Doors and hatches.
    Door,
    /// Invisible gameplay triggers.
    Trigger,
    /// Enemy spawn points.
    Spawn,
}

impl EntityKind {
    /// Stable lowercase name, used in instance and LOD identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Prop => "prop",
            Self::Light => "light",
            Self::Door => "door",
            Self::Trigger => "trigger",
            Self::Spawn => "spawn",
        }
    }
}

/// Door position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    /// Passable.
    Open,
    /// Closed but operable.
    #[default]
    Closed,
    /// Closed and requires a key or switch.
    Locked,
    /// Blown open, cannot be closed again.
    Breached,
}

/// Structural piece.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralComponent {
    /// Whether navigation treats this piece as an obstacle.
    pub blocks_navigation: bool,
}

/// Loot slot on a prop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootComponent {
    /// Item rolled from the assemblage loot table, if any.
    pub item: Option<String>,
    /// Whether the player picked it up.
    pub collected: bool,
}

/// Prop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropComponent {
    /// Loot slot, absent for purely decorative props.
    pub loot: Option<LootComponent>,
}

/// Point light.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightComponent {
    /// Linear RGB color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Falloff range in world units.
    pub range: f32,
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            range: 8.0,
        }
    }
}

/// Door.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorComponent {
    /// Current door position.
    pub state: DoorState,
}

/// Gameplay trigger volume.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerComponent {
    /// Event raised when the trigger fires.
    pub event: String,
    /// Whether the trigger has already fired.
    pub fired: bool,
}

/// Enemy spawn point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnComponent {
    /// Enemy type, rolled from the assemblage spawn table when unset.
    pub enemy: Option<String>,
    /// Whether the spawned enemy was killed.
    pub dead: bool,
    /// Last known world position of the enemy.
    pub position: Option<Vec3>,
}

/// Component bag for one streamed entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Components {
    /// Structural piece.
    Structural(StructuralComponent),
    /// Prop, optionally lootable.
    Prop(PropComponent),
    /// Light source.
    Light(LightComponent),
    /// Door.
    Door(DoorComponent),
    /// Trigger volume.
    Trigger(TriggerComponent),
    /// Enemy spawn point.
    Spawn(SpawnComponent),
}

impl Components {
    /// Entity category of this bag.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Structural(_) => EntityKind::Structural,
            Self::Prop(_) => EntityKind::Prop,
            Self::Light(_) => EntityKind::Light,
            Self::Door(_) => EntityKind::Door,
            Self::Trigger(_) => EntityKind::Trigger,
            Self::Spawn(_) => EntityKind::Spawn,
        }
    }

    /// Door state, for door entities.
    #[must_use]
    pub fn door_state(&self) -> Option<DoorState> {
        match self {
            Self::Door(door) => Some(door.state),
            _ => None,
        }
    }

    /// Loot slot, for lootable props.
    #[must_use]
    pub fn loot(&self) -> Option<&LootComponent> {
        match self {
            Self::Prop(prop) => prop.loot.as_ref(),
            _ => None,
        }
    }

    /// Mutable loot slot, for lootable props.
    pub fn loot_mut(&mut self) -> Option<&mut LootComponent> {
        match self {
            Self::Prop(prop) => prop.loot.as_mut(),
            _ => None,
        }
    }

    /// Spawn point data.
    #[must_use]
    pub fn spawn(&self) -> Option<&SpawnComponent> {
        match self {
            Self::Spawn(spawn) => Some(spawn),
            _ => None,
        }
    }

    /// Mutable spawn point data.
    pub fn spawn_mut(&mut self) -> Option<&mut SpawnComponent> {
        match self {
            Self::Spawn(spawn) => Some(spawn),
            _ => None,
        }
    }

    /// Trigger fired flag, for triggers.
    #[must_use]
    pub fn trigger_fired(&self) -> Option<bool> {
        match self {
            Self::Trigger(trigger) => Some(trigger.fired),
            _ => None,
        }
    }

    /// Overwrites the door state. No-op for other kinds.
    pub fn set_door_state(&mut self, state: DoorState) {
        if let Self::Door(door) = self {
            door.state = state;
        }
    }

    /// Overwrites the trigger fired flag. No-op for other kinds.
    pub fn set_trigger_fired(&mut self, fired: bool) {
        if let Self::Trigger(trigger) = self {
            trigger.fired = fired;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let door = Components::Door(DoorComponent::default());
        assert_eq!(door.kind(), EntityKind::Door);
        assert_eq!(door.door_state(), Some(DoorState::Closed));
        assert_eq!(door.trigger_fired(), None);
    }

    #[test]
    fn test_setters_ignore_other_kinds() {
        let mut light = Components::Light(LightComponent::default());
        light.set_door_state(DoorState::Open);
        light.set_trigger_fired(true);
        assert_eq!(light, Components::Light(LightComponent::default()));

        let mut trigger = Components::Trigger(TriggerComponent::default());
        trigger.set_trigger_fired(true);
        assert_eq!(trigger.trigger_fired(), Some(true));
    }

    #[test]
    fn test_internally_tagged_json() {
        let parsed: Components =
            serde_json::from_str(r#"{"kind":"door","state":"locked"}"#).unwrap();
        assert_eq!(parsed.door_state(), Some(DoorState::Locked));

        let prop: Components = serde_json::from_str(r#"{"kind":"prop","loot":{}}"#).unwrap();
        assert_eq!(prop.loot().map(|l| l.collected), Some(false));
    }
}
