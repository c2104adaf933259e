//! # Chunk State
//!
//! The serializable snapshot of one chunk: what was generated there and
//! which world facts changed since (doors opened, enemies killed, loot
//! collected, triggers fired).
//!
//! A `ChunkState` is created once by the generator. From then on it is
//! only mutated by harvesting live entities and written back. The JSON
//! shape is read by external tooling, so field names are fixed:
//!
//! ```json
//! {
//!   "chunkX": 0, "chunkZ": 0, "environment": "surface_rocky", "seed": 91823,
//!   "assemblages": [{"type": "terrain_flat", "gridX": 0, "gridZ": 0,
//!                    "rotation": 0, "entityIds": ["0_0_0_0"]}],
//!   "doors": {}, "loot": [], "enemies": [], "triggers": [],
//!   "firstVisited": 1700000000000, "lastVisited": 1700000000000,
//!   "fullyExplored": false
//! }
//! ```
//!
//! ## Entity Keys
//!
//! Facts are keyed by a stable string derived from the chunk coordinate,
//! the placement index and the entity index inside the assemblage
//! (`entity_key`). Runtime entity handles change on every respawn, so they
//! never reach the snapshot.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use meridian_core::{DoorState, Vec3};

use crate::chunk::ChunkCoord;
use crate::error::{ProceduralError, ProceduralResult};

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Stable key of one spawned entity: `<x>_<z>_<placement>_<entity>`.
#[must_use]
pub fn entity_key(coord: ChunkCoord, placement: usize, entity: usize) -> String {
    format!("{}_{}_{placement}_{entity}", coord.x, coord.z)
}

/// One of the four orthogonal rotations around the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// Quarter turn.
    R90,
    /// Half turn.
    R180,
    /// Three quarter turns.
    R270,
}

impl Rotation {
    /// All rotations, in quarter-turn order.
    pub const ALL: [Self; 4] = [Self::R0, Self::R90, Self::R180, Self::R270];

    /// Number of quarter turns (0-3).
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::R0 => 0,
            Self::R90 => 1,
            Self::R180 => 2,
            Self::R270 => 3,
        }
    }

    /// Rotation in degrees.
    #[must_use]
    pub fn degrees(self) -> f32 {
        f32::from(self.quarter_turns()) * 90.0
    }
}

impl TryFrom<u8> for Rotation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| format!("rotation index out of range: {value}"))
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> Self {
        rotation.quarter_turns()
    }
}

/// An assemblage placed at a grid cell of a chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedAssemblage {
    /// Registered assemblage type.
    #[serde(rename = "type")]
    pub assemblage_type: String,
    /// Grid cell along X.
    pub grid_x: i32,
    /// Grid cell along Z.
    pub grid_z: i32,
    /// Orientation.
    pub rotation: Rotation,
    /// Keys of the entities spawned for this placement, filled at spawn.
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

impl PlacedAssemblage {
    /// Creates a placement with no spawned entities yet.
    #[must_use]
    pub fn new(assemblage_type: impl Into<String>, grid_x: i32, grid_z: i32, rotation: Rotation) -> Self {
        Self {
            assemblage_type: assemblage_type.into(),
            grid_x,
            grid_z,
            rotation,
            entity_ids: Vec::new(),
        }
    }
}

/// Persisted enemy facts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyState {
    /// Entity key.
    pub entity_id: String,
    /// Whether the enemy was killed.
    pub dead: bool,
    /// Last known world position.
    #[serde(default)]
    pub position: Option<Vec3>,
}

/// Persisted loot facts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootState {
    /// Entity key.
    pub entity_id: String,
    /// Whether the loot was picked up.
    pub collected: bool,
}

/// Persisted trigger facts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerState {
    /// Entity key.
    pub entity_id: String,
    /// Whether the trigger fired.
    pub fired: bool,
}

/// Persisted snapshot of one chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkState {
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Z coordinate.
    pub chunk_z: i32,
    /// Environment the chunk was generated for.
    pub environment: String,
    /// Chunk seed used for generation.
    pub seed: u32,
    /// Placements, in generation order.
    pub assemblages: Vec<PlacedAssemblage>,
    /// Door states by entity key.
    #[serde(default)]
    pub doors: BTreeMap<String, DoorState>,
    /// Loot facts.
    #[serde(default)]
    pub loot: Vec<LootState>,
    /// Enemy facts.
    #[serde(default)]
    pub enemies: Vec<EnemyState>,
    /// Trigger facts.
    #[serde(default)]
    pub triggers: Vec<TriggerState>,
    /// First visit, ms since epoch.
    pub first_visited: u64,
    /// Latest visit, ms since epoch.
    pub last_visited: u64,
    /// Every trigger in the chunk has fired.
    #[serde(default)]
    pub fully_explored: bool,
}

impl ChunkState {
    /// Creates an empty snapshot stamped with `timestamp`.
    #[must_use]
    pub fn new(coord: ChunkCoord, environment: impl Into<String>, seed: u32, timestamp: u64) -> Self {
        Self {
            chunk_x: coord.x,
            chunk_z: coord.z,
            environment: environment.into(),
            seed,
            assemblages: Vec::new(),
            doors: BTreeMap::new(),
            loot: Vec::new(),
            enemies: Vec::new(),
            triggers: Vec::new(),
            first_visited: timestamp,
            last_visited: timestamp,
            fully_explored: false,
        }
    }

    /// Chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_z)
    }

    /// Persistence key: `chunk_<environment>_<x>_<z>`.
    #[must_use]
    pub fn storage_key_for(environment: &str, coord: ChunkCoord) -> String {
        format!("chunk_{environment}_{}_{}", coord.x, coord.z)
    }

    /// Persistence key of this snapshot.
    #[must_use]
    pub fn storage_key(&self) -> String {
        Self::storage_key_for(&self.environment, self.coord())
    }

    /// Serializes to the persisted JSON shape.
    ///
    /// # Errors
    ///
    /// Returns `StateEncode` if serialization fails.
    pub fn to_json(&self) -> ProceduralResult<String> {
        serde_json::to_string(self).map_err(|e| ProceduralError::StateEncode(e.to_string()))
    }

    /// Parses the persisted JSON shape.
    ///
    /// # Errors
    ///
    /// Returns `StateDecode` if the text is not a valid snapshot.
    pub fn from_json(text: &str) -> ProceduralResult<Self> {
        serde_json::from_str(text).map_err(|e| ProceduralError::StateDecode(e.to_string()))
    }

    /// Number of entity keys across all placements.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.assemblages.iter().map(|p| p.entity_ids.len()).sum()
    }

    /// Refreshes `last_visited`.
    pub fn touch(&mut self, timestamp: u64) {
        self.last_visited = timestamp.max(self.first_visited);
    }

    /// Stored door state.
    #[must_use]
    pub fn door(&self, key: &str) -> Option<DoorState> {
        self.doors.get(key).copied()
    }

    /// Records a door state.
    pub fn record_door(&mut self, key: &str, state: DoorState) {
        self.doors.insert(key.to_owned(), state);
    }

    /// Stored enemy facts.
    #[must_use]
    pub fn enemy(&self, key: &str) -> Option<&EnemyState> {
        self.enemies.iter().find(|e| e.entity_id == key)
    }

    /// Records enemy facts, replacing any earlier record.
    pub fn record_enemy(&mut self, key: &str, dead: bool, position: Option<Vec3>) {
        match self.enemies.iter_mut().find(|e| e.entity_id == key) {
            Some(existing) => {
                existing.dead = dead;
                existing.position = position;
            }
            None => self.enemies.push(EnemyState {
                entity_id: key.to_owned(),
                dead,
                position,
            }),
        }
    }

    /// Stored loot facts.
    #[must_use]
    pub fn loot(&self, key: &str) -> Option<&LootState> {
        self.loot.iter().find(|l| l.entity_id == key)
    }

    /// Records loot facts.
    pub fn record_loot(&mut self, key: &str, collected: bool) {
        match self.loot.iter_mut().find(|l| l.entity_id == key) {
            Some(existing) => existing.collected = collected,
            None => self.loot.push(LootState {
                entity_id: key.to_owned(),
                collected,
            }),
        }
    }

    /// Stored trigger facts.
    #[must_use]
    pub fn trigger(&self, key: &str) -> Option<&TriggerState> {
        self.triggers.iter().find(|t| t.entity_id == key)
    }

    /// Records trigger facts.
    pub fn record_trigger(&mut self, key: &str, fired: bool) {
        match self.triggers.iter_mut().find(|t| t.entity_id == key) {
            Some(existing) => existing.fired = fired,
            None => self.triggers.push(TriggerState {
                entity_id: key.to_owned(),
                fired,
            }),
        }
    }

    /// Recomputes `fully_explored` from the recorded triggers.
    ///
    /// A chunk without triggers counts as explored.
    pub fn refresh_explored(&mut self) {
        self.fully_explored = self.triggers.iter().all(|t| t.fired);
    }
}
