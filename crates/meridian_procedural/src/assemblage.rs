//! # Assemblage Definitions
//!
//! An assemblage is a reusable prefab (room, corridor segment, terrain
//! tile, rock cluster) authored once and placed many times. Definitions
//! are static data: they are parsed at startup, validated by the registry
//! and never mutated afterward.
//!
//! ## TOML Shape
//!
//! ```toml
//! [[assemblage]]
//! type = "corridor_straight"
//! environment = "station_interior"
//! tags = ["corridor"]
//! footprint = { width = 1, depth = 1, height = 1 }
//!
//! [[assemblage.connection]]
//! name = "fore"
//! direction = "north"
//! kind = "open"
//!
//! [[assemblage.entity]]
//! asset = "models/station/corridor_straight.glb"
//! components = { kind = "structural" }
//! ```

use serde::{Deserialize, Serialize};

use meridian_core::{Components, EntityKind, Transform};

use crate::seed::SeededRng;

/// Placement heuristic used by an environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// 2-4 corridor/airlock segments threaded across the sub-grid.
    Corridor,
    /// One base terrain segment plus scattered obstacle clusters.
    Surface,
    /// 1-3 tunnel/chamber segments.
    Tunnel,
}

/// An environment: a family of assemblages sharing one layout policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    /// Environment identifier (also part of persistence keys).
    pub id: String,
    /// Layout policy used to fill chunks of this environment.
    pub layout: LayoutKind,
}

/// Grid footprint in grid units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Extent along X.
    pub width: u32,
    /// Extent along Z.
    pub depth: u32,
    /// Vertical extent.
    pub height: u32,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            width: 1,
            depth: 1,
            height: 1,
        }
    }
}

/// Side of the footprint a connection sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// -Z side.
    North,
    /// +X side.
    East,
    /// +Z side.
    South,
    /// -X side.
    West,
    /// Ceiling.
    Up,
    /// Floor.
    Down,
}

/// What a connection point lets through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Doorway, usually paired with a door entity.
    Door,
    /// Open passage.
    Open,
    /// Solid wall, no passage.
    Wall,
    /// Permanently sealed passage.
    Sealed,
}

/// Named connection point on an assemblage's footprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    /// Connection name, unique within the assemblage.
    pub name: String,
    /// Footprint side.
    pub direction: Direction,
    /// Passage kind.
    pub kind: ConnectionKind,
    /// Offset along the side, in grid units.
    #[serde(default)]
    pub offset: i32,
}

/// One entity inside an assemblage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Optional display name, used for instance names.
    #[serde(default)]
    pub name: Option<String>,
    /// Renderable asset path, if the entity has a mesh.
    #[serde(default)]
    pub asset: Option<String>,
    /// Transform relative to the assemblage root.
    #[serde(default)]
    pub transform: Transform,
    /// Component data handed to the entity bridge.
    pub components: Components,
}

impl EntityDefinition {
    /// Entity category, from the component bag.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.components.kind()
    }
}

/// Weighted entry of a spawn or loot table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Enemy type or item identifier.
    pub id: String,
    /// Relative weight.
    pub weight: u32,
}

/// Weighted table rolled with the seeded generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTable {
    /// Table entries.
    #[serde(default)]
    pub entries: Vec<SpawnEntry>,
}

impl SpawnTable {
    /// Sum of entry weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.weight)).sum()
    }

    /// Rolls one entry.
    pub fn roll(&self, rng: &mut SeededRng) -> Option<&str> {
        let weights: Vec<u32> = self.entries.iter().map(|e| e.weight).collect();
        rng.pick_weighted(&weights)
            .map(|i| self.entries[i].id.as_str())
    }
}

/// Navigation metadata.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    /// Whether agents can walk through the footprint.
    pub walkable: bool,
    /// Relative traversal cost.
    #[serde(default = "default_cost")]
    pub cost: f32,
}

fn default_cost() -> f32 {
    1.0
}

/// A prefab room/segment placeable within a chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssemblageDefinition {
    /// Type name, unique across the registry.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Environment this assemblage belongs to.
    pub environment: String,
    /// Grid footprint.
    #[serde(default)]
    pub footprint: Footprint,
    /// Connection points.
    #[serde(default, rename = "connection")]
    pub connections: Vec<ConnectionPoint>,
    /// Entities spawned for every placement, in order.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDefinition>,
    /// Enemy table rolled by spawn points without a fixed enemy.
    #[serde(default)]
    pub enemy_table: Option<SpawnTable>,
    /// Loot table rolled by lootable props without a fixed item.
    #[serde(default)]
    pub loot_table: Option<SpawnTable>,
    /// Navigation metadata.
    #[serde(default)]
    pub navigation: Option<Navigation>,
    /// Free-form tags, used by layout policies to pick roles.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AssemblageDefinition {
    /// Returns true if the assemblage carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Distinct asset paths referenced by this assemblage.
    pub fn asset_paths(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.entities
            .iter()
            .filter_map(|e| e.asset.as_deref())
            .filter(move |path| {
                if seen.contains(path) {
                    false
                } else {
                    seen.push(*path);
                    true
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_table_roll_respects_zero_weights() {
        let table = SpawnTable {
            entries: vec![
                SpawnEntry { id: "never".into(), weight: 0 },
                SpawnEntry { id: "always".into(), weight: 5 },
            ],
        };
        let mut rng = SeededRng::new(3);
        for _ in 0..50 {
            assert_eq!(table.roll(&mut rng), Some("always"));
        }
        assert_eq!(SpawnTable::default().roll(&mut rng), None);
    }

    #[test]
    fn test_asset_paths_are_distinct() {
        let def: AssemblageDefinition = toml::from_str(
            r#"
            type = "rock_cluster"
            environment = "surface_rocky"

            [[entity]]
            asset = "rock.glb"
            components = { kind = "structural" }

            [[entity]]
            asset = "rock.glb"
            components = { kind = "structural" }

            [[entity]]
            components = { kind = "trigger", event = "x" }
            "#,
        )
        .unwrap();
        assert_eq!(def.asset_paths().collect::<Vec<_>>(), vec!["rock.glb"]);
        assert_eq!(def.footprint, Footprint::default());
        assert_eq!(def.entities[2].kind(), EntityKind::Trigger);
    }
}
