//! # Chunk Generator
//!
//! Turns `(world seed, chunk coordinate, environment)` into a fresh
//! `ChunkState`. The generator only chooses placements; entity keys are
//! filled in later when the chunk is spawned.
//!
//! Generation never fails. An unknown environment, or one without
//! registered assemblages, yields an empty but valid state and a warning.

use std::sync::Arc;

use crate::chunk::ChunkCoord;
use crate::layout::policy_for;
use crate::registry::AssemblageRegistry;
use crate::seed::{SeededRng, WorldSeed};
use crate::state::{now_millis, ChunkState};

/// Default edge length of the per-chunk placement grid.
pub const DEFAULT_GRID_CELLS: u32 = 4;

/// Deterministic chunk content generator.
#[derive(Clone, Debug)]
pub struct ChunkGenerator {
    seed: WorldSeed,
    registry: Arc<AssemblageRegistry>,
    grid_cells: u32,
}

impl ChunkGenerator {
    /// Creates a generator over a shared registry.
    #[must_use]
    pub fn new(seed: WorldSeed, registry: Arc<AssemblageRegistry>) -> Self {
        Self {
            seed,
            registry,
            grid_cells: DEFAULT_GRID_CELLS,
        }
    }

    /// Overrides the placement grid size.
    #[must_use]
    pub fn with_grid_cells(mut self, grid_cells: u32) -> Self {
        self.grid_cells = grid_cells.max(1);
        self
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<AssemblageRegistry> {
        &self.registry
    }

    /// Placement grid edge length.
    #[must_use]
    pub const fn grid_cells(&self) -> u32 {
        self.grid_cells
    }

    /// Generates a chunk stamped with the current time.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord, environment: &str) -> ChunkState {
        self.generate_at(coord, environment, now_millis())
    }

    /// Generates a chunk stamped with `timestamp`.
    #[must_use]
    pub fn generate_at(&self, coord: ChunkCoord, environment: &str, timestamp: u64) -> ChunkState {
        let chunk_seed = self.seed.chunk_seed(coord);
        let mut state = ChunkState::new(coord, environment, chunk_seed, timestamp);

        let Some(env) = self.registry.environment(environment) else {
            tracing::warn!(x = coord.x, z = coord.z, environment, "unknown environment, chunk left empty");
            return state;
        };
        let definitions = self.registry.for_environment(environment);
        if definitions.is_empty() {
            tracing::warn!(x = coord.x, z = coord.z, environment, "environment has no assemblages, chunk left empty");
            return state;
        }

        let mut rng = SeededRng::new(chunk_seed);
        let placements = policy_for(env.layout).layout(&mut rng, &definitions, self.grid_cells);
        state.assemblages.extend(placements);

        tracing::debug!(
            x = coord.x,
            z = coord.z,
            environment,
            seed = chunk_seed,
            placements = state.assemblages.len(),
            "chunk generated"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Rotation;

    fn generator(seed: u64) -> ChunkGenerator {
        ChunkGenerator::new(WorldSeed::new(seed), Arc::new(AssemblageRegistry::builtin().unwrap()))
    }

    #[test]
    fn test_unknown_environment_is_empty() {
        let state = generator(1).generate_at(ChunkCoord::new(2, 2), "nowhere", 10);
        assert!(state.assemblages.is_empty());
        assert_eq!(state.environment, "nowhere");
        assert_eq!(state.first_visited, 10);
    }

    #[test]
    fn test_registered_environment_without_assemblages_is_empty() {
        let registry = AssemblageRegistry::from_toml_str(
            r#"
            [[environment]]
            id = "empty_hangar"
            layout = "corridor"
            "#,
        )
        .unwrap();
        assert!(registry.environment("empty_hangar").is_some());

        let gen = ChunkGenerator::new(WorldSeed::new(42), Arc::new(registry));
        let coord = ChunkCoord::new(3, -1);
        let state = gen.generate_at(coord, "empty_hangar", 25);

        assert!(state.assemblages.is_empty());
        assert_eq!(state.environment, "empty_hangar");
        assert_eq!(state.coord(), coord);
        assert_eq!(state.seed, WorldSeed::new(42).chunk_seed(coord));
        assert_eq!((state.first_visited, state.last_visited), (25, 25));
        assert!(!state.fully_explored);
        assert!(state.to_json().is_ok());
    }

    #[test]
    fn test_seed_recorded() {
        let gen = generator(99);
        let coord = ChunkCoord::new(-4, 7);
        let state = gen.generate_at(coord, "cave_tunnels", 0);
        assert_eq!(state.seed, WorldSeed::new(99).chunk_seed(coord));
        assert_eq!(state.coord(), coord);
        assert!(state.assemblages.iter().all(|p| p.entity_ids.is_empty()));
    }

    #[test]
    fn test_surface_chunk_has_terrain_first() {
        let state = generator(1234).generate_at(ChunkCoord::new(0, 0), "surface_rocky", 0);
        let terrain = &state.assemblages[0];
        assert_eq!(terrain.assemblage_type, "terrain_flat");
        assert_eq!((terrain.grid_x, terrain.grid_z, terrain.rotation), (0, 0, Rotation::R0));
    }

    #[test]
    fn test_grid_cells_bound_placements() {
        let gen = generator(5).with_grid_cells(2);
        for x in 0..20 {
            let state = gen.generate_at(ChunkCoord::new(x, 0), "surface_rocky", 0);
            assert!(state.assemblages.iter().all(|p| p.grid_x < 2 && p.grid_z < 2));
        }
    }
}
