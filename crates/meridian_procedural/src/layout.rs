//! # Layout Policies
//!
//! Environment-specific placement heuristics. A policy receives the
//! chunk's seeded generator and the environment's definitions (in
//! registration order) and returns the placements to append. Policies
//! have no side effects and read nothing but their inputs, so the same
//! seed always produces the same list.
//!
//! | policy          | content                                           |
//! |-----------------|---------------------------------------------------|
//! | `CorridorLayout`| 2-4 corridor segments on one lane, airlocks at ends|
//! | `SurfaceLayout` | base terrain at (0,0) plus 0-5 obstacle clusters   |
//! | `TunnelLayout`  | 1-3 tunnel/chamber segments walking from center    |

use crate::assemblage::{AssemblageDefinition, LayoutKind};
use crate::seed::SeededRng;
use crate::state::{PlacedAssemblage, Rotation};

/// Placement heuristic for one environment.
pub trait LayoutPolicy: Send + Sync {
    /// Produces placements for a chunk.
    ///
    /// `grid_cells` is the edge length of the chunk's placement grid.
    fn layout(
        &self,
        rng: &mut SeededRng,
        definitions: &[&AssemblageDefinition],
        grid_cells: u32,
    ) -> Vec<PlacedAssemblage>;
}

/// Returns the policy for a layout kind.
#[must_use]
pub fn policy_for(kind: LayoutKind) -> &'static dyn LayoutPolicy {
    match kind {
        LayoutKind::Corridor => &CorridorLayout,
        LayoutKind::Surface => &SurfaceLayout,
        LayoutKind::Tunnel => &TunnelLayout,
    }
}

fn tagged<'a>(definitions: &[&'a AssemblageDefinition], tags: &[&str]) -> Vec<&'a AssemblageDefinition> {
    definitions
        .iter()
        .copied()
        .filter(|d| tags.iter().any(|t| d.has_tag(t)))
        .collect()
}

fn last_cell(grid_cells: u32) -> i32 {
    i32::try_from(grid_cells.max(1) - 1).unwrap_or(i32::MAX)
}

fn random_rotation(rng: &mut SeededRng) -> Rotation {
    let turns = rng.range_i32(0, 3);
    Rotation::ALL[usize::try_from(turns).unwrap_or(0)]
}

/// Threads corridor segments along one lane of the grid.
///
/// The axis and lane are random. Segments along X are rotated a quarter
/// turn. Either end may become an airlock when the environment has one.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorridorLayout;

impl LayoutPolicy for CorridorLayout {
    fn layout(
        &self,
        rng: &mut SeededRng,
        definitions: &[&AssemblageDefinition],
        grid_cells: u32,
    ) -> Vec<PlacedAssemblage> {
        let corridors = tagged(definitions, &["corridor"]);
        let airlocks = tagged(definitions, &["airlock"]);
        if corridors.is_empty() && airlocks.is_empty() {
            return Vec::new();
        }

        let segments = rng.range_i32(2, 4).min(last_cell(grid_cells) + 1);
        let along_x = rng.chance(0.5);
        let lane = rng.range_i32(0, last_cell(grid_cells));
        let rotation = if along_x { Rotation::R90 } else { Rotation::R0 };

        let mut placed = Vec::with_capacity(usize::try_from(segments).unwrap_or(0));
        for step in 0..segments {
            let at_end = step == 0 || step == segments - 1;
            let use_airlock = !airlocks.is_empty() && (corridors.is_empty() || (at_end && rng.chance(0.5)));
            let pool = if use_airlock { &airlocks } else { &corridors };
            let Some(def) = rng.pick(pool) else { continue };

            let (grid_x, grid_z) = if along_x { (step, lane) } else { (lane, step) };
            placed.push(PlacedAssemblage::new(def.type_name.as_str(), grid_x, grid_z, rotation));
        }
        placed
    }
}

/// Base terrain plus scattered obstacles.
///
/// The first definition tagged `terrain` always lands at cell (0,0) with no
/// rotation. Obstacle clusters pick random cells and rotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceLayout;

/// Upper bound of scattered obstacle clusters per chunk.
const MAX_OBSTACLES: i32 = 5;

impl LayoutPolicy for SurfaceLayout {
    fn layout(
        &self,
        rng: &mut SeededRng,
        definitions: &[&AssemblageDefinition],
        grid_cells: u32,
    ) -> Vec<PlacedAssemblage> {
        let mut placed = Vec::new();
        if let Some(terrain) = definitions.iter().find(|d| d.has_tag("terrain")) {
            placed.push(PlacedAssemblage::new(terrain.type_name.as_str(), 0, 0, Rotation::R0));
        }

        let obstacles = tagged(definitions, &["obstacle"]);
        let count = rng.range_i32(0, MAX_OBSTACLES);
        if obstacles.is_empty() {
            return placed;
        }

        let last = last_cell(grid_cells);
        for _ in 0..count {
            let Some(def) = rng.pick(&obstacles) else { break };
            let grid_x = rng.range_i32(0, last);
            let grid_z = rng.range_i32(0, last);
            let rotation = random_rotation(rng);
            placed.push(PlacedAssemblage::new(def.type_name.as_str(), grid_x, grid_z, rotation));
        }
        placed
    }
}

/// Tunnel segments walking outward from the grid center.
///
/// Each step moves to a random unvisited orthogonal neighbor; the walk
/// stops early when boxed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TunnelLayout;

const STEPS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

impl LayoutPolicy for TunnelLayout {
    fn layout(
        &self,
        rng: &mut SeededRng,
        definitions: &[&AssemblageDefinition],
        grid_cells: u32,
    ) -> Vec<PlacedAssemblage> {
        let pool = tagged(definitions, &["tunnel", "chamber"]);
        if pool.is_empty() {
            return Vec::new();
        }

        let last = last_cell(grid_cells);
        let segments = rng.range_i32(1, 3);
        let mut cell = (last / 2, last / 2);
        let mut visited = vec![cell];
        let mut placed = Vec::new();

        for step in 0..segments {
            let Some(def) = rng.pick(&pool) else { break };
            let rotation = random_rotation(rng);
            placed.push(PlacedAssemblage::new(def.type_name.as_str(), cell.0, cell.1, rotation));

            if step == segments - 1 {
                break;
            }
            let mut directions = STEPS;
            rng.shuffle(&mut directions);
            let next = directions
                .iter()
                .map(|(dx, dz)| (cell.0 + dx, cell.1 + dz))
                .find(|&(x, z)| (0..=last).contains(&x) && (0..=last).contains(&z) && !visited.contains(&(x, z)));
            match next {
                Some(next) => {
                    visited.push(next);
                    cell = next;
                }
                None => break,
            }
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AssemblageRegistry;

    fn env_defs<'a>(registry: &'a AssemblageRegistry, env: &str) -> Vec<&'a AssemblageDefinition> {
        registry.for_environment(env)
    }

    #[test]
    fn test_surface_layout_rules() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let defs = env_defs(&registry, "surface_rocky");
        for seed in 0..200 {
            let placed = SurfaceLayout.layout(&mut SeededRng::new(seed), &defs, 4);
            assert_eq!(placed[0], PlacedAssemblage::new("terrain_flat", 0, 0, Rotation::R0));
            let rocks = &placed[1..];
            assert!(rocks.len() <= 5);
            for rock in rocks {
                assert_eq!(rock.assemblage_type, "rock_cluster");
                assert!((0..4).contains(&rock.grid_x));
                assert!((0..4).contains(&rock.grid_z));
            }
        }
    }

    #[test]
    fn test_corridor_layout_stays_on_one_lane() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let defs = env_defs(&registry, "station_interior");
        for seed in 0..200 {
            let placed = CorridorLayout.layout(&mut SeededRng::new(seed), &defs, 4);
            assert!((2..=4).contains(&placed.len()));
            let first = &placed[0];
            let along_x = first.rotation == Rotation::R90;
            for (i, p) in placed.iter().enumerate() {
                let step = i32::try_from(i).unwrap();
                if along_x {
                    assert_eq!((p.grid_x, p.grid_z), (step, first.grid_z));
                } else {
                    assert_eq!((p.grid_x, p.grid_z), (first.grid_x, step));
                }
                let def = registry.get(&p.assemblage_type).unwrap();
                let is_end = i == 0 || i == placed.len() - 1;
                assert!(def.has_tag("corridor") || (is_end && def.has_tag("airlock")));
            }
        }
    }

    #[test]
    fn test_tunnel_layout_walks_unvisited_cells() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let defs = env_defs(&registry, "cave_tunnels");
        for seed in 0..200 {
            let placed = TunnelLayout.layout(&mut SeededRng::new(seed), &defs, 4);
            assert!((1..=3).contains(&placed.len()));
            assert_eq!((placed[0].grid_x, placed[0].grid_z), (1, 1));
            for pair in placed.windows(2) {
                let d = (pair[0].grid_x - pair[1].grid_x).abs() + (pair[0].grid_z - pair[1].grid_z).abs();
                assert_eq!(d, 1);
            }
            let mut cells: Vec<_> = placed.iter().map(|p| (p.grid_x, p.grid_z)).collect();
            cells.sort_unstable();
            cells.dedup();
            assert_eq!(cells.len(), placed.len(), "a tunnel never revisits a cell");
        }
    }

    #[test]
    fn test_policies_tolerate_missing_roles() {
        let mut rng = SeededRng::new(1);
        assert!(CorridorLayout.layout(&mut rng, &[], 4).is_empty());
        assert!(SurfaceLayout.layout(&mut rng, &[], 4).is_empty());
        assert!(TunnelLayout.layout(&mut rng, &[], 4).is_empty());
    }

    #[test]
    fn test_single_cell_grid() {
        let registry = AssemblageRegistry::builtin().unwrap();
        let defs = env_defs(&registry, "station_interior");
        let placed = CorridorLayout.layout(&mut SeededRng::new(3), &defs, 1);
        assert_eq!(placed.len(), 1);
        assert_eq!((placed[0].grid_x, placed[0].grid_z), (0, 0));
    }
}
