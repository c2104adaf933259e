//! # Meridian Procedural Generation
//!
//! Deterministic chunk content for an open, effectively infinite world.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: `(world seed, chunk, environment)` always yields the same layout
//! 2. **Data-driven**: every placement references a registered assemblage
//! 3. **Additive**: layout policies only append `PlacedAssemblage` entries
//! 4. **Serializable**: `ChunkState` is the unit exchanged with persistence
//!
//! ## Core Components
//!
//! - `WorldSeed` / `SeededRng`: seed derivation and the reproducible stream
//! - `ChunkCoord`: square cell addressing
//! - `AssemblageRegistry`: immutable prefab catalog, built once at startup
//! - `ChunkState`: generated content plus mutable world facts
//! - `ChunkGenerator`: picks the environment's layout policy and runs it
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meridian_procedural::{AssemblageRegistry, ChunkCoord, ChunkGenerator, WorldSeed};
//!
//! let registry = Arc::new(AssemblageRegistry::builtin()?);
//! let generator = ChunkGenerator::new(WorldSeed::new(1234), registry);
//!
//! let state = generator.generate(ChunkCoord::new(0, 0), "surface_rocky");
//! assert_eq!(state.assemblages[0].assemblage_type, "terrain_flat");
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod assemblage;
pub mod chunk;
pub mod error;
pub mod generator;
pub mod layout;
pub mod registry;
pub mod seed;
pub mod state;

pub use assemblage::{
    AssemblageDefinition, ConnectionKind, ConnectionPoint, Direction, EntityDefinition,
    EnvironmentDefinition, Footprint, LayoutKind, Navigation, SpawnEntry, SpawnTable,
};
pub use chunk::{ChunkCoord, DEFAULT_CHUNK_SIZE};
pub use error::{ProceduralError, ProceduralResult};
pub use generator::ChunkGenerator;
pub use layout::{CorridorLayout, LayoutPolicy, SurfaceLayout, TunnelLayout};
pub use registry::{AssemblageRegistry, RegistryBuilder};
pub use seed::{derive_seed, SeededRng, WorldSeed};
pub use state::{
    entity_key, now_millis, ChunkState, EnemyState, LootState, PlacedAssemblage, Rotation,
    TriggerState,
};
