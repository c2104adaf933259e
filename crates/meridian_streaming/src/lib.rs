//! # Meridian Streaming
//!
//! Streams an effectively infinite world in fixed-size chunks around a
//! moving observer.
//!
//! ## Design Principles
//!
//! 1. **Stored state wins**: a chunk with a persisted snapshot is never regenerated
//! 2. **Bounded ticks**: unloads first, then at most `batch_size` loads
//! 3. **Hysteresis**: `unload_radius > render_radius`, no boundary thrash
//! 4. **No leaks**: a chunk releases everything it spawned, including
//!    chunks whose load was cancelled
//! 5. **Degrade, don't fail**: errors become absent content and a log line
//!
//! ## Core Components
//!
//! - `ChunkManager`: tick policy, load/unload, reload, environment switch, dispose
//! - `Bridges`: persistence, asset, LOD, entity and scene collaborators
//! - `LoadedChunk`: runtime resources owned by one chunk
//! - `HeadlessBackend`: in-process bridges for tests and tools
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meridian_core::Vec3;
//! use meridian_procedural::{AssemblageRegistry, WorldSeed};
//! use meridian_streaming::{headless::HeadlessBackend, ChunkManager, StreamingConfig};
//!
//! let backend = HeadlessBackend::new();
//! let manager = ChunkManager::new(
//!     StreamingConfig::production(),
//!     WorldSeed::new(1234),
//!     Arc::new(AssemblageRegistry::builtin()?),
//!     backend.bridges(),
//!     "surface_rocky",
//! )?;
//!
//! // Once per frame
//! manager.update(Vec3::new(player_x, 0.0, player_z)).await;
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod harvest;
pub mod headless;
pub mod lifecycle;
pub mod loaded;
pub mod manager;
pub mod spawn;

pub use bridge::{
    AssetBridge, Bridges, EntityBridge, LodBridge, PersistenceBridge, RenderFlags, SceneBridge,
};
pub use config::StreamingConfig;
pub use error::{BridgeError, BridgeResult, StreamingError, StreamingResult};
pub use lifecycle::{ChunkPhase, LifecycleToken};
pub use loaded::{BindingState, LoadedChunk, MeshBinding, SpawnedEntity};
pub use manager::{ChunkManager, StreamingStats};
