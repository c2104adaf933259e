//! # Stream Walk
//!
//! Walks an observer across the world on the headless backend and prints
//! what the chunk manager did along the way.
//!
//! Usage: `stream_walk [environment] [chunks]`

use std::sync::Arc;
use std::time::Instant;

use meridian_core::{DoorState, EntityKind, Vec3};
use meridian_procedural::{AssemblageRegistry, WorldSeed};
use meridian_streaming::headless::HeadlessBackend;
use meridian_streaming::{ChunkManager, StreamingConfig};

fn main() {
    let mut args = std::env::args().skip(1);
    let environment = args.next().unwrap_or_else(|| "station_interior".to_owned());
    let chunks: i32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(24);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 MERIDIAN - CHUNK STREAMING WALK                  ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!("  environment: {environment}");
    println!("  distance:    {chunks} chunks east");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start runtime: {error}");
            std::process::exit(1);
        }
    };

    let passed = runtime.block_on(walk(&environment, chunks));
    std::process::exit(i32::from(!passed));
}

async fn walk(environment: &str, chunks: i32) -> bool {
    let registry = match AssemblageRegistry::builtin() {
        Ok(registry) => Arc::new(registry),
        Err(error) => {
            eprintln!("builtin registry rejected: {error}");
            return false;
        }
    };

    let config = StreamingConfig::production();
    let backend = HeadlessBackend::new();
    let manager = match ChunkManager::new(
        config.clone(),
        WorldSeed::new(1234),
        registry,
        backend.bridges(),
        environment,
    ) {
        Ok(manager) => manager,
        Err(error) => {
            eprintln!("manager rejected config: {error}");
            return false;
        }
    };

    let start = Instant::now();
    let step = config.chunk_size / 4.0;
    let steps = chunks * 4;
    for i in 0..=steps {
        let x = i as f32 * step + 0.5;
        manager.update(Vec3::new(x, 0.0, 0.5)).await;

        // Open a door now and then so the walk persists some facts
        if i % 8 == 0 {
            if let Some(door) = backend.entities_of_kind(EntityKind::Door).first() {
                backend.modify_entity(*door, |c| c.set_door_state(DoorState::Open));
            }
        }
    }
    let end = Vec3::new(steps as f32 * step + 0.5, 0.0, 0.5);
    for _ in 0..config.neighborhood_size() {
        if !manager.has_pending_work() {
            break;
        }
        manager.update(end).await;
    }
    let written = manager.flush().await;
    let elapsed = start.elapsed();

    let stats = manager.stats();
    println!();
    println!("  walked in:        {elapsed:?}");
    println!("  loaded chunks:    {}", stats.loaded_chunks);
    println!("  generated:        {}", stats.generated);
    println!("  rehydrated:       {}", stats.rehydrated);
    println!("  unloaded:         {}", stats.unloaded);
    println!("  load failures:    {}", stats.load_failures);
    println!("  failed bindings:  {}", stats.failed_bindings);
    println!("  flushed:          {written}");
    println!("  stored snapshots: {}", backend.stored_keys().len());
    println!("  live entities:    {}", backend.live_entity_count());
    println!("  live nodes:       {}", backend.alive_node_count());

    let full = stats.loaded_chunks == config.neighborhood_size();
    manager.dispose();
    let clean = backend.alive_node_count() == 0
        && backend.live_entity_count() == 0
        && backend.lod_count() == 0;

    println!();
    println!("  neighborhood complete: {}", if full { "YES" } else { "NO" });
    println!("  clean shutdown:        {}", if clean { "YES" } else { "NO" });
    full && clean
}
