//! # Meridian Core
//!
//! Value types shared by every Meridian crate.
//!
//! ## Contents
//!
//! - `EntityId` / `NodeId`: opaque handles returned by the engine bridges
//! - `Vec3` / `Transform`: authoring-space math
//! - `Components`: the closed set of component bags a streamed entity can carry
//!
//! Nothing in this crate talks to an engine. It only describes data.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod components;
pub mod entity;
pub mod math;

pub use components::{
    Components, DoorComponent, DoorState, EntityKind, LightComponent, LootComponent,
    PropComponent, SpawnComponent, StructuralComponent, TriggerComponent,
};
pub use entity::{EntityId, NodeId};
pub use math::{Transform, Vec3};
