//! Domain models for the Polydesk server

pub mod blueprint;
pub mod prefab;

pub use blueprint::{Blueprint, NewBlueprint};
pub use prefab::{NewPrefab, Prefab};
