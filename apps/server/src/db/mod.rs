//! Database layer - repositories and query compilation

pub mod blueprints;
pub mod prefabs;
pub mod query;

pub use blueprints::BlueprintRepository;
pub use prefabs::{Page, PrefabRepository, SearchResult};
