//! Polydesk server
//!
//! A document store for prefabs (JSON documents grouped into namespaces by
//! blueprints) with a formula-driven query engine:
//! - Generated columns and filters written in a small formula language
//! - Cross-record lookups and referent aggregates compiled to SQL joins
//! - Sorting and offset pagination over generated columns

#![allow(
    clippy::too_many_arguments, // join planners take every scrubbed identifier explicitly
)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
