//! HTTP request handlers

pub mod blueprints;
pub mod prefabs;
