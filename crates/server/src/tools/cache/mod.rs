//! Cache inspection MCP tools.
//!
//! This module provides tools for reading and pruning cache generations.

pub mod delete;
pub mod lookup;

pub use delete::{CacheDeleteParams, delete_impl};
pub use lookup::{CacheMatchParams, match_impl};
