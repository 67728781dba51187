//! SQLite-backed cache of responses, partitioned into generations.
//!
//! This module provides the persistent store behind the worker, using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named generations (`prefix + version`), deleted as a unit
//! - Request keys derived from method and URL via SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use store::{CacheStore, Generation};
