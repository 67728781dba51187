//! Core types and shared functionality for the offline worker.
//!
//! This crate provides:
//! - Generation-partitioned response cache with SQLite backend
//! - Request/response types exchanged with the host
//! - Configuration loading and the compiled configuration snapshot
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore, CachedEntry, Generation};
pub use config::{AppConfig, ConfigSnapshot, Strategy};
pub use error::Error;
pub use http::{Headers, Request, RequestMode, Response, ResponseKind};
