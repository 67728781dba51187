//! Network access and the offline worker engine.
//!
//! This crate provides the network abstraction with its reqwest backend,
//! and the worker that classifies intercepted requests, answers them from
//! the cache or the network, and manages cache generations.

pub mod fetch;
pub mod worker;

pub use fetch::{Credentials, FetchConfig, FetchOptions, HttpNetwork, Network, NetworkError};
pub use worker::{FetchDecision, Registration, Worker, WorkerState};
