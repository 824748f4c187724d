//! A uniform HTTP front-end for container registry operations.
//!
//! Requests pass through a fixed pipeline (metrics, authorization gate,
//! route dispatcher) and land on a [`RegistryClient`] chosen at startup.

pub mod backends;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod paths;
pub mod responses;
pub mod router;
pub mod server;

pub use backends::MemoryRegistry;
pub use client::{RegistryClient, RegistryToken};
pub use config::GatewayConfig;
pub use error::{ConfigError, GatewayError, Result};
pub use observability::HttpMetrics;
pub use server::{build_router, GatewayServer};
