//! tileseed core - task model, configuration and validation
//!
//! This crate holds the types shared by the engine, the HTTP clients and the
//! worker binary: the queue task payload, the GeoJSON geometry model, the
//! worker configuration and the precondition checks run before a seed.

pub mod config;
pub mod error;
pub mod geometry;
pub mod proxy;
pub mod types;
pub mod validation;

pub use config::WorkerConfig;
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use geometry::{BoundingBox, Geometry, Position};
pub use proxy::ProxyConfig;
pub use types::{
    CacheType, JobMetadata, NormalizedSeedTask, QueueTask, SeedMode, SeedTask, TaskParameters,
};
