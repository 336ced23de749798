//! tileseed clients - collaborators of the seeding engine
//!
//! The engine only sees the traits in [`traits`]. The reqwest
//! implementations here talk to the job manager, the heartbeat service, the
//! job tracker and the tile proxy's configuration endpoint.

pub mod error;
pub mod heartbeat;
mod http;
pub mod job_manager;
pub mod job_tracker;
pub mod proxy_config;
pub mod traits;

#[cfg(test)]
mod test_server;

pub use error::{ClientError, Result};
pub use heartbeat::{HeartbeatClient, HeartbeatHandle};
pub use job_manager::JobManagerClient;
pub use job_tracker::JobTrackerClient;
pub use proxy_config::MapproxyConfigClient;
pub use traits::{Heartbeat, JobTracker, ProxyConfigSource, TaskQueue};
