//! snn-core-plus: extensions atop snn-core (keeps snn-core unchanged)
//!
//! Additions:
//! - Recording monitors (potential, current, spikes, weights) with sampling
//!   interval and bounded history
//! - Circular spike raster for live front-ends
//! - TOML network descriptions with a deterministic, seeded builder

pub mod config;
pub mod error;
pub mod monitor;

// Re-exports
pub use config::{ConnectionConfig, MonitorConfig, MonitorKind, NetworkConfig, PopulationConfig, StimulusConfig};
pub use error::{PlusError, PlusResult};
pub use monitor::{
    CurrentMonitor, PotentialMonitor, RasterRow, Recording, Sampler, SpikeMonitor, SpikeRaster, WeightMonitor,
};
