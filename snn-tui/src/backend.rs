// Backend abstraction for the TUI so the front-end does not care where the network comes from.

use std::collections::HashMap;

use anyhow::{Context, Result};
use ndarray::Array1;
use snn_core::Network;
use snn_core_plus::{NetworkConfig, SpikeRaster};
use tracing::info;

/// Name under which the raster monitor is registered.
pub const RASTER_MONITOR: &str = "tui-raster";

/// Small two-layer network used when no description is given.
const DEMO: &str = r#"
dt = 1.0
seed = 42

[[population]]
name = "input"
size = 6
kind = "lif"
params = { Utay = 8.0, Uth = 1.0, Urest = 0.0, Itay = 4.0, Imax = 1.0, Tref = 2.0 }

[[population]]
name = "hidden"
size = 8
kind = "adaptive_lif"
params = { Utay = 10.0, Uth = 1.0, Itay = 5.0, Imax = 1.0, Vtay = 40.0, Vstep = 0.2 }

[[connection]]
name = "input->hidden"
source = "input"
target = "hidden"
plasticity = "stdp"
params = { Aplus = 0.02, Aminus = 0.021, Tpre = 10.0, Tpost = 10.0 }

[[stimulus]]
population = "input"
current = [0.35, 0.3, 0.25, 0.2, 0.15, 0.12]
"#;

/// Common interface for anything that can drive the TUI.
pub trait SnnBackend {
    /// Advance the simulation by one tick.
    fn step(&mut self) -> Result<()>;

    /// Return every population to its initial state and clear the raster.
    fn reset(&mut self);

    fn network(&self) -> &Network;

    fn raster(&self) -> Option<&SpikeRaster> {
        self.network().monitor_as::<SpikeRaster>(RASTER_MONITOR)
    }
}

/// Implementation backed by a `snn_core::Network` built from a description.
pub struct NetworkBackend {
    network: Network,
    dt: f64,
    stimulus: HashMap<String, Array1<f64>>,
}

impl NetworkBackend {
    pub fn from_config(config: &NetworkConfig, width: usize) -> Result<Self> {
        let mut network = config.build().context("building network")?;
        let stimulus = config.stimulus(&network)?;
        let raster = SpikeRaster::for_network(RASTER_MONITOR, &network, width);
        network.add_monitor(raster)?;
        info!(dt = config.dt, rows = network.populations().map(|p| p.size()).sum::<usize>(), "backend ready");
        Ok(Self {
            network,
            dt: config.dt,
            stimulus,
        })
    }

    pub fn demo(width: usize) -> Result<Self> {
        let config = NetworkConfig::from_toml_str(DEMO)?;
        Self::from_config(&config, width)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl SnnBackend for NetworkBackend {
    fn step(&mut self) -> Result<()> {
        self.network.step(self.dt, &self.stimulus)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.network.reset();
        self.network.clear_monitor_data();
    }

    fn network(&self) -> &Network {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_network_steps_and_resets() {
        let mut backend = NetworkBackend::demo(16).unwrap();
        assert_eq!(backend.raster().unwrap().rows().len(), 14);
        for _ in 0..20 {
            backend.step().unwrap();
        }
        assert_eq!(backend.network().tick(), 20);

        backend.reset();
        assert_eq!(backend.network().tick(), 0);
        let raster = backend.raster().unwrap();
        assert!((0..raster.rows().len()).all(|r| raster.cells(r).unwrap().iter().all(|&c| !c)));
    }

    #[test]
    fn demo_input_layer_fires() {
        let mut backend = NetworkBackend::demo(8).unwrap();
        let mut fired = 0;
        for _ in 0..30 {
            backend.step().unwrap();
            fired += backend.network().population("input").unwrap().spike_count();
        }
        assert!(fired > 0);
    }
}
