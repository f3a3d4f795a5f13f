//! TOML network descriptions.
//!
//! ```toml
//! dt = 1.0
//! seed = 7
//!
//! [[population]]
//! name = "input"
//! size = 4
//! kind = "lif"
//! params = { Utay = 10.0, Uth = 1.0, Urest = 0.0, Itay = 5.0, Imax = 1.0 }
//!
//! [[connection]]
//! name = "input->output"
//! source = "input"
//! target = "output"
//! plasticity = "stdp"          # "static" (default) | "stdp" | "ltpf"
//! params = { Aplus = 0.01, Aminus = 0.012, Tpre = 20.0, Tpost = 20.0 }
//! # weight = [[...], ...]      # (target.N, source.N); random normal(0, 1) from `seed` when absent
//!
//! [[monitor]]
//! name = "potentials"
//! kind = "potential"           # "potential" | "current" | "spikes" | "weights"
//! targets = ["output"]
//! save_step = 1
//! max_points = 500
//!
//! [[stimulus]]
//! population = "input"
//! current = [1.2, 0.0, 0.6, 0.0]
//! ```

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, Array2};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use snn_core::{
    Connection, EntityKind, Network, NeuronKind, ParamSet, ParamValue, Plasticity, PlasticityKind, Population,
    SnnError,
};
use tracing::{debug, info};

use crate::error::{PlusError, PlusResult};
use crate::monitor::{Current, Potential, Recording, Sampler, Spikes, Weights};

fn default_dt() -> f64 {
    1.0
}

fn default_save_step() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Seed for every randomly initialised weight matrix.
    #[serde(default)]
    pub seed: u64,
    #[serde(default, rename = "population")]
    pub populations: Vec<PopulationConfig>,
    #[serde(default, rename = "connection")]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default, rename = "monitor")]
    pub monitors: Vec<MonitorConfig>,
    #[serde(default, rename = "stimulus")]
    pub stimuli: Vec<StimulusConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    pub name: String,
    pub size: usize,
    pub kind: NeuronKind,
    #[serde(default)]
    pub params: ParamSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub name: String,
    pub source: String,
    pub target: String,
    /// Rows are target neurons, columns source neurons.
    #[serde(default)]
    pub weight: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub plasticity: PlasticityKind,
    #[serde(default)]
    pub params: ParamSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    Potential,
    Current,
    Spikes,
    Weights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub name: String,
    pub kind: MonitorKind,
    pub targets: Vec<String>,
    #[serde(default = "default_save_step")]
    pub save_step: u64,
    #[serde(default)]
    pub max_points: Option<usize>,
}

/// Constant external current fed to one population on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    pub population: String,
    pub current: ParamValue,
}

impl NetworkConfig {
    pub fn from_toml_str(src: &str) -> PlusResult<Self> {
        let config: NetworkConfig = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> PlusResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| PlusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "network description loaded");
        Self::from_toml_str(&src)
    }

    fn validate(&self) -> PlusResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(PlusError::Invalid(format!("dt must be a positive number, got {}", self.dt)));
        }
        Ok(())
    }

    /// Build the network. Identical descriptions build identical networks.
    pub fn build(&self) -> PlusResult<Network> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut network = Network::new();

        for p in &self.populations {
            network.add_population(Population::new(p.name.clone(), p.size, p.kind, &p.params)?)?;
        }

        for c in &self.connections {
            let connection = {
                let source = network
                    .population(&c.source)
                    .ok_or_else(|| SnnError::Reference { kind: EntityKind::Population, name: c.source.clone() })?;
                let target = network
                    .population(&c.target)
                    .ok_or_else(|| SnnError::Reference { kind: EntityKind::Population, name: c.target.clone() })?;
                let plasticity = Plasticity::from_params(c.plasticity, &c.params, source.size(), target.size())?;
                match &c.weight {
                    Some(rows) => Connection::new(c.name.clone(), source, target, matrix(&c.name, rows)?, plasticity)?,
                    None => Connection::with_random_weight(c.name.clone(), source, target, plasticity, &mut rng)?,
                }
            };
            network.add_connection(connection)?;
        }

        for m in &self.monitors {
            let kind = match m.kind {
                MonitorKind::Weights => EntityKind::Connection,
                _ => EntityKind::Population,
            };
            for target in &m.targets {
                let known = match kind {
                    EntityKind::Connection => network.connection(target).is_some(),
                    _ => network.population(target).is_some(),
                };
                if !known {
                    return Err(SnnError::Reference { kind, name: target.clone() }.into());
                }
            }
            add_monitor(&mut network, m)?;
        }

        // surface stimulus errors at build time
        self.stimulus(&network)?;

        info!(
            populations = self.populations.len(),
            connections = self.connections.len(),
            monitors = self.monitors.len(),
            seed = self.seed,
            "network built"
        );
        Ok(network)
    }

    /// Per-tick external input described by the `[[stimulus]]` tables.
    pub fn stimulus(&self, network: &Network) -> PlusResult<HashMap<String, Array1<f64>>> {
        let mut inputs: HashMap<String, Array1<f64>> = HashMap::new();
        for s in &self.stimuli {
            let population = network
                .population(&s.population)
                .ok_or_else(|| SnnError::Reference { kind: EntityKind::Population, name: s.population.clone() })?;
            let current = ParamSet::new()
                .with("current", s.current.clone())
                .vector("current", population.size())?;
            match inputs.get_mut(&s.population) {
                Some(acc) => *acc += &current,
                None => {
                    inputs.insert(s.population.clone(), current);
                }
            }
        }
        Ok(inputs)
    }
}

fn matrix(connection: &str, rows: &[Vec<f64>]) -> PlusResult<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(PlusError::Invalid(format!("weight of connection '{}' has ragged rows", connection)));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| PlusError::Invalid(format!("weight of connection '{}': {}", connection, e)))
}

fn recording<S: Sampler>(m: &MonitorConfig) -> Recording<S> {
    let recording = Recording::new(&m.name, m.targets.iter().cloned(), m.save_step);
    match m.max_points {
        Some(n) => recording.with_max_points(n),
        None => recording,
    }
}

fn add_monitor(network: &mut Network, m: &MonitorConfig) -> PlusResult<()> {
    match m.kind {
        MonitorKind::Potential => network.add_monitor(recording::<Potential>(m))?,
        MonitorKind::Current => network.add_monitor(recording::<Current>(m))?,
        MonitorKind::Spikes => network.add_monitor(recording::<Spikes>(m))?,
        MonitorKind::Weights => network.add_monitor(recording::<Weights>(m))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::SpikeMonitor;
    use snn_core::Monitor;

    const DESCRIPTION: &str = r#"
        dt = 1.0
        seed = 11

        [[population]]
        name = "input"
        size = 3
        kind = "lif"
        params = { Utay = 10.0, Uth = 1.0, Urest = 0.0, Itay = 5.0, Imax = 1.0 }

        [[population]]
        name = "output"
        size = 2
        kind = "adaptive_lif"
        params = { Utay = 10, Uth = [1.0, 0.8], Itay = 5.0, Imax = 1.0, Vtay = 50.0, Vstep = 0.1 }

        [[connection]]
        name = "input->output"
        source = "input"
        target = "output"
        plasticity = "stdp"
        params = { Aplus = 0.01, Aminus = 0.012, Tpre = 20.0, Tpost = 20.0 }

        [[connection]]
        name = "output->input"
        source = "output"
        target = "input"
        weight = [[0.5, 0.0], [0.0, 0.5], [0.25, 0.25]]

        [[monitor]]
        name = "spikes"
        kind = "spikes"
        targets = ["input", "output"]
        max_points = 10

        [[stimulus]]
        population = "input"
        current = [1.2, 0.0, 0.6]
    "#;

    #[test]
    fn parses_and_builds() {
        let config = NetworkConfig::from_toml_str(DESCRIPTION).unwrap();
        assert_eq!(config.populations.len(), 2);
        assert_eq!(config.connections[0].plasticity, PlasticityKind::Stdp);
        assert_eq!(config.connections[1].plasticity, PlasticityKind::Static);

        let net = config.build().unwrap();
        assert_eq!(net.population("output").unwrap().kind(), NeuronKind::AdaptiveLif);
        assert_eq!(net.connection("input->output").unwrap().weight().dim(), (2, 3));
        assert_eq!(net.connection("output->input").unwrap().weight()[[2, 1]], 0.25);
        assert_eq!(net.monitor("spikes").map(|m| m.name()), Some("spikes"));
    }

    #[test]
    fn same_seed_builds_same_weights() {
        let config = NetworkConfig::from_toml_str(DESCRIPTION).unwrap();
        let (a, b) = (config.build().unwrap(), config.build().unwrap());
        assert_eq!(
            a.connection("input->output").unwrap().weight(),
            b.connection("input->output").unwrap().weight()
        );
    }

    #[test]
    fn built_network_runs_with_stimulus() {
        let config = NetworkConfig::from_toml_str(DESCRIPTION).unwrap();
        let mut net = config.build().unwrap();
        let stimulus = config.stimulus(&net).unwrap();
        assert_eq!(stimulus["input"].to_vec(), vec![1.2, 0.0, 0.6]);
        for _ in 0..5 {
            net.step(config.dt, &stimulus).unwrap();
        }
        let spikes = net.monitor_as::<SpikeMonitor>("spikes").unwrap();
        assert_eq!(spikes.data("input").unwrap().len(), 5);
        // 1.2 crosses the threshold on the first tick
        assert!(spikes.data("input").unwrap()[0].contains(&0));
    }

    #[test]
    fn rejects_bad_descriptions() {
        assert!(matches!(NetworkConfig::from_toml_str("dt = 0.0"), Err(PlusError::Invalid(_))));
        assert!(matches!(NetworkConfig::from_toml_str("dt = ["), Err(PlusError::Toml(_))));
        assert!(matches!(NetworkConfig::from_toml_str("bogus = 1"), Err(PlusError::Toml(_))));

        let missing_key = r#"
            [[population]]
            name = "p"
            size = 2
            kind = "lif"
            params = { Utay = 10.0 }
        "#;
        let config = NetworkConfig::from_toml_str(missing_key).unwrap();
        assert!(matches!(config.build(), Err(PlusError::Core(SnnError::Configuration(_)))));

        let dangling = r#"
            [[population]]
            name = "p"
            size = 1
            kind = "lif"
            params = { Utay = 10.0, Uth = 1.0, Urest = 0.0, Itay = 5.0, Imax = 1.0 }

            [[monitor]]
            name = "w"
            kind = "weights"
            targets = ["p->q"]
        "#;
        let config = NetworkConfig::from_toml_str(dangling).unwrap();
        assert!(matches!(
            config.build(),
            Err(PlusError::Core(SnnError::Reference { kind: EntityKind::Connection, .. }))
        ));

        let ragged = r#"
            [[population]]
            name = "p"
            size = 2
            kind = "lif"
            params = { Utay = 10.0, Uth = 1.0, Urest = 0.0, Itay = 5.0, Imax = 1.0 }

            [[connection]]
            name = "p->p"
            source = "p"
            target = "p"
            weight = [[1.0, 0.0], [1.0]]
        "#;
        let config = NetworkConfig::from_toml_str(ragged).unwrap();
        assert!(matches!(config.build(), Err(PlusError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = NetworkConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, PlusError::Io { .. }));
    }
}
