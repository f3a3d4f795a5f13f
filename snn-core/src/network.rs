//! Network orchestrator: named populations, connections and monitors advanced
//! together on a fixed time grid.
//!
//! Semantics of one tick (`step`):
//! 1. every population's input starts as its external current (zeros when absent);
//! 2. every connection adds `weight · source.current()` to its target's input,
//!    reading currents as they were *before* this tick;
//! 3. every population steps exactly once;
//! 4. every connection applies its plasticity rule to the post-step spikes;
//! 5. every monitor samples the network.
//!
//! All mutating methods take `&mut self`, so nothing can add, remove or touch
//! entities while a `step` or `run` is in progress.

use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::connection::Connection;
use crate::error::{EntityKind, SnnError, SnnResult};
use crate::monitor::{Monitor, Probe};
use crate::population::Population;

#[derive(Default)]
pub struct Network {
    populations: BTreeMap<String, Population>,
    connections: BTreeMap<String, Connection>,
    monitors: BTreeMap<String, Box<dyn Monitor>>,
    tick: u64,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks applied since construction or the last full `reset`.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // --- populations ---

    pub fn add_population(&mut self, population: Population) -> SnnResult<()> {
        if self.populations.contains_key(population.name()) {
            return Err(SnnError::duplicate(EntityKind::Population, population.name()));
        }
        debug!(population = population.name(), size = population.size(), "population added");
        self.populations.insert(population.name().to_string(), population);
        Ok(())
    }

    /// Adds all or none: duplicates (also within `populations`) are reported before anything is inserted.
    pub fn add_populations(&mut self, populations: impl IntoIterator<Item = Population>) -> SnnResult<()> {
        let batch: Vec<Population> = populations.into_iter().collect();
        for (idx, p) in batch.iter().enumerate() {
            if self.populations.contains_key(p.name()) || batch[..idx].iter().any(|q| q.name() == p.name()) {
                return Err(SnnError::duplicate(EntityKind::Population, p.name()));
            }
        }
        for p in batch {
            self.add_population(p)?;
        }
        Ok(())
    }

    pub fn population(&self, name: &str) -> Option<&Population> {
        self.populations.get(name)
    }

    pub fn populations(&self) -> impl Iterator<Item = &Population> {
        self.populations.values()
    }

    pub fn remove_population(&mut self, name: &str) -> SnnResult<Population> {
        self.check_removable(name)?;
        debug!(population = name, "population removed");
        self.populations
            .remove(name)
            .ok_or_else(|| SnnError::reference(EntityKind::Population, name))
    }

    /// Validates every name before removing any.
    pub fn remove_populations(&mut self, names: &[&str]) -> SnnResult<()> {
        for name in names {
            self.check_removable(name)?;
        }
        for name in names {
            if self.populations.remove(*name).is_some() {
                debug!(population = *name, "population removed");
            }
        }
        Ok(())
    }

    /// Remove every population. Fails while any connection is registered.
    pub fn clear_populations(&mut self) -> SnnResult<()> {
        if let Some(c) = self.connections.values().next() {
            return Err(SnnError::InUse {
                population: c.source().to_string(),
                connection: c.name().to_string(),
            });
        }
        self.populations.clear();
        Ok(())
    }

    fn check_removable(&self, name: &str) -> SnnResult<()> {
        if !self.populations.contains_key(name) {
            return Err(SnnError::reference(EntityKind::Population, name));
        }
        match self.connections.values().find(|c| c.source() == name || c.target() == name) {
            Some(c) => Err(SnnError::InUse {
                population: name.to_string(),
                connection: c.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Restore every population to its initial state and rewind the tick counter.
    pub fn reset(&mut self) {
        for p in self.populations.values_mut() {
            p.reset();
        }
        self.tick = 0;
        debug!("network reset");
    }

    /// Restore only the named populations. The tick counter is kept.
    pub fn reset_populations(&mut self, names: &[&str]) -> SnnResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.populations.contains_key(**n)) {
            return Err(SnnError::reference(EntityKind::Population, *missing));
        }
        for name in names {
            if let Some(p) = self.populations.get_mut(*name) {
                p.reset();
            }
        }
        Ok(())
    }

    // --- connections ---

    /// Both endpoints must already be registered with matching sizes.
    pub fn add_connection(&mut self, connection: Connection) -> SnnResult<()> {
        self.check_connection(&connection)?;
        debug!(
            connection = connection.name(),
            source = connection.source(),
            target = connection.target(),
            "connection added"
        );
        self.connections.insert(connection.name().to_string(), connection);
        Ok(())
    }

    /// Adds all or none, like `add_populations`.
    pub fn add_connections(&mut self, connections: impl IntoIterator<Item = Connection>) -> SnnResult<()> {
        let batch: Vec<Connection> = connections.into_iter().collect();
        for (idx, c) in batch.iter().enumerate() {
            if batch[..idx].iter().any(|d| d.name() == c.name()) {
                return Err(SnnError::duplicate(EntityKind::Connection, c.name()));
            }
            self.check_connection(c)?;
        }
        for c in batch {
            self.add_connection(c)?;
        }
        Ok(())
    }

    fn check_connection(&self, connection: &Connection) -> SnnResult<()> {
        if self.connections.contains_key(connection.name()) {
            return Err(SnnError::duplicate(EntityKind::Connection, connection.name()));
        }
        for (endpoint, size) in [
            (connection.source(), connection.source_size()),
            (connection.target(), connection.target_size()),
        ] {
            let population = self
                .populations
                .get(endpoint)
                .ok_or_else(|| SnnError::reference(EntityKind::Population, endpoint))?;
            if population.size() != size {
                return Err(SnnError::shape(
                    format!("endpoint '{}' of connection '{}'", endpoint, connection.name()),
                    &[population.size()],
                    &[size],
                ));
            }
        }
        Ok(())
    }

    pub fn connection(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    /// Replace the weights of connection `name`; the shape must not change.
    pub fn reset_connection_weight(&mut self, name: &str, weight: Array2<f64>) -> SnnResult<()> {
        self.connections
            .get_mut(name)
            .ok_or_else(|| SnnError::reference(EntityKind::Connection, name))?
            .reset_weight(weight)?;
        debug!(connection = name, "weights replaced");
        Ok(())
    }

    /// Redraw the weights of connection `name` from normal(0, 1).
    pub fn reset_connection_weight_random<R: Rng + ?Sized>(&mut self, name: &str, rng: &mut R) -> SnnResult<()> {
        self.connections
            .get_mut(name)
            .ok_or_else(|| SnnError::reference(EntityKind::Connection, name))?
            .reset_weight_random(rng);
        debug!(connection = name, "weights redrawn");
        Ok(())
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn remove_connection(&mut self, name: &str) -> SnnResult<Connection> {
        let c = self
            .connections
            .remove(name)
            .ok_or_else(|| SnnError::reference(EntityKind::Connection, name))?;
        debug!(connection = name, "connection removed");
        Ok(c)
    }

    pub fn remove_connections(&mut self, names: &[&str]) -> SnnResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.connections.contains_key(**n)) {
            return Err(SnnError::reference(EntityKind::Connection, *missing));
        }
        for name in names {
            self.connections.remove(*name);
        }
        Ok(())
    }

    pub fn clear_connections(&mut self) {
        self.connections.clear();
    }

    // --- monitors ---

    pub fn add_monitor<M: Monitor + 'static>(&mut self, monitor: M) -> SnnResult<()> {
        if self.monitors.contains_key(monitor.name()) {
            return Err(SnnError::duplicate(EntityKind::Monitor, monitor.name()));
        }
        debug!(monitor = monitor.name(), "monitor added");
        self.monitors.insert(monitor.name().to_string(), Box::new(monitor));
        Ok(())
    }

    pub fn monitor(&self, name: &str) -> Option<&dyn Monitor> {
        self.monitors.get(name).map(|m| m.as_ref())
    }

    /// Typed access to a registered monitor.
    pub fn monitor_as<M: Monitor + 'static>(&self, name: &str) -> Option<&M> {
        self.monitors.get(name).and_then(|m| m.as_any().downcast_ref::<M>())
    }

    pub fn monitor_names(&self) -> impl Iterator<Item = &str> {
        self.monitors.keys().map(String::as_str)
    }

    pub fn remove_monitor(&mut self, name: &str) -> SnnResult<Box<dyn Monitor>> {
        self.monitors
            .remove(name)
            .ok_or_else(|| SnnError::reference(EntityKind::Monitor, name))
    }

    pub fn remove_monitors(&mut self, names: &[&str]) -> SnnResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.monitors.contains_key(**n)) {
            return Err(SnnError::reference(EntityKind::Monitor, *missing));
        }
        for name in names {
            self.monitors.remove(*name);
        }
        Ok(())
    }

    pub fn clear_monitors(&mut self) {
        self.monitors.clear();
    }

    /// Drop the recorded data of every monitor, keeping the monitors registered.
    pub fn clear_monitor_data(&mut self) {
        for m in self.monitors.values_mut() {
            m.clear();
        }
    }

    // --- simulation ---

    /// Advance one tick. `external` maps population names to input currents;
    /// populations without an entry receive zeros. Inputs are validated before
    /// any state changes.
    pub fn step(&mut self, dt: f64, external: &HashMap<String, Array1<f64>>) -> SnnResult<()> {
        let views: BTreeMap<&str, ArrayView1<'_, f64>> =
            external.iter().map(|(name, input)| (name.as_str(), input.view())).collect();
        self.check_inputs(&views)?;
        self.advance(dt, &views)
    }

    /// Run `T` ticks, feeding row `t` of every `(T, N)` input matrix at tick `t`.
    ///
    /// Every matrix must have the same number of rows and match its
    /// population's size; this is checked before the first tick so a failing
    /// run leaves the network untouched. Returns the number of ticks run.
    pub fn run(&mut self, dt: f64, inputs: &HashMap<String, Array2<f64>>) -> SnnResult<usize> {
        let mut ticks: Option<(usize, &str)> = None;
        for (name, matrix) in inputs {
            let population = self
                .populations
                .get(name)
                .ok_or_else(|| SnnError::reference(EntityKind::Population, name.as_str()))?;
            if matrix.ncols() != population.size() {
                return Err(SnnError::shape(
                    format!("input matrix of population '{}'", name),
                    &[matrix.nrows(), population.size()],
                    matrix.shape(),
                ));
            }
            match ticks {
                None => ticks = Some((matrix.nrows(), name.as_str())),
                Some((t, first)) if t != matrix.nrows() => {
                    return Err(SnnError::shape(
                        format!("timestep count of '{}' (must agree with '{}')", name, first),
                        &[t],
                        &[matrix.nrows()],
                    ));
                }
                Some(_) => {}
            }
        }

        let Some((ticks, _)) = ticks else {
            warn!("run called without inputs; use run_ticks to run undriven");
            return Ok(0);
        };

        info!(ticks, dt, inputs = inputs.len(), "run started");
        for t in 0..ticks {
            let views: BTreeMap<&str, ArrayView1<'_, f64>> =
                inputs.iter().map(|(name, m)| (name.as_str(), m.row(t))).collect();
            self.advance(dt, &views)?;
        }
        info!(ticks, tick = self.tick, "run finished");
        Ok(ticks)
    }

    /// Run `ticks` ticks with no external input.
    pub fn run_ticks(&mut self, dt: f64, ticks: usize) -> SnnResult<()> {
        let none = BTreeMap::new();
        for _ in 0..ticks {
            self.advance(dt, &none)?;
        }
        Ok(())
    }

    fn check_inputs(&self, external: &BTreeMap<&str, ArrayView1<'_, f64>>) -> SnnResult<()> {
        for (name, input) in external {
            let population = self
                .populations
                .get(*name)
                .ok_or_else(|| SnnError::reference(EntityKind::Population, *name))?;
            if input.len() != population.size() {
                return Err(SnnError::shape(
                    format!("external input of population '{}'", name),
                    &[population.size()],
                    &[input.len()],
                ));
            }
        }
        Ok(())
    }

    fn advance(&mut self, dt: f64, external: &BTreeMap<&str, ArrayView1<'_, f64>>) -> SnnResult<()> {
        // (1) seed accumulators
        let mut inputs: BTreeMap<String, Array1<f64>> = self
            .populations
            .iter()
            .map(|(name, p)| {
                let seed = match external.get(name.as_str()) {
                    Some(v) => v.to_owned(),
                    None => Array1::zeros(p.size()),
                };
                (name.clone(), seed)
            })
            .collect();

        // (2) synaptic input from pre-step currents
        for c in self.connections.values() {
            let source = self
                .populations
                .get(c.source())
                .ok_or_else(|| SnnError::reference(EntityKind::Population, c.source()))?;
            let contribution = c.propagate(source.current())?;
            let acc = inputs
                .get_mut(c.target())
                .ok_or_else(|| SnnError::reference(EntityKind::Population, c.target()))?;
            if contribution.len() != acc.len() {
                return Err(SnnError::shape(
                    format!("synaptic input of connection '{}'", c.name()),
                    &[acc.len()],
                    &[contribution.len()],
                ));
            }
            *acc += &contribution;
        }

        // (3) population update
        let mut spikes = 0usize;
        for (name, p) in self.populations.iter_mut() {
            if let Some(input) = inputs.get(name) {
                p.step(dt, input.view())?;
            }
            spikes += p.spike_count();
        }

        // (4) plasticity on post-step spikes
        for c in self.connections.values_mut() {
            if !c.plasticity().is_plastic() {
                continue;
            }
            let (Some(pre), Some(post)) = (self.populations.get(c.source()), self.populations.get(c.target())) else {
                return Err(SnnError::reference(EntityKind::Connection, c.name()));
            };
            c.update_weight(dt, pre.spikes(), post.spikes())?;
        }

        self.tick += 1;
        trace!(tick = self.tick, spikes, "tick");

        // (5) monitors
        let probe = Probe {
            tick: self.tick,
            populations: &self.populations,
            connections: &self.connections,
        };
        for m in self.monitors.values_mut() {
            m.collect(probe);
        }
        Ok(())
    }
}
