//! Recording monitors built on the `snn_core::Monitor` hook.
//!
//! - `Recording<S>`: per-entity time series, sampled every `save_step` ticks and
//!   capped at `max_points` samples (oldest dropped). Aliased as
//!   `PotentialMonitor`, `CurrentMonitor`, `SpikeMonitor` and `WeightMonitor`.
//! - `SpikeRaster`: fixed-width circular spike raster over a set of populations,
//!   used by the terminal front-end.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::marker::PhantomData;

use ndarray::{Array1, Array2};
use snn_core::{EntityKind, Monitor, Network, Probe, SnnError, SnnResult};
use tracing::trace;

/// What a `Recording` extracts from one named entity per sample.
pub trait Sampler {
    type Sample: Clone + 'static;

    /// Kind of entity the sampled names refer to.
    const KIND: EntityKind;

    fn sample(probe: &Probe<'_>, name: &str) -> Option<Self::Sample>;
}

/// Membrane potentials of a population.
#[derive(Debug)]
pub struct Potential;

/// Output currents of a population.
#[derive(Debug)]
pub struct Current;

/// Indices of the neurons that spiked on the sampled tick.
#[derive(Debug)]
pub struct Spikes;

/// Full weight matrix of a connection.
#[derive(Debug)]
pub struct Weights;

impl Sampler for Potential {
    type Sample = Array1<f64>;
    const KIND: EntityKind = EntityKind::Population;

    fn sample(probe: &Probe<'_>, name: &str) -> Option<Self::Sample> {
        probe.population(name).map(|p| p.potential().to_owned())
    }
}

impl Sampler for Current {
    type Sample = Array1<f64>;
    const KIND: EntityKind = EntityKind::Population;

    fn sample(probe: &Probe<'_>, name: &str) -> Option<Self::Sample> {
        probe.population(name).map(|p| p.current().to_owned())
    }
}

impl Sampler for Spikes {
    type Sample = Vec<usize>;
    const KIND: EntityKind = EntityKind::Population;

    fn sample(probe: &Probe<'_>, name: &str) -> Option<Self::Sample> {
        probe.population(name).map(|p| {
            p.spikes()
                .iter()
                .enumerate()
                .filter_map(|(idx, &s)| s.then_some(idx))
                .collect()
        })
    }
}

impl Sampler for Weights {
    type Sample = Array2<f64>;
    const KIND: EntityKind = EntityKind::Connection;

    fn sample(probe: &Probe<'_>, name: &str) -> Option<Self::Sample> {
        probe.connection(name).map(|c| c.weight().to_owned())
    }
}

pub type PotentialMonitor = Recording<Potential>;
pub type CurrentMonitor = Recording<Current>;
pub type SpikeMonitor = Recording<Spikes>;
pub type WeightMonitor = Recording<Weights>;

pub struct Recording<S: Sampler> {
    name: String,
    targets: Vec<String>,
    save_step: u64,
    max_points: Option<usize>,
    calls: u64,
    data: BTreeMap<String, VecDeque<S::Sample>>,
    sampled_at: BTreeMap<String, VecDeque<u64>>,
    _sampler: PhantomData<S>,
}

impl<S: Sampler> Recording<S> {
    /// Record every `save_step`-th tick of each target. A `save_step` of 0 is treated as 1.
    pub fn new<I, T>(name: impl Into<String>, targets: I, save_step: u64) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        let data = targets.iter().map(|t| (t.clone(), VecDeque::new())).collect();
        let sampled_at = targets.iter().map(|t| (t.clone(), VecDeque::new())).collect();
        Self {
            name: name.into(),
            targets,
            save_step: save_step.max(1),
            max_points: None,
            calls: 0,
            data,
            sampled_at,
            _sampler: PhantomData,
        }
    }

    /// Keep only the most recent `max_points` samples per target.
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = Some(max_points);
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn save_step(&self) -> u64 {
        self.save_step
    }

    pub fn max_points(&self) -> Option<usize> {
        self.max_points
    }

    /// Number of `collect` calls seen, sampled or not.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Recorded samples of `target`, oldest first.
    pub fn data(&self, target: &str) -> SnnResult<&VecDeque<S::Sample>> {
        self.data.get(target).ok_or_else(|| SnnError::Reference {
            kind: S::KIND,
            name: target.to_string(),
        })
    }

    /// Call index (1-based) of each retained sample of `target`, aligned with `data`.
    pub fn sample_calls(&self, target: &str) -> SnnResult<&VecDeque<u64>> {
        self.sampled_at.get(target).ok_or_else(|| SnnError::Reference {
            kind: S::KIND,
            name: target.to_string(),
        })
    }

    /// Call index (1-based) of the oldest retained sample of `target`, `None` when nothing is kept.
    pub fn first_sample_call(&self, target: &str) -> SnnResult<Option<u64>> {
        Ok(self.sample_calls(target)?.front().copied())
    }
}

impl<S: Sampler + 'static> Monitor for Recording<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&mut self, probe: Probe<'_>) {
        self.calls += 1;
        if self.calls % self.save_step != 0 {
            return;
        }
        for target in &self.targets {
            let Some(sample) = S::sample(&probe, target) else {
                trace!(monitor = %self.name, target = %target, "target not present, sample skipped");
                continue;
            };
            let (Some(points), Some(calls)) = (self.data.get_mut(target), self.sampled_at.get_mut(target)) else {
                continue;
            };
            points.push_back(sample);
            calls.push_back(self.calls);
            if let Some(max) = self.max_points {
                while points.len() > max {
                    points.pop_front();
                    calls.pop_front();
                }
            }
        }
    }

    fn clear(&mut self) {
        for points in self.data.values_mut() {
            points.clear();
        }
        for calls in self.sampled_at.values_mut() {
            calls.clear();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One raster row: neuron `index` of population `population`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterRow {
    pub population: String,
    pub index: usize,
}

/// Circular spike raster: one row per neuron, `width` columns of time.
/// The column written on tick `t` is `t % width`.
#[derive(Debug)]
pub struct SpikeRaster {
    name: String,
    width: usize,
    rows: Vec<RasterRow>,
    cells: Vec<Vec<bool>>,
    last_tick: u64,
    last_spikes: usize,
}

impl SpikeRaster {
    pub fn new(name: impl Into<String>, layout: &[(String, usize)], width: usize) -> Self {
        let width = width.max(1);
        let rows: Vec<RasterRow> = layout
            .iter()
            .flat_map(|(population, size)| {
                (0..*size).map(move |index| RasterRow { population: population.clone(), index })
            })
            .collect();
        let cells = vec![vec![false; width]; rows.len()];
        Self {
            name: name.into(),
            width,
            rows,
            cells,
            last_tick: 0,
            last_spikes: 0,
        }
    }

    /// Raster over every population currently registered in `network`.
    pub fn for_network(name: impl Into<String>, network: &Network, width: usize) -> Self {
        let layout: Vec<(String, usize)> = network
            .populations()
            .map(|p| (p.name().to_string(), p.size()))
            .collect();
        Self::new(name, &layout, width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[RasterRow] {
        &self.rows
    }

    /// Spike flags of row `row`, indexed by column.
    pub fn cells(&self, row: usize) -> Option<&[bool]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    /// Column written by the most recent tick.
    pub fn cursor(&self) -> usize {
        (self.last_tick % self.width as u64) as usize
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    /// Spikes recorded on the most recent tick.
    pub fn last_spikes(&self) -> usize {
        self.last_spikes
    }
}

impl Monitor for SpikeRaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&mut self, probe: Probe<'_>) {
        self.last_tick = probe.tick();
        let col = self.cursor();
        self.last_spikes = 0;
        for (row, cells) in self.rows.iter().zip(self.cells.iter_mut()) {
            let spiked = probe
                .population(&row.population)
                .and_then(|p| p.spikes().get(row.index).copied())
                .unwrap_or(false);
            cells[col] = spiked;
            if spiked {
                self.last_spikes += 1;
            }
        }
    }

    fn clear(&mut self) {
        for cells in &mut self.cells {
            cells.fill(false);
        }
        self.last_spikes = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
