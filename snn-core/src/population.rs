//! Neuron population: a named, fixed-size group of neurons stored as parallel arrays.

use ndarray::{Array1, ArrayView1};
use tracing::debug;

use crate::error::{SnnError, SnnResult};
use crate::neuron::{NeuronKind, NeuronModel, PopulationState};
use crate::params::ParamSet;

#[derive(Debug, Clone)]
pub struct Population {
    name: String,
    model: NeuronModel,
    state: PopulationState,
    initial: PopulationState,
}

impl Population {
    /// Build a population of `size` neurons.
    ///
    /// Besides the model keys (see [`NeuronKind::required_keys`]) the
    /// parameter set may carry `Tref` and the initial state `Ustart`,
    /// `Istart`, `Sstart` (non-zero means spiking) and, for the adaptive
    /// variant, `Vstart`. Each value is a scalar or a length-`size` vector.
    pub fn new(name: impl Into<String>, size: usize, kind: NeuronKind, params: &ParamSet) -> SnnResult<Self> {
        let name = name.into();
        if size == 0 {
            return Err(SnnError::Configuration(format!(
                "population '{}' must contain at least one neuron",
                name
            )));
        }
        let model = NeuronModel::from_params(kind, params, size)?;
        let initial = PopulationState {
            u: params.vector_or("Ustart", size, 0.0)?,
            i: params.vector_or("Istart", size, 0.0)?,
            s: params.vector_or("Sstart", size, 0.0)?.mapv(|x| x != 0.0),
            refractory: Array1::zeros(size),
            v: match kind {
                NeuronKind::Lif => None,
                NeuronKind::AdaptiveLif => Some(params.vector_or("Vstart", size, 0.0)?),
            },
        };
        debug!(population = %name, size, kind = kind.label(), "population created");
        Ok(Self {
            name,
            model,
            state: initial.clone(),
            initial,
        })
    }

    pub fn lif(name: impl Into<String>, size: usize, params: &ParamSet) -> SnnResult<Self> {
        Self::new(name, size, NeuronKind::Lif, params)
    }

    pub fn adaptive_lif(name: impl Into<String>, size: usize, params: &ParamSet) -> SnnResult<Self> {
        Self::new(name, size, NeuronKind::AdaptiveLif, params)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of neurons N.
    pub fn size(&self) -> usize {
        self.state.len()
    }

    pub fn kind(&self) -> NeuronKind {
        self.model.kind()
    }

    pub fn model(&self) -> &NeuronModel {
        &self.model
    }

    /// Advance every neuron by one tick of length `dt` given the summed input current.
    pub fn step(&mut self, dt: f64, input: ArrayView1<'_, f64>) -> SnnResult<()> {
        if input.len() != self.size() {
            return Err(SnnError::shape(
                format!("input of population '{}'", self.name),
                &[self.size()],
                &[input.len()],
            ));
        }
        self.model.advance(&mut self.state, dt, input);
        Ok(())
    }

    /// Restore the configured initial state.
    pub fn reset(&mut self) {
        self.state.clone_from(&self.initial);
    }

    pub fn potential(&self) -> ArrayView1<'_, f64> {
        self.state.u.view()
    }

    pub fn current(&self) -> ArrayView1<'_, f64> {
        self.state.i.view()
    }

    pub fn spikes(&self) -> ArrayView1<'_, bool> {
        self.state.s.view()
    }

    /// Reset potential V; `None` for plain LIF populations.
    pub fn adaptation(&self) -> Option<ArrayView1<'_, f64>> {
        self.state.v.as_ref().map(|v| v.view())
    }

    pub fn refractory(&self) -> ArrayView1<'_, f64> {
        self.state.refractory.view()
    }

    pub fn spike_count(&self) -> usize {
        self.state.s.iter().filter(|&&s| s).count()
    }

    pub fn state(&self) -> &PopulationState {
        &self.state
    }

    pub fn initial_state(&self) -> &PopulationState {
        &self.initial
    }
}
