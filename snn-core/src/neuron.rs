//! Neuron dynamics: leaky integrate-and-fire and its adaptive variant.
//!
//! Every population carries one `NeuronModel` and one `PopulationState`; the
//! model advances the state elementwise. Decay is first-order Euler,
//! `x * (1 - dt/tau)`, valid while `dt << tau`. Nothing is clamped, so a
//! large `dt/tau` overshoots sign and NaN parameters propagate.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::SnnResult;
use crate::params::ParamSet;

/// Which dynamics a population runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuronKind {
    Lif,
    AdaptiveLif,
}

impl NeuronKind {
    /// Keys that must be present in the parameter set.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            NeuronKind::Lif => &["Utay", "Uth", "Urest", "Itay", "Imax"],
            NeuronKind::AdaptiveLif => &["Utay", "Uth", "Itay", "Imax", "Vtay", "Vstep"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NeuronKind::Lif => "LIF",
            NeuronKind::AdaptiveLif => "adaptive LIF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifParams {
    pub u_tau: Array1<f64>,
    pub u_th: Array1<f64>,
    pub u_rest: Array1<f64>,
    pub i_tau: Array1<f64>,
    pub i_max: Array1<f64>,
    /// Refractory period; 0 disables it.
    pub t_ref: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveLifParams {
    pub u_tau: Array1<f64>,
    pub u_th: Array1<f64>,
    pub i_tau: Array1<f64>,
    pub i_max: Array1<f64>,
    /// Decay constant of the reset potential V.
    pub v_tau: Array1<f64>,
    /// Amount V drops on every spike.
    pub v_step: Array1<f64>,
    pub t_ref: Array1<f64>,
}

/// Per-neuron state vectors, all of length N.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationState {
    /// Membrane potential U.
    pub u: Array1<f64>,
    /// Output current I.
    pub i: Array1<f64>,
    /// Spike flag S for the last tick.
    pub s: Array1<bool>,
    /// Remaining refractory time.
    pub refractory: Array1<f64>,
    /// Reset potential V (adaptive variant only).
    pub v: Option<Array1<f64>>,
}

impl PopulationState {
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NeuronModel {
    Lif(LifParams),
    AdaptiveLif(AdaptiveLifParams),
}

impl NeuronModel {
    /// Normalise a flat parameter set into per-neuron vectors of length `n`.
    pub fn from_params(kind: NeuronKind, params: &ParamSet, n: usize) -> SnnResult<Self> {
        params.require_keys(kind.label(), kind.required_keys())?;
        let model = match kind {
            NeuronKind::Lif => NeuronModel::Lif(LifParams {
                u_tau: params.vector("Utay", n)?,
                u_th: params.vector("Uth", n)?,
                u_rest: params.vector("Urest", n)?,
                i_tau: params.vector("Itay", n)?,
                i_max: params.vector("Imax", n)?,
                t_ref: params.vector_or("Tref", n, 0.0)?,
            }),
            NeuronKind::AdaptiveLif => NeuronModel::AdaptiveLif(AdaptiveLifParams {
                u_tau: params.vector("Utay", n)?,
                u_th: params.vector("Uth", n)?,
                i_tau: params.vector("Itay", n)?,
                i_max: params.vector("Imax", n)?,
                v_tau: params.vector("Vtay", n)?,
                v_step: params.vector("Vstep", n)?,
                t_ref: params.vector_or("Tref", n, 0.0)?,
            }),
        };
        Ok(model)
    }

    pub fn kind(&self) -> NeuronKind {
        match self {
            NeuronModel::Lif(_) => NeuronKind::Lif,
            NeuronModel::AdaptiveLif(_) => NeuronKind::AdaptiveLif,
        }
    }

    /// Advance `state` by one tick. `input` must already have the state's length.
    pub(crate) fn advance(&self, state: &mut PopulationState, dt: f64, input: ArrayView1<'_, f64>) {
        match self {
            NeuronModel::Lif(p) => {
                for k in 0..state.len() {
                    if hold_refractory(state, k, dt, p.i_tau[k]) {
                        continue;
                    }
                    let u = state.u[k] * (1.0 - dt / p.u_tau[k]) + input[k];
                    if u >= p.u_th[k] {
                        state.u[k] = p.u_rest[k];
                        fire(state, k, p.i_max[k], p.t_ref[k]);
                    } else {
                        state.u[k] = u;
                        quiet(state, k, dt, p.i_tau[k]);
                    }
                }
            }
            NeuronModel::AdaptiveLif(p) => {
                debug_assert!(state.v.is_some(), "adaptive population without V state");
                let Some(mut v) = state.v.take() else {
                    return;
                };
                // V relaxes toward 0 every tick, spiking or not
                for k in 0..v.len() {
                    v[k] *= 1.0 - dt / p.v_tau[k];
                }
                for k in 0..state.len() {
                    if hold_refractory(state, k, dt, p.i_tau[k]) {
                        continue;
                    }
                    let u = state.u[k] * (1.0 - dt / p.u_tau[k]) + input[k];
                    if u >= p.u_th[k] {
                        v[k] -= p.v_step[k];
                        state.u[k] = v[k];
                        fire(state, k, p.i_max[k], p.t_ref[k]);
                    } else {
                        state.u[k] = u;
                        quiet(state, k, dt, p.i_tau[k]);
                    }
                }
                state.v = Some(v);
            }
        }
    }
}

/// Refractory neurons skip integration; their current keeps decaying.
#[inline]
fn hold_refractory(state: &mut PopulationState, k: usize, dt: f64, i_tau: f64) -> bool {
    if state.refractory[k] > 0.0 {
        state.refractory[k] -= dt;
        quiet(state, k, dt, i_tau);
        true
    } else {
        false
    }
}

#[inline]
fn fire(state: &mut PopulationState, k: usize, i_max: f64, t_ref: f64) {
    state.s[k] = true;
    state.i[k] = i_max;
    state.refractory[k] = t_ref;
}

#[inline]
fn quiet(state: &mut PopulationState, k: usize, dt: f64, i_tau: f64) {
    state.s[k] = false;
    state.i[k] *= 1.0 - dt / i_tau;
}
