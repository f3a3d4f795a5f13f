//! Online weight plasticity for dense connections.
//!
//! - Trait `PlasticityRule`: per-tick weight update from pre/post spike vectors.
//! - `Stdp`: trace-based spike-timing-dependent plasticity with soft bounds.
//! - `Ltpf`: potentiation gated by post spikes, plus forgetting on post spikes.
//! - `Plasticity`: the variant a connection is built with.
//!
//! Weight matrices are indexed `[post, pre]`. Traces follow
//! `trace <- trace * (1 - dt/tau) + spike`, updated before the weights.

use core::fmt;

use ndarray::{Array1, Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{SnnError, SnnResult};
use crate::params::ParamSet;

/// Plasticity rule interface
pub trait PlasticityRule: fmt::Debug + Send {
    /// Apply one tick of learning to `weight` (shape `[post, pre]`) given the
    /// spikes the source (`pre`) and target (`post`) populations emitted this tick.
    fn update(&mut self, weight: &mut Array2<f64>, dt: f64, pre: ArrayView1<'_, bool>, post: ArrayView1<'_, bool>);

    /// Forget accumulated traces.
    fn reset_traces(&mut self);
}

#[inline]
fn accumulate(trace: &mut Array1<f64>, spikes: ArrayView1<'_, bool>, dt: f64, tau: f64) {
    Zip::from(trace).and(spikes).for_each(|t, &s| {
        *t = *t * (1.0 - dt / tau) + if s { 1.0 } else { 0.0 };
    });
}

#[inline]
fn as_f64(spikes: ArrayView1<'_, bool>) -> Array1<f64> {
    spikes.mapv(|s| if s { 1.0 } else { 0.0 })
}

/// Trace-based STDP:
/// `dw = dt * (Aplus * post ⊗ trace_pre * (1 - w) - Aminus * trace_post ⊗ pre * w)`
#[derive(Debug, Clone, PartialEq)]
pub struct Stdp {
    a_plus: f64,
    a_minus: f64,
    tau_pre: f64,
    tau_post: f64,
    pre_trace: Array1<f64>,
    post_trace: Array1<f64>,
}

impl Stdp {
    pub const REQUIRED: [&'static str; 4] = ["Aplus", "Aminus", "Tpre", "Tpost"];

    pub fn new(a_plus: f64, a_minus: f64, tau_pre: f64, tau_post: f64, pre_n: usize, post_n: usize) -> Self {
        Self {
            a_plus,
            a_minus,
            tau_pre,
            tau_post,
            pre_trace: Array1::zeros(pre_n),
            post_trace: Array1::zeros(post_n),
        }
    }

    pub fn from_params(params: &ParamSet, pre_n: usize, post_n: usize) -> SnnResult<Self> {
        params.require_keys("STDP", &Self::REQUIRED)?;
        Ok(Self::new(
            params.scalar("Aplus")?,
            params.scalar("Aminus")?,
            params.scalar("Tpre")?,
            params.scalar("Tpost")?,
            pre_n,
            post_n,
        ))
    }

    pub fn pre_trace(&self) -> ArrayView1<'_, f64> {
        self.pre_trace.view()
    }

    pub fn post_trace(&self) -> ArrayView1<'_, f64> {
        self.post_trace.view()
    }
}

impl PlasticityRule for Stdp {
    fn update(&mut self, weight: &mut Array2<f64>, dt: f64, pre: ArrayView1<'_, bool>, post: ArrayView1<'_, bool>) {
        accumulate(&mut self.pre_trace, pre, dt, self.tau_pre);
        accumulate(&mut self.post_trace, post, dt, self.tau_post);

        let pre_s = as_f64(pre);
        let post_s = as_f64(post);
        let (a_plus, a_minus) = (self.a_plus, self.a_minus);
        let (pre_tr, post_tr) = (&self.pre_trace, &self.post_trace);

        Zip::indexed(weight).for_each(|(j, i), w| {
            let ltp = a_plus * post_s[j] * pre_tr[i] * (1.0 - *w);
            let ltd = a_minus * pre_s[i] * post_tr[j] * *w;
            *w += dt * (ltp - ltd);
        });
    }

    fn reset_traces(&mut self) {
        self.pre_trace.fill(0.0);
        self.post_trace.fill(0.0);
    }
}

/// Long-term potentiation with forgetting:
/// `dw = dt * (Aplus * post ⊗ trace_pre * (1 - w) - Aforgetting * post ⊗ w)`
#[derive(Debug, Clone, PartialEq)]
pub struct Ltpf {
    a_plus: f64,
    a_forgetting: f64,
    tau_pre: f64,
    pre_trace: Array1<f64>,
}

impl Ltpf {
    pub const REQUIRED: [&'static str; 3] = ["Aplus", "Tpre", "Aforgetting"];

    pub fn new(a_plus: f64, a_forgetting: f64, tau_pre: f64, pre_n: usize) -> Self {
        Self {
            a_plus,
            a_forgetting,
            tau_pre,
            pre_trace: Array1::zeros(pre_n),
        }
    }

    pub fn from_params(params: &ParamSet, pre_n: usize) -> SnnResult<Self> {
        params.require_keys("LTPf", &Self::REQUIRED)?;
        Ok(Self::new(
            params.scalar("Aplus")?,
            params.scalar("Aforgetting")?,
            params.scalar("Tpre")?,
            pre_n,
        ))
    }

    pub fn pre_trace(&self) -> ArrayView1<'_, f64> {
        self.pre_trace.view()
    }
}

impl PlasticityRule for Ltpf {
    fn update(&mut self, weight: &mut Array2<f64>, dt: f64, pre: ArrayView1<'_, bool>, post: ArrayView1<'_, bool>) {
        accumulate(&mut self.pre_trace, pre, dt, self.tau_pre);

        let post_s = as_f64(post);
        let (a_plus, a_forg) = (self.a_plus, self.a_forgetting);
        let pre_tr = &self.pre_trace;

        Zip::indexed(weight).for_each(|(j, i), w| {
            let ltp = a_plus * pre_tr[i] * post_s[j] * (1.0 - *w);
            let forget = a_forg * post_s[j] * *w;
            *w += dt * (ltp - forget);
        });
    }

    fn reset_traces(&mut self) {
        self.pre_trace.fill(0.0);
    }
}

/// Plasticity variant selector used by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlasticityKind {
    #[default]
    Static,
    Stdp,
    Ltpf,
}

/// The learning behaviour a connection is built with.
#[derive(Debug, Default)]
pub enum Plasticity {
    /// Weights never change.
    #[default]
    Static,
    Stdp(Stdp),
    Ltpf(Ltpf),
    /// Caller-supplied rule.
    Custom(Box<dyn PlasticityRule>),
}

impl Plasticity {
    pub fn from_params(kind: PlasticityKind, params: &ParamSet, pre_n: usize, post_n: usize) -> SnnResult<Self> {
        match kind {
            PlasticityKind::Static => Ok(Plasticity::Static),
            PlasticityKind::Stdp => Stdp::from_params(params, pre_n, post_n).map(Plasticity::Stdp),
            PlasticityKind::Ltpf => Ltpf::from_params(params, pre_n).map(Plasticity::Ltpf),
        }
    }

    pub fn custom<R: PlasticityRule + 'static>(rule: R) -> Self {
        Plasticity::Custom(Box::new(rule))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Plasticity::Static => "static",
            Plasticity::Stdp(_) => "stdp",
            Plasticity::Ltpf(_) => "ltpf",
            Plasticity::Custom(_) => "custom",
        }
    }

    pub fn is_plastic(&self) -> bool {
        !matches!(self, Plasticity::Static)
    }

    pub(crate) fn rule_mut(&mut self) -> Option<&mut (dyn PlasticityRule + 'static)> {
        match self {
            Plasticity::Static => None,
            Plasticity::Stdp(r) => Some(r),
            Plasticity::Ltpf(r) => Some(r),
            Plasticity::Custom(r) => Some(r.as_mut()),
        }
    }

    /// Check trace lengths of the built-in rules against the connection's endpoint sizes.
    pub(crate) fn check_sizes(&self, pre_n: usize, post_n: usize) -> SnnResult<()> {
        let mismatch = |what: &str, expected: usize, actual: usize| {
            SnnError::shape(format!("{} trace", what), &[expected], &[actual])
        };
        match self {
            Plasticity::Stdp(r) if r.pre_trace.len() != pre_n => Err(mismatch("STDP pre", pre_n, r.pre_trace.len())),
            Plasticity::Stdp(r) if r.post_trace.len() != post_n => {
                Err(mismatch("STDP post", post_n, r.post_trace.len()))
            }
            Plasticity::Ltpf(r) if r.pre_trace.len() != pre_n => Err(mismatch("LTPf pre", pre_n, r.pre_trace.len())),
            _ => Ok(()),
        }
    }
}
