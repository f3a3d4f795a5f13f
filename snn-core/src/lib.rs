//! snn-core: discrete-time spiking neural network simulator
//!
//! Populations of leaky integrate-and-fire neurons (plain or adaptive) joined
//! by dense weight matrices, optionally learning through STDP or LTPf, and
//! advanced together by a [`Network`] on a fixed `dt` grid.

pub mod error;
pub mod params;
pub mod neuron;
pub mod population;
pub mod plasticity;
pub mod connection;
pub mod monitor;
pub mod network;

// Re-exports
pub use error::{EntityKind, SnnError, SnnResult};
pub use params::{ParamSet, ParamValue};
pub use neuron::{AdaptiveLifParams, LifParams, NeuronKind, NeuronModel, PopulationState};
pub use population::Population;
pub use plasticity::{Ltpf, Plasticity, PlasticityKind, PlasticityRule, Stdp};
pub use connection::Connection;
pub use monitor::{Monitor, Probe};
pub use network::Network;
