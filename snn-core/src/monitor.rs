//! Passive observers sampled at the end of every network tick.

use std::any::Any;
use std::collections::BTreeMap;

use crate::connection::Connection;
use crate::population::Population;

/// Read-only view of a network handed to monitors after each tick.
#[derive(Clone, Copy)]
pub struct Probe<'a> {
    pub(crate) tick: u64,
    pub(crate) populations: &'a BTreeMap<String, Population>,
    pub(crate) connections: &'a BTreeMap<String, Connection>,
}

impl<'a> Probe<'a> {
    /// Ticks completed so far, including the one just applied.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn population(&self, name: &str) -> Option<&'a Population> {
        self.populations.get(name)
    }

    pub fn connection(&self, name: &str) -> Option<&'a Connection> {
        self.connections.get(name)
    }

    pub fn populations(&self) -> impl Iterator<Item = &'a Population> + 'a {
        self.populations.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values()
    }
}

/// Monitor interface. Implementations must copy whatever they keep: the
/// arrays behind a `Probe` change on the next tick.
pub trait Monitor {
    fn name(&self) -> &str;

    /// Called once per tick after plasticity has been applied.
    fn collect(&mut self, probe: Probe<'_>);

    /// Drop everything recorded so far.
    fn clear(&mut self) {}

    /// Concrete access for callers that registered the monitor.
    fn as_any(&self) -> &dyn Any;
}
