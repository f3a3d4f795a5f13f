//! Flat key/value parameter sets and their normalisation into per-neuron vectors.
//!
//! A `ParamSet` is what callers (and config files) hand to constructors. It is
//! never mutated by the engine: broadcasting a scalar to a population size
//! produces a fresh `Array1`.

use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{SnnError, SnnResult};

/// A single parameter: one value for every neuron, or one value per neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Scalar(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Vector(v)
    }
}

impl From<&[f64]> for ParamValue {
    fn from(v: &[f64]) -> Self {
        ParamValue::Vector(v.to_vec())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Fails with every missing key listed, not just the first one.
    pub fn require_keys(&self, owner: &str, keys: &[&str]) -> SnnResult<()> {
        let missing: Vec<&str> = keys.iter().copied().filter(|k| !self.contains(k)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SnnError::Configuration(format!(
                "{} is missing required parameter(s): {}",
                owner,
                missing.join(", ")
            )))
        }
    }

    /// Required per-neuron parameter, broadcast to `n`.
    pub fn vector(&self, key: &str, n: usize) -> SnnResult<Array1<f64>> {
        match self.get(key) {
            Some(value) => broadcast(key, value, n),
            None => Err(SnnError::Configuration(format!("missing parameter '{}'", key))),
        }
    }

    /// Optional per-neuron parameter, broadcast to `n`; `default` fills every neuron when absent.
    pub fn vector_or(&self, key: &str, n: usize, default: f64) -> SnnResult<Array1<f64>> {
        match self.get(key) {
            Some(value) => broadcast(key, value, n),
            None => Ok(Array1::from_elem(n, default)),
        }
    }

    /// Required scalar parameter. Vectors are rejected.
    pub fn scalar(&self, key: &str) -> SnnResult<f64> {
        match self.get(key) {
            Some(ParamValue::Scalar(v)) => Ok(*v),
            Some(ParamValue::Vector(_)) => Err(SnnError::Configuration(format!(
                "parameter '{}' must be a scalar",
                key
            ))),
            None => Err(SnnError::Configuration(format!("missing parameter '{}'", key))),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = ParamSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

fn broadcast(key: &str, value: &ParamValue, n: usize) -> SnnResult<Array1<f64>> {
    match value {
        ParamValue::Scalar(v) => Ok(Array1::from_elem(n, *v)),
        ParamValue::Vector(v) if v.len() == n => Ok(Array1::from(v.clone())),
        ParamValue::Vector(v) => Err(SnnError::shape(format!("parameter '{}'", key), &[n], &[v.len()])),
    }
}
