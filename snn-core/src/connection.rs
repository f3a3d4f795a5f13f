//! Dense synaptic connection between two populations.
//!
//! The weight matrix has shape `(target.N, source.N)`: row `j` collects the
//! input of target neuron `j`, column `i` the output of source neuron `i`.
//! The shape is fixed at construction and every replacement is checked.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{SnnError, SnnResult};
use crate::plasticity::Plasticity;
use crate::population::Population;

#[derive(Debug)]
pub struct Connection {
    name: String,
    source: String,
    target: String,
    weight: Array2<f64>,
    plasticity: Plasticity,
}

/// Normal(0, 1) matrix drawn from the caller's generator.
fn random_weight<R: Rng + ?Sized>(rng: &mut R, shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_simple_fn(shape, || rng.sample::<f64, _>(StandardNormal))
}

impl Connection {
    /// Connect `source` to `target` with an explicit weight matrix.
    pub fn new(
        name: impl Into<String>,
        source: &Population,
        target: &Population,
        weight: Array2<f64>,
        plasticity: Plasticity,
    ) -> SnnResult<Self> {
        let name = name.into();
        let expected = [target.size(), source.size()];
        if weight.shape() != expected {
            return Err(SnnError::shape(format!("weight of connection '{}'", name), &expected, weight.shape()));
        }
        plasticity.check_sizes(source.size(), target.size())?;
        debug!(
            connection = %name,
            source = source.name(),
            target = target.name(),
            rule = plasticity.label(),
            "connection created"
        );
        Ok(Self {
            name,
            source: source.name().to_string(),
            target: target.name().to_string(),
            weight,
            plasticity,
        })
    }

    /// Connect `source` to `target` with normally distributed weights.
    pub fn with_random_weight<R: Rng + ?Sized>(
        name: impl Into<String>,
        source: &Population,
        target: &Population,
        plasticity: Plasticity,
        rng: &mut R,
    ) -> SnnResult<Self> {
        let weight = random_weight(rng, (target.size(), source.size()));
        Self::new(name, source, target, weight, plasticity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the presynaptic population.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the postsynaptic population.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn source_size(&self) -> usize {
        self.weight.ncols()
    }

    pub fn target_size(&self) -> usize {
        self.weight.nrows()
    }

    pub fn weight(&self) -> ArrayView2<'_, f64> {
        self.weight.view()
    }

    pub fn plasticity(&self) -> &Plasticity {
        &self.plasticity
    }

    /// Synaptic input to the target: `weight · source_output`.
    pub fn propagate(&self, source_output: ArrayView1<'_, f64>) -> SnnResult<Array1<f64>> {
        if source_output.len() != self.source_size() {
            return Err(SnnError::shape(
                format!("source output of connection '{}'", self.name),
                &[self.source_size()],
                &[source_output.len()],
            ));
        }
        Ok(self.weight.dot(&source_output))
    }

    /// Apply one tick of the plasticity rule. Static connections are untouched.
    pub fn update_weight(&mut self, dt: f64, pre: ArrayView1<'_, bool>, post: ArrayView1<'_, bool>) -> SnnResult<()> {
        if pre.len() != self.source_size() {
            return Err(SnnError::shape(
                format!("presynaptic spikes of connection '{}'", self.name),
                &[self.source_size()],
                &[pre.len()],
            ));
        }
        if post.len() != self.target_size() {
            return Err(SnnError::shape(
                format!("postsynaptic spikes of connection '{}'", self.name),
                &[self.target_size()],
                &[post.len()],
            ));
        }
        if let Some(rule) = self.plasticity.rule_mut() {
            rule.update(&mut self.weight, dt, pre, post);
            debug_assert_eq!(self.weight.dim(), (post.len(), pre.len()));
        }
        Ok(())
    }

    /// Replace the weights with `new_weight`, which must keep the shape.
    pub fn reset_weight(&mut self, new_weight: Array2<f64>) -> SnnResult<()> {
        if new_weight.shape() != self.weight.shape() {
            return Err(SnnError::shape(
                format!("weight of connection '{}'", self.name),
                self.weight.shape(),
                new_weight.shape(),
            ));
        }
        self.weight = new_weight;
        self.reset_traces();
        Ok(())
    }

    /// Replace the weights with a fresh normal(0, 1) sample.
    pub fn reset_weight_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weight = random_weight(rng, self.weight.dim());
        self.reset_traces();
    }

    fn reset_traces(&mut self) {
        if let Some(rule) = self.plasticity.rule_mut() {
            rule.reset_traces();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamSet;
    use crate::plasticity::{PlasticityKind, Stdp};
    use ndarray::array;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pop(name: &str, n: usize) -> Population {
        let params = ParamSet::new()
            .with("Utay", 10.0)
            .with("Uth", 1.0)
            .with("Urest", 0.0)
            .with("Itay", 10.0)
            .with("Imax", 1.0);
        Population::lif(name, n, &params).unwrap()
    }

    #[test]
    fn random_weight_has_target_by_source_shape() {
        let (pre, post) = (pop("pre", 3), pop("post", 4));
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let c = Connection::with_random_weight("c", &pre, &post, Plasticity::Static, &mut rng).unwrap();
        assert_eq!(c.weight().dim(), (4, 3));
        assert!(c.weight().iter().any(|&w| w != 0.0));
        assert_eq!((c.source(), c.target()), ("pre", "post"));
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let (pre, post) = (pop("pre", 5), pop("post", 2));
        let a = Connection::with_random_weight("a", &pre, &post, Plasticity::Static, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        let b = Connection::with_random_weight("b", &pre, &post, Plasticity::Static, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        assert_eq!(a.weight(), b.weight());
    }

    #[test]
    fn transposed_weight_is_rejected() {
        let (pre, post) = (pop("pre", 3), pop("post", 4));
        let err = Connection::new("c", &pre, &post, Array2::ones((3, 4)), Plasticity::Static).unwrap_err();
        assert!(matches!(err, SnnError::Shape { .. }));
    }

    #[test]
    fn propagate_is_matrix_vector_product() {
        let (pre, post) = (pop("pre", 3), pop("post", 4));
        let w = array![[1.0, 0.0, 2.0], [0.0, 0.0, 1.0], [3.0, -1.0, 0.0], [0.0, 2.0, 1.0]];
        let c = Connection::new("c", &pre, &post, w, Plasticity::Static).unwrap();
        let out = c.propagate(array![1.0, 2.0, 3.0].view()).unwrap();
        assert_eq!(out, array![7.0, 3.0, 1.0, 7.0]);
        assert!(c.propagate(array![1.0].view()).is_err());
    }

    #[test]
    fn reset_weight_checks_shape_and_clears_traces() {
        let (pre, post) = (pop("pre", 2), pop("post", 2));
        let stdp = Stdp::new(0.1, 0.1, 5.0, 5.0, 2, 2);
        let mut c = Connection::new("c", &pre, &post, Array2::zeros((2, 2)), Plasticity::Stdp(stdp)).unwrap();
        c.update_weight(1.0, array![true, true].view(), array![true, false].view()).unwrap();

        let replacement = Array2::from_elem((2, 2), 5.0);
        c.reset_weight(replacement.clone()).unwrap();
        assert_eq!(c.weight(), replacement);
        match c.plasticity() {
            Plasticity::Stdp(s) => assert!(s.pre_trace().iter().all(|&t| t == 0.0)),
            other => panic!("unexpected rule {:?}", other),
        }

        assert!(matches!(c.reset_weight(Array2::zeros((1, 2))), Err(SnnError::Shape { .. })));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        c.reset_weight_random(&mut rng);
        assert_eq!(c.weight().dim(), (2, 2));
        assert_ne!(c.weight(), replacement);
    }

    #[test]
    fn static_update_is_a_no_op() {
        let (pre, post) = (pop("pre", 2), pop("post", 1));
        let mut c = Connection::new("c", &pre, &post, array![[0.3, 0.4]], Plasticity::Static).unwrap();
        c.update_weight(1.0, array![true, true].view(), array![true].view()).unwrap();
        assert_eq!(c.weight(), array![[0.3, 0.4]]);
    }

    #[test]
    fn mis_sized_rule_is_rejected() {
        let (pre, post) = (pop("pre", 2), pop("post", 3));
        let rule = Plasticity::Stdp(Stdp::new(0.1, 0.1, 5.0, 5.0, 3, 2));
        assert!(Connection::new("c", &pre, &post, Array2::zeros((3, 2)), rule).is_err());
    }

    proptest! {
        #[test]
        fn propagate_is_idempotent(seed in any::<u64>(), n_pre in 1usize..8, n_post in 1usize..8) {
            let (pre, post) = (pop("pre", n_pre), pop("post", n_post));
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let c = Connection::with_random_weight("c", &pre, &post, Plasticity::Static, &mut rng).unwrap();
            let x = Array1::from_shape_fn(n_pre, |i| i as f64 * 0.5 - 1.0);
            let first = c.propagate(x.view()).unwrap();
            let second = c.propagate(x.view()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn shape_survives_learning(
            seed in any::<u64>(),
            n_pre in 1usize..6,
            n_post in 1usize..6,
            ticks in 1usize..20,
            ltpf in any::<bool>(),
        ) {
            let (pre, post) = (pop("pre", n_pre), pop("post", n_post));
            let params = ParamSet::new()
                .with("Aplus", 0.05)
                .with("Aminus", 0.05)
                .with("Aforgetting", 0.01)
                .with("Tpre", 5.0)
                .with("Tpost", 5.0);
            let kind = if ltpf { PlasticityKind::Ltpf } else { PlasticityKind::Stdp };
            let rule = Plasticity::from_params(kind, &params, n_pre, n_post).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut c = Connection::with_random_weight("c", &pre, &post, rule, &mut rng).unwrap();
            for t in 0..ticks {
                let pre_s = Array1::from_shape_fn(n_pre, |i| (i + t) % 2 == 0);
                let post_s = Array1::from_shape_fn(n_post, |j| (j + t) % 3 == 0);
                c.update_weight(1.0, pre_s.view(), post_s.view()).unwrap();
                prop_assert_eq!(c.weight().dim(), (n_post, n_pre));
            }
            c.reset_weight_random(&mut rng);
            prop_assert_eq!(c.weight().dim(), (n_post, n_pre));
        }
    }
}
