use ml_core::{
    ParamState,
    arch::{ModelSpec, Sequential},
    export_state, import_state, uniform_init,
};
use rand::Rng;

use crate::Result;

/// The shared model state driven through federated rounds.
///
/// Owns the architecture descriptor, a runnable network built from it and the
/// flat parameter buffer. Parameters only change by wholesale replacement with
/// an aggregated state, never by partial in-place edits.
pub struct GlobalModel {
    spec: ModelSpec,
    net: Sequential,
    params: Vec<f32>,
}

impl GlobalModel {
    /// Creates a new `GlobalModel` with zeroed parameters.
    ///
    /// # Arguments
    /// * `spec` - The architecture descriptor to build the model from.
    ///
    /// # Errors
    /// Returns `FlErr` if the descriptor is invalid.
    pub fn new(spec: ModelSpec) -> Result<Self> {
        let net = spec.build()?;
        let params = vec![0.0; spec.num_params()];

        Ok(Self { spec, net, params })
    }

    /// Creates a new `GlobalModel` with uniformly sampled parameters.
    ///
    /// # Arguments
    /// * `spec` - The architecture descriptor to build the model from.
    /// * `low` - The inclusive lower sampling limit.
    /// * `high` - The exclusive upper sampling limit.
    /// * `rng` - A random number generator.
    ///
    /// # Errors
    /// Returns `FlErr` if the descriptor or the sampling range is invalid.
    pub fn init_uniform<R: Rng>(spec: ModelSpec, low: f32, high: f32, rng: &mut R) -> Result<Self> {
        let net = spec.build()?;
        let params = uniform_init(spec.num_params(), low, high, rng)?;

        Ok(Self { spec, net, params })
    }

    #[inline]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    #[inline]
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    #[inline]
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Returns an independent copy of the network for a device's local pass.
    pub fn clone_net(&self) -> Sequential {
        self.net.clone()
    }

    /// Copies the parameters out into a named-parameter state.
    pub fn state(&self) -> ParamState {
        export_state(&self.spec.layout(), &self.params)
    }

    /// Replaces every parameter with the values of the given state.
    ///
    /// # Errors
    /// Returns `FlErr` if the state does not match the model layout exactly.
    pub fn load_state(&mut self, state: &ParamState) -> Result<()> {
        import_state(&self.spec.layout(), state, &mut self.params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ml_core::arch::LayerSpec;

    use super::*;

    fn spec() -> ModelSpec {
        ModelSpec {
            layers: vec![LayerSpec::Dense { input: 2, output: 1, act_fn: None }],
        }
    }

    #[test]
    fn state_roundtrip_replaces_wholesale() {
        let model = GlobalModel::new(spec()).unwrap();
        let mut state = model.state();
        for tensor in state.values_mut() {
            tensor.data.fill(2.5);
        }

        let mut target = GlobalModel::new(spec()).unwrap();
        target.load_state(&state).unwrap();
        assert_eq!(target.params(), &[2.5, 2.5, 2.5]);
    }

    #[test]
    fn load_state_rejects_foreign_layouts() {
        let other = ModelSpec {
            layers: vec![LayerSpec::Dense { input: 3, output: 1, act_fn: None }],
        };

        let donor = GlobalModel::new(other).unwrap();
        let mut model = GlobalModel::new(spec()).unwrap();
        assert!(model.load_state(&donor.state()).is_err());
    }
}
