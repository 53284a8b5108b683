use serde::{Deserialize, Serialize};

use super::{ActFn, Dense, Sequential};
use crate::{MlErr, ParamEntry, Result};

/// A serializable description of a model's architecture.
///
/// The descriptor is the durable half of a checkpoint: it is written once per
/// candidate model and stays valid for every per-round parameter snapshot
/// produced from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    Dense {
        input: usize,
        output: usize,
        act_fn: Option<ActFn>,
    },
}

impl LayerSpec {
    /// Returns the number of scalar parameters this layer holds.
    pub fn size(&self) -> usize {
        match *self {
            LayerSpec::Dense { input, output, .. } => (input + 1) * output,
        }
    }

    fn dims(&self) -> (usize, usize) {
        match *self {
            LayerSpec::Dense { input, output, .. } => (input, output),
        }
    }
}

impl ModelSpec {
    /// Checks the structural invariants of the descriptor.
    ///
    /// # Errors
    /// Returns `MlErr` if the descriptor has no layers, a layer has a zero
    /// dimension, or adjacent layers have incompatible dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(MlErr::InvalidInput("model must have at least one layer"));
        }

        for layer in &self.layers {
            let (input, output) = layer.dims();
            if input == 0 || output == 0 {
                return Err(MlErr::InvalidInput("layer dimensions must be positive"));
            }
        }

        for i in 1..self.layers.len() {
            let prev_out = self.layers[i - 1].dims().1;
            let curr_in = self.layers[i].dims().0;
            if prev_out != curr_in {
                return Err(MlErr::ShapeMismatch {
                    what: "adjacent layer dims",
                    got: curr_in,
                    expected: prev_out,
                });
            }
        }

        Ok(())
    }

    /// Returns the total number of scalar parameters the model holds.
    pub fn num_params(&self) -> usize {
        self.layers.iter().map(LayerSpec::size).sum()
    }

    /// Returns the width of the model's input rows.
    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.dims().0)
    }

    /// Returns the width of the model's output rows.
    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.dims().1)
    }

    /// Builds a runnable model from the descriptor.
    ///
    /// # Errors
    /// Returns `MlErr` if the descriptor is invalid.
    pub fn build(&self) -> Result<Sequential> {
        self.validate()?;

        let layers: Vec<Dense> = self
            .layers
            .iter()
            .map(|layer| match *layer {
                LayerSpec::Dense { input, output, act_fn } => Dense::new((input, output), act_fn),
            })
            .collect();

        Ok(Sequential::new(layers))
    }

    /// Derives the named-parameter layout of the flat parameter buffer.
    ///
    /// Entry order follows the buffer: each dense layer contributes
    /// `denseN.weight` (shape `[input, output]`) followed by `denseN.bias`
    /// (shape `[output]`).
    pub fn layout(&self) -> Vec<ParamEntry> {
        let mut entries = Vec::with_capacity(self.layers.len() * 2);
        let mut offset = 0;

        for (i, layer) in self.layers.iter().enumerate() {
            let (input, output) = layer.dims();

            entries.push(ParamEntry {
                name: format!("dense{i}.weight"),
                offset,
                shape: vec![input, output],
            });
            offset += input * output;

            entries.push(ParamEntry {
                name: format!("dense{i}.bias"),
                offset,
                shape: vec![output],
            });
            offset += output;
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer() -> ModelSpec {
        ModelSpec {
            layers: vec![
                LayerSpec::Dense { input: 3, output: 4, act_fn: Some(ActFn::Sigmoid) },
                LayerSpec::Dense { input: 4, output: 2, act_fn: None },
            ],
        }
    }

    #[test]
    fn num_params_counts_weights_and_biases() {
        // (3 + 1) * 4 + (4 + 1) * 2
        assert_eq!(two_layer().num_params(), 26);
    }

    #[test]
    fn validate_rejects_dim_mismatch() {
        let spec = ModelSpec {
            layers: vec![
                LayerSpec::Dense { input: 3, output: 4, act_fn: None },
                LayerSpec::Dense { input: 5, output: 2, act_fn: None },
            ],
        };

        assert!(matches!(
            spec.validate(),
            Err(MlErr::ShapeMismatch { got: 5, expected: 4, .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_model() {
        let spec = ModelSpec { layers: vec![] };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn layout_covers_the_whole_buffer() {
        let spec = two_layer();
        let layout = spec.layout();

        assert_eq!(layout.len(), 4);
        assert_eq!(layout[0].name, "dense0.weight");
        assert_eq!(layout[0].shape, vec![3, 4]);
        assert_eq!(layout[1].name, "dense0.bias");
        assert_eq!(layout[1].offset, 12);
        assert_eq!(layout[3].name, "dense1.bias");

        let last = &layout[3];
        assert_eq!(last.offset + last.len(), spec.num_params());
    }
}
