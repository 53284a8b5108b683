use ndarray::{Array2, ArrayView2};

use super::{Dense, LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and
/// backward when computing the deltas of its layers.
///
/// The model owns no parameters; every pass reads them from a flat buffer
/// partitioned by layer size.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the model is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer.
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// The model output for the given batch.
    ///
    /// # Errors
    /// Returns `MlErr` if `params` or `x` violate shape invariants.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params("params", params.len())?;

        let mut out = x.to_owned();
        let mut offset = 0;

        for layer in self.layers.iter_mut() {
            let size = layer.size();
            out = layer.forward(&params[offset..offset + size], out.view())?;
            offset += size;
        }

        Ok(out)
    }

    /// Runs one optimization step over a single batch: forward pass, loss
    /// gradient, backward pass, parameter update.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer, updated in place.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to apply the gradient.
    /// * `x` - The input batch.
    /// * `y` - The target batch, same row count as `x`.
    ///
    /// # Returns
    /// The batch loss.
    ///
    /// # Errors
    /// Returns `MlErr` if buffers or batches violate shape invariants.
    pub fn train_batch<L, O>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
    {
        self.check_params("grad", grad.len())?;
        if x.nrows() != y.nrows() {
            return Err(MlErr::ShapeMismatch {
                what: "batch",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        grad.fill(0.0);

        let y_pred = self.forward(params, x)?;
        if y_pred.ncols() != y.ncols() {
            return Err(MlErr::ShapeMismatch {
                what: "targets",
                got: y.ncols(),
                expected: y_pred.ncols(),
            });
        }

        let loss = loss_fn.loss(y_pred.view(), y);
        let mut d = loss_fn.loss_prime(y_pred.view(), y);

        let mut offset = self.size();
        for layer in self.layers.iter_mut().rev() {
            let size = layer.size();
            offset -= size;
            d = layer.backward(
                &params[offset..offset + size],
                &mut grad[offset..offset + size],
                d,
            )?;
        }

        optimizer.update_params(grad, params)?;

        Ok(loss)
    }

    fn check_params(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::ShapeMismatch { what, got, expected });
        }
        Ok(())
    }
}
