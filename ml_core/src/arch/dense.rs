use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, linalg};

use super::ActFn;
use crate::{MlErr, Result};

/// A fully connected layer over a flat parameter slice.
///
/// The slice holds the weight matrix (`input * output`, row major) followed by
/// the bias vector (`output`). The layer caches its input and weighted sums
/// during the forward pass; `backward` is only valid after a matching
/// `forward` call.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The `(input, output)` dimensions of the layer.
    /// * `act_fn` - An optional activation applied on top of the weighted sums.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: Array2::zeros((0, 0)),
            z: Array2::zeros((0, 0)),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the flat parameter buffer.
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// The layer's output batch.
    ///
    /// # Errors
    /// Returns `MlErr` if `params` or `x` do not match the layer dimensions.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::ShapeMismatch {
                what: "input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        self.x = x.to_owned();
        self.z = z;

        let out = match self.act_fn {
            Some(act_fn) => self.z.mapv(|z| act_fn.f(z)),
            None => self.z.clone(),
        };

        Ok(out)
    }

    /// Makes a backward pass through the layer, accumulating its gradient.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the flat parameter buffer.
    /// * `grad` - This layer's slice of the flat gradient buffer.
    /// * `d` - The delta propagated from the next layer.
    ///
    /// # Returns
    /// The delta to propagate to the previous layer.
    ///
    /// # Errors
    /// Returns `MlErr` if the slices do not match the layer dimensions.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut d_prev = Array2::zeros((d.nrows(), self.dim.0));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut d_prev);

        Ok(d_prev)
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size {
            return Err(MlErr::ShapeMismatch {
                what: "params",
                got: params.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])
            .map_err(|_| MlErr::InvalidInput("parameter slice is not contiguous"))?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])
            .map_err(|_| MlErr::InvalidInput("parameter slice is not contiguous"))?;
        Ok((weights, biases))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size {
            return Err(MlErr::ShapeMismatch {
                what: "grad",
                got: grad.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)
            .map_err(|_| MlErr::InvalidInput("gradient slice is not contiguous"))?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)
            .map_err(|_| MlErr::InvalidInput("gradient slice is not contiguous"))?;
        Ok((dw, db))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_an_affine_map() {
        let mut layer = Dense::new((2, 1), None);
        // w = [2, 3]^T, b = [1]
        let params = [2.0, 3.0, 1.0];
        let x = array![[1.0, 1.0], [0.0, 2.0]];

        let out = layer.forward(&params, x.view()).unwrap();
        assert_eq!(out, array![[6.0], [7.0]]);
    }

    #[test]
    fn backward_computes_exact_gradients() {
        let mut layer = Dense::new((1, 1), None);
        // w = 2, b = 1
        let params = [2.0, 1.0];
        let x = array![[3.0]];

        let out = layer.forward(&params, x.view()).unwrap();
        assert_eq!(out, array![[7.0]]);

        let mut grad = [0.0, 0.0];
        let d_prev = layer
            .backward(&params, &mut grad, array![[1.0]])
            .unwrap();

        // dw = x^T * d = 3, db = 1, d_prev = d * w^T = 2
        assert_eq!(grad, [3.0, 1.0]);
        assert_eq!(d_prev, array![[2.0]]);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut layer = Dense::new((2, 1), None);
        let params = [0.0; 3];
        let x = array![[1.0, 2.0, 3.0]];

        assert!(matches!(
            layer.forward(&params, x.view()),
            Err(MlErr::ShapeMismatch { what: "input", got: 3, expected: 2 })
        ));
    }
}
