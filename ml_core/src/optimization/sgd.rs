use super::Optimizer;
use crate::{MlErr, Result};

/// Stochastic gradient descent with momentum and L2 weight decay.
#[derive(Debug)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: Box<[f32]>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The velocity retention factor.
    /// * `weight_decay` - The L2 penalty coefficient folded into the gradient.
    ///
    /// # Returns
    /// A new `Sgd` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            velocity: vec![0.0; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::ShapeMismatch {
                what: "grad",
                got: grad.len(),
                expected: params.len(),
            });
        }
        if params.len() != self.velocity.len() {
            return Err(MlErr::ShapeMismatch {
                what: "params",
                got: params.len(),
                expected: self.velocity.len(),
            });
        }

        let lr = self.learning_rate;
        let mu = self.momentum;
        let wd = self.weight_decay;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                let g = g + wd * *p;
                *v = (mu * *v) + g;
                *p -= lr * *v;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_descent_step() {
        let mut sgd = Sgd::new(2, 0.1, 0.0, 0.0);
        let mut params = [1.0, -1.0];

        sgd.update_params(&[0.5, -0.5], &mut params).unwrap();
        assert!((params[0] - 0.95).abs() < 1e-6);
        assert!((params[1] - (-0.95)).abs() < 1e-6);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let mut sgd = Sgd::new(1, 0.1, 0.9, 0.0);
        let mut params = [1.0];

        // v = 0.5, p = 1 - 0.05
        sgd.update_params(&[0.5], &mut params).unwrap();
        assert!((params[0] - 0.95).abs() < 1e-6);

        // v = 0.9 * 0.5 + 0.5 = 0.95, p = 0.95 - 0.095
        sgd.update_params(&[0.5], &mut params).unwrap();
        assert!((params[0] - 0.855).abs() < 1e-6);
    }

    #[test]
    fn weight_decay_shrinks_params_without_gradient() {
        let mut sgd = Sgd::new(1, 0.1, 0.0, 0.1);
        let mut params = [1.0];

        sgd.update_params(&[0.0], &mut params).unwrap();
        assert!((params[0] - 0.99).abs() < 1e-6);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut sgd = Sgd::new(2, 0.1, 0.0, 0.0);
        let mut params = [1.0, 2.0];

        assert!(matches!(
            sgd.update_params(&[0.0], &mut params),
            Err(MlErr::ShapeMismatch { .. })
        ));
    }
}
