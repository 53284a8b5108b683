use ndarray::{Array2, ArrayView2, Zip};

pub trait LossFn {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}

/// Binary cross entropy on raw logits, averaged over every element.
///
/// With multi-class one-hot targets this treats each class as an independent
/// binary problem, which is the intended pairing for one-hot encoded labels.
/// Uses the `max(z, 0) - z * y + ln(1 + e^(-|z|))` form so large logits do
/// not overflow the exponential.
#[derive(Default, Clone, Copy)]
pub struct BceWithLogits;

impl BceWithLogits {
    /// Returns a new `BceWithLogits`.
    pub fn new() -> Self {
        Self
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl LossFn for BceWithLogits {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let mut total = 0.0;
        Zip::from(&y_pred).and(&y).for_each(|&z, &y| {
            total += z.max(0.0) - z * y + (-z.abs()).exp().ln_1p();
        });

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len() as f32;
        let mut d = Array2::zeros(y_pred.raw_dim());
        Zip::from(&mut d).and(&y_pred).and(&y).for_each(|d, &z, &y| {
            *d = (sigmoid(z) - y) / n;
        });

        d
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn loss_at_zero_logit_is_ln_two() {
        let bce = BceWithLogits::new();
        let z = array![[0.0]];
        let y = array![[1.0]];

        assert!((bce.loss(z.view(), y.view()) - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn loss_prime_is_sigmoid_minus_target_over_n() {
        let bce = BceWithLogits::new();
        let z = array![[0.0, 0.0]];
        let y = array![[1.0, 0.0]];

        let d = bce.loss_prime(z.view(), y.view());
        assert!((d[[0, 0]] - (-0.25)).abs() < 1e-6);
        assert!((d[[0, 1]] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn loss_is_stable_for_large_logits() {
        let bce = BceWithLogits::new();
        let z = array![[1000.0, -1000.0]];
        let y = array![[1.0, 0.0]];

        let loss = bce.loss(z.view(), y.view());
        assert!(loss.is_finite());
        assert!(loss.abs() < 1e-6);
    }
}
