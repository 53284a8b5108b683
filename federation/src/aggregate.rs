use ml_core::{ParamState, Tensor};
use rayon::prelude::*;

use crate::{FlErr, Result};

/// Running weighted sum of device parameter states within one round.
///
/// Each contribution adds `weight * value` per named tensor; `finalize`
/// divides by the total weight that actually contributed, so devices that
/// skipped the round automatically renormalize the average.
#[derive(Default)]
pub struct StateSum {
    sum: ParamState,
    total_weight: usize,
}

impl StateSum {
    /// Creates an empty `StateSum`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one device's parameter state into the running sum.
    ///
    /// The first occurrence of a parameter name creates its accumulator; the
    /// input state is read only, never retained.
    ///
    /// # Arguments
    /// * `state` - The device's post-training parameter state.
    /// * `weight` - The device's local sample count.
    ///
    /// # Errors
    /// Returns `FlErr` if a tensor's shape differs from its accumulator.
    pub fn accumulate(&mut self, state: &ParamState, weight: usize) -> Result<()> {
        let scale = weight as f32;

        for (name, tensor) in state {
            match self.sum.get_mut(name) {
                Some(acc) => {
                    if acc.shape != tensor.shape {
                        return Err(FlErr::StateMismatch {
                            name: name.clone(),
                            reason: "tensor shape differs across devices",
                        });
                    }
                    for (a, v) in acc.data.iter_mut().zip(&tensor.data) {
                        *a += v * scale;
                    }
                }
                None => {
                    let data = tensor.data.iter().map(|v| v * scale).collect();
                    self.sum.insert(
                        name.clone(),
                        Tensor { shape: tensor.shape.clone(), data },
                    );
                }
            }
        }

        self.total_weight += weight;
        Ok(())
    }

    /// Returns the sample count accumulated so far.
    #[inline]
    pub fn total_weight(&self) -> usize {
        self.total_weight
    }

    /// Divides the sum through by the total contributed weight.
    ///
    /// # Returns
    /// The aggregated state, or `None` when nothing contributed; the caller
    /// decides whether that aborts the round or the run.
    pub fn finalize(self) -> Option<ParamState> {
        if self.total_weight == 0 {
            return None;
        }

        let total = self.total_weight as f32;
        let mut sum = self.sum;
        sum.par_iter_mut().for_each(|(_, tensor)| {
            for v in &mut tensor.data {
                *v /= total;
            }
        });

        Some(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: f32) -> ParamState {
        let mut s = ParamState::new();
        s.insert("dense0.weight".into(), Tensor { shape: vec![1], data: vec![value] });
        s
    }

    #[test]
    fn weighted_mean_of_two_devices() {
        let mut sum = StateSum::new();
        sum.accumulate(&state(6.0), 3).unwrap();
        sum.accumulate(&state(2.0), 1).unwrap();

        // (3 * 6 + 1 * 2) / 4
        let agg = sum.finalize().unwrap();
        assert_eq!(agg["dense0.weight"].data, vec![5.0]);
    }

    #[test]
    fn aggregation_is_order_independent() {
        // Integer-valued params keep f32 accumulation exact under any order.
        let contributions = [(1.0, 2), (5.0, 3), (9.0, 4)];

        let mut forward = StateSum::new();
        for (value, weight) in contributions {
            forward.accumulate(&state(value), weight).unwrap();
        }

        let mut backward = StateSum::new();
        for (value, weight) in contributions.iter().rev() {
            backward.accumulate(&state(*value), *weight).unwrap();
        }

        assert_eq!(
            forward.finalize().unwrap(),
            backward.finalize().unwrap()
        );
    }

    #[test]
    fn single_device_aggregates_to_itself() {
        let mut sum = StateSum::new();
        sum.accumulate(&state(3.25), 17).unwrap();

        let agg = sum.finalize().unwrap();
        assert_eq!(agg["dense0.weight"].data, vec![3.25]);
    }

    #[test]
    fn empty_round_finalizes_to_none() {
        assert!(StateSum::new().finalize().is_none());
    }

    #[test]
    fn shape_drift_across_devices_is_rejected() {
        let mut sum = StateSum::new();
        sum.accumulate(&state(1.0), 1).unwrap();

        let mut bad = ParamState::new();
        bad.insert(
            "dense0.weight".into(),
            Tensor { shape: vec![2], data: vec![1.0, 2.0] },
        );

        assert!(matches!(
            sum.accumulate(&bad, 1),
            Err(FlErr::StateMismatch { .. })
        ));
    }
}
