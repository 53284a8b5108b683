use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{MlErr, Result};

/// Samples a flat parameter buffer from a uniform distribution.
///
/// # Arguments
/// * `len` - The amount of parameters to generate.
/// * `low` - The inclusive lower limit.
/// * `high` - The exclusive upper limit.
/// * `rng` - A random number generator.
///
/// # Returns
/// An error if the range is invalid (low > high).
pub fn uniform_init<R: Rng>(len: usize, low: f32, high: f32, rng: &mut R) -> Result<Vec<f32>> {
    let distribution =
        Uniform::new(low, high).map_err(|_| MlErr::InvalidInput("invalid uniform range"))?;

    Ok((0..len).map(|_| distribution.sample(rng)).collect())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = uniform_init(100, -0.5, 0.5, &mut rng).unwrap();

        assert_eq!(params.len(), 100);
        assert!(params.iter().all(|p| (-0.5..0.5).contains(p)));
    }

    #[test]
    fn same_seed_samples_identically() {
        let mut a = StdRng::seed_from_u64(13);
        let mut b = StdRng::seed_from_u64(13);

        assert_eq!(
            uniform_init(16, -1.0, 1.0, &mut a).unwrap(),
            uniform_init(16, -1.0, 1.0, &mut b).unwrap()
        );
    }

    #[test]
    fn rejects_inverted_range() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(uniform_init(4, 1.0, -1.0, &mut rng).is_err());
    }
}
