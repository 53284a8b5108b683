use std::{path::Path, time::Instant};

use log::{debug, info};
use rand::Rng;

use crate::{
    DataProvider, FlErr, Result, StateSum, checkpoint, device::device_train,
};

/// Hyperparameters of a federated run over one candidate model.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    /// Number of global rounds to drive.
    pub global_epochs: usize,
    /// Full passes over a device's partition per local training step.
    pub local_epochs: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    /// Per-device, per-round independent probability of non-participation.
    pub skip_ratio: f64,
    /// Class count of the dataset, resolved from the registry.
    pub num_classes: usize,
}

impl RoundConfig {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    /// Returns `FlErr::InvalidConfig` describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.global_epochs == 0 {
            return Err(FlErr::InvalidConfig("global_epochs must be positive".into()));
        }
        if self.local_epochs == 0 {
            return Err(FlErr::InvalidConfig("local_epochs must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(FlErr::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.momentum.is_finite() || self.momentum < 0.0 {
            return Err(FlErr::InvalidConfig(format!(
                "momentum must be non-negative, got {}",
                self.momentum
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(FlErr::InvalidConfig(format!(
                "weight decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        if !(0.0..=1.0).contains(&self.skip_ratio) {
            return Err(FlErr::InvalidConfig(format!(
                "skip ratio must be within [0, 1], got {}",
                self.skip_ratio
            )));
        }
        if self.num_classes == 0 {
            return Err(FlErr::InvalidConfig("class count must be positive".into()));
        }

        Ok(())
    }
}

/// Drives sequential federated rounds over one candidate model.
///
/// Every round selects participating devices, trains each on an independent
/// copy of the current global parameters, aggregates the results weighted by
/// sample count and persists the new global state under a round-indexed name.
/// Rounds are never retried: the first failure aborts the remaining rounds
/// for this candidate, leaving prior checkpoints on disk as manual resume
/// points.
///
/// # Arguments
/// * `model_path` - Parameter snapshot of the base model, its descriptor
///   resolved next to it.
/// * `provider` - The per-device data source, read only for the whole run.
/// * `cfg` - The round configuration.
/// * `rng` - The random source for the per-device skip draws; seeding it
///   fixes the exact participation sequence.
///
/// # Errors
/// Returns `FlErr` on configuration, training, aggregation, or checkpoint
/// failures. A round with no participants is an error, not a silent no-op.
pub fn run_rounds<P, R>(
    model_path: &Path,
    provider: &P,
    cfg: &RoundConfig,
    rng: &mut R,
) -> Result<()>
where
    P: DataProvider,
    R: Rng,
{
    cfg.validate()?;

    let mut global = checkpoint::load_model(model_path)?;
    let devices = provider.device_data_idxs().len();
    info!(
        devices = devices,
        rounds = cfg.global_epochs;
        "starting federated run on {}",
        model_path.display()
    );

    for round in 0..cfg.global_epochs {
        let started = Instant::now();
        let mut sum = StateSum::new();
        let mut participants = 0usize;

        for device_id in 0..devices {
            if rng.random::<f64>() < cfg.skip_ratio {
                debug!(round = round, device_id = device_id; "device skipped this round");
                continue;
            }

            let loader = provider.training_data_loader(device_id)?;
            let weight = provider.device_data_idxs()[device_id].len();

            let state = device_train(&global, &loader, cfg)?;
            sum.accumulate(&state, weight)?;
            participants += 1;

            debug!(round = round, device_id = device_id, weight = weight; "device update folded in");
        }

        let new_state = sum.finalize().ok_or(FlErr::NoParticipants { round })?;
        global.load_state(&new_state)?;

        let out = checkpoint::round_path(model_path, round);
        checkpoint::save_params(&global.state(), &out)?;

        info!(
            round = round,
            participants = participants;
            "round finished in {:.2}s, checkpoint at {}",
            started.elapsed().as_secs_f64(),
            out.display()
        );
    }

    Ok(())
}
