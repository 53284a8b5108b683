use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use federation::{
    FlErr, PartitionedDataset, RoundConfig, checkpoint::PARAMS_EXT, registry, run_rounds,
};
use log::info;
use ml_core::Dataset;
use rand::{SeedableRng, rngs::StdRng};

use crate::{Args, DriverErr, cifar};

/// Sentinel model name selecting every candidate checkpoint in `worker/`.
pub const ALL_MODELS: &str = "ALL";

/// Runs federated learning over the configured candidate models.
///
/// The data loader is restored once from `master/` and shared read-only
/// across every candidate and round; each candidate's rounds write their
/// checkpoints next to it in `worker/`.
///
/// # Errors
/// Returns `DriverErr` on configuration problems (fail fast, before any
/// training) or when a candidate's run aborts.
pub fn run(args: &Args) -> Result<(), DriverErr> {
    let num_classes = registry::class_count(&args.dataset)?;

    let master = args.dir.join("master");
    let worker = args.dir.join("worker");
    if !master.is_dir() {
        return Err(DriverErr::MissingDir(master));
    }
    if !worker.is_dir() {
        return Err(DriverErr::MissingDir(worker));
    }

    let batch_size = NonZeroUsize::new(args.batch_size)
        .ok_or_else(|| DriverErr::InvalidConfig("batch size must be positive".into()))?;

    let dataset = load_dataset(&args.dataset, &args.dataset_path)?;
    let snapshot = master.join(format!("{}.partitions.json", args.dataset));
    let provider = PartitionedDataset::load(dataset, &args.dataset, batch_size, &snapshot)?;
    info!(
        devices = provider.num_devices();
        "restored partition table from {}",
        snapshot.display()
    );

    let candidates = resolve_candidates(&worker, &args.model_name)?;

    let cfg = RoundConfig {
        global_epochs: args.global_epochs,
        local_epochs: args.local_epochs,
        learning_rate: args.learning_rate,
        momentum: args.momentum,
        weight_decay: args.weight_decay,
        skip_ratio: args.skip_ratio,
        num_classes,
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    for candidate in &candidates {
        info!("federated learning on model {}", candidate.display());
        run_rounds(candidate, &provider, &cfg, &mut rng)?;
    }

    Ok(())
}

fn load_dataset(name: &str, path: &Path) -> Result<Dataset, DriverErr> {
    match name {
        "cifar10" => cifar::load_training(path),
        other => Err(FlErr::UnknownDataset { name: other.to_string() }.into()),
    }
}

/// Resolves the candidate set under `worker/`.
///
/// With the `ALL` sentinel, every file carrying the candidate extension is
/// selected; round outputs append a suffix to the full file name and are
/// therefore never picked up again.
///
/// # Errors
/// Returns `DriverErr` if a named candidate is missing or the sentinel finds
/// nothing.
pub fn resolve_candidates(worker: &Path, model_name: &str) -> Result<Vec<PathBuf>, DriverErr> {
    if model_name != ALL_MODELS {
        let path = worker.join(model_name);
        if !path.is_file() {
            return Err(DriverErr::MissingCandidate(path));
        }
        return Ok(vec![path]);
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(worker)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(PARAMS_EXT) {
            candidates.push(path);
        }
    }

    if candidates.is_empty() {
        return Err(DriverErr::NoCandidates(worker.to_path_buf()));
    }

    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn all_sentinel_skips_round_outputs_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let worker = dir.path();

        fs::write(worker.join("a.safetensors"), b"x").unwrap();
        fs::write(worker.join("b.safetensors"), b"x").unwrap();
        fs::write(worker.join("a.safetensors_FLepoch_0"), b"x").unwrap();
        fs::write(worker.join("a.arch.json"), b"x").unwrap();
        fs::write(worker.join("notes.txt"), b"x").unwrap();

        let candidates = resolve_candidates(worker, ALL_MODELS).unwrap();
        let names: Vec<_> = candidates
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.safetensors", "b.safetensors"]);
    }

    #[test]
    fn named_candidate_must_exist() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            resolve_candidates(dir.path(), "missing.safetensors"),
            Err(DriverErr::MissingCandidate(_))
        ));
    }

    #[test]
    fn empty_worker_dir_with_sentinel_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            resolve_candidates(dir.path(), ALL_MODELS),
            Err(DriverErr::NoCandidates(_))
        ));
    }
}
