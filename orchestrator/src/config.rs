use std::path::PathBuf;

use clap::Parser;

/// Launcher arguments for a federated run over candidate model checkpoints.
#[derive(Parser, Debug)]
#[command(
    name = "orchestrator",
    about = "Federated learning simulation over candidate model checkpoints"
)]
pub struct Args {
    /// Base directory holding master/ and worker/.
    pub dir: PathBuf,

    /// Candidate file name under worker/, or ALL for every checkpoint there.
    pub model_name: String,

    /// Path to the dataset directory.
    pub dataset_path: PathBuf,

    /// Dataset to train on, chosen from the registered loaders.
    #[arg(short = 'd', long, default_value = "cifar10")]
    pub dataset: String,

    /// Number of global rounds to run per candidate.
    #[arg(long, default_value_t = 100)]
    pub global_epochs: usize,

    /// Local epochs per device per round.
    #[arg(long, default_value_t = 10)]
    pub local_epochs: usize,

    /// Mini-batch size for local training.
    #[arg(short = 'b', long, default_value_t = 128)]
    pub batch_size: usize,

    /// Learning rate for local SGD.
    #[arg(long = "lr", default_value_t = 0.1)]
    pub learning_rate: f32,

    /// Momentum for local SGD.
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f32,

    /// Weight decay for local SGD.
    #[arg(long = "weight-decay", default_value_t = 5e-4)]
    pub weight_decay: f32,

    /// Probability that a device sits out a given round.
    #[arg(long, default_value_t = 0.0)]
    pub skip_ratio: f64,

    /// Seed for the device-selection draws; omit for an OS-seeded run.
    #[arg(long)]
    pub seed: Option<u64>,
}
