use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ml_core::MlErr;

use crate::registry;

/// The result type used in the entire federation module.
pub type Result<T> = std::result::Result<T, FlErr>;

/// All errors that can occur while running federated rounds.
#[derive(Debug)]
pub enum FlErr {
    /// Invalid run configuration, caught before any training.
    InvalidConfig(String),
    /// The dataset name is not present in the registry.
    UnknownDataset { name: String },
    /// A partition snapshot was built for a different dataset.
    SnapshotMismatch { expected: String, found: String },
    /// No device contributed an update this round.
    NoParticipants { round: usize },
    /// A device's data partition holds no samples.
    EmptyPartition { device_id: usize },
    /// The device id falls outside the partition table.
    UnknownDevice { device_id: usize, devices: usize },
    /// The model's output width does not match the dataset's class count.
    ClassCountMismatch { outputs: usize, classes: usize },
    /// A named tensor is inconsistent across device states or snapshots.
    StateMismatch { name: String, reason: &'static str },
    /// A parameter snapshot could not be encoded or decoded.
    Snapshot(safetensors::SafeTensorError),
    /// An error bubbled up from the model core.
    Ml(MlErr),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
    /// A JSON artifact could not be encoded or decoded.
    Json(serde_json::Error),
}

impl Display for FlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::UnknownDataset { name } => {
                write!(f, "unknown dataset {name}, supported: ")?;
                for (i, supported) in registry::supported_names().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{supported}")?;
                }
                Ok(())
            }
            Self::SnapshotMismatch { expected, found } => {
                write!(f, "partition snapshot was built for dataset {found}, expected {expected}")
            }
            Self::NoParticipants { round } => {
                write!(f, "no device participated in round {round}")
            }
            Self::EmptyPartition { device_id } => {
                write!(f, "device {device_id} has an empty data partition")
            }
            Self::UnknownDevice { device_id, devices } => {
                write!(f, "device {device_id} does not exist, only {devices} partitions")
            }
            Self::ClassCountMismatch { outputs, classes } => {
                write!(f, "model has {outputs} outputs but the dataset has {classes} classes")
            }
            Self::StateMismatch { name, reason } => {
                write!(f, "parameter {name}: {reason}")
            }
            Self::Snapshot(e) => write!(f, "snapshot error: {e}"),
            Self::Ml(e) => write!(f, "training error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for FlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for FlErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<io::Error> for FlErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for FlErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<safetensors::SafeTensorError> for FlErr {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::Snapshot(e)
    }
}
