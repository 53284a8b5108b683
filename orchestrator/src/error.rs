use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use federation::FlErr;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum DriverErr {
    /// Invalid configuration, caught before any training.
    InvalidConfig(String),
    /// A required directory under the base dir is missing.
    MissingDir(PathBuf),
    /// The named candidate checkpoint does not exist.
    MissingCandidate(PathBuf),
    /// The worker directory holds no candidate checkpoints.
    NoCandidates(PathBuf),
    /// A dataset file could not be read.
    DatasetFile { path: PathBuf, source: io::Error },
    /// A federated run produced an unrecoverable error.
    Fl(FlErr),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl Display for DriverErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::MissingDir(path) => write!(f, "missing directory {}", path.display()),
            Self::MissingCandidate(path) => {
                write!(f, "candidate model {} does not exist", path.display())
            }
            Self::NoCandidates(path) => {
                write!(f, "no candidate checkpoints found in {}", path.display())
            }
            Self::DatasetFile { path, source } => {
                write!(f, "failed to read dataset file {}: {source}", path.display())
            }
            Self::Fl(e) => write!(f, "federated run failed: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for DriverErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DatasetFile { source, .. } => Some(source),
            Self::Fl(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FlErr> for DriverErr {
    fn from(e: FlErr) -> Self {
        Self::Fl(e)
    }
}

impl From<io::Error> for DriverErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
