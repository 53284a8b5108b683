pub mod arch;
mod dataset;
mod error;
mod init;
pub mod optimization;
mod params;

pub use dataset::{Dataset, one_hot};
pub use error::{MlErr, Result};
pub use init::uniform_init;
pub use params::{ParamEntry, ParamState, Tensor, export_state, import_state};
