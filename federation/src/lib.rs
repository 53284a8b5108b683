pub mod aggregate;
pub mod checkpoint;
mod data;
mod device;
mod error;
mod model;
pub mod registry;
mod rounds;

pub use aggregate::StateSum;
pub use data::{Batches, DataProvider, DeviceLoader, PartitionedDataset};
pub use device::device_train;
pub use error::{FlErr, Result};
pub use model::GlobalModel;
pub use rounds::{RoundConfig, run_rounds};
