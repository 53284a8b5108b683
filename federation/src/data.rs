use std::{fs, num::NonZeroUsize, path::Path};

use ml_core::Dataset;
use ndarray::Array2;
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{FlErr, Result};

/// Source of per-device training data for the round scheduler.
///
/// This trait is the data policy boundary: the scheduler only needs the
/// partition table (whose lengths double as aggregation weights) and a
/// restartable batch sequence per device. How samples are stored, loaded or
/// partitioned lives behind implementations of this trait.
pub trait DataProvider {
    /// Per-device sample-index collections; position is the device id.
    fn device_data_idxs(&self) -> &[Vec<usize>];

    /// Builds a restartable batch loader over one device's partition.
    ///
    /// # Errors
    /// Returns `FlErr` if the device id is unknown or its partition is empty.
    fn training_data_loader(&self, device_id: usize) -> Result<DeviceLoader<'_>>;
}

/// An in-memory dataset split into fixed, disjoint per-device partitions.
pub struct PartitionedDataset {
    dataset: Dataset,
    device_data_idxs: Vec<Vec<usize>>,
    batch_size: NonZeroUsize,
}

/// The durable half of a `PartitionedDataset`: the partition table, keyed by
/// the dataset it was built for.
#[derive(Serialize, Deserialize)]
struct PartitionSnapshot {
    dataset: String,
    device_data_idxs: Vec<Vec<usize>>,
}

impl PartitionedDataset {
    /// Creates a new `PartitionedDataset`.
    ///
    /// # Arguments
    /// * `dataset` - The backing sample store.
    /// * `device_data_idxs` - Per-device sample indices, one entry per device.
    /// * `batch_size` - Batch size used by every device loader.
    ///
    /// # Errors
    /// Returns `FlErr` if an index is out of bounds or partitions overlap.
    pub fn new(
        dataset: Dataset,
        device_data_idxs: Vec<Vec<usize>>,
        batch_size: NonZeroUsize,
    ) -> Result<Self> {
        let mut seen = vec![false; dataset.len()];
        for idxs in &device_data_idxs {
            for &idx in idxs {
                if idx >= dataset.len() {
                    return Err(FlErr::InvalidConfig(format!(
                        "partition index {idx} is out of bounds for {} samples",
                        dataset.len()
                    )));
                }
                if seen[idx] {
                    return Err(FlErr::InvalidConfig(format!(
                        "partitions overlap at sample {idx}"
                    )));
                }
                seen[idx] = true;
            }
        }

        Ok(Self { dataset, device_data_idxs, batch_size })
    }

    /// Splits a dataset across devices uniformly at random.
    ///
    /// # Arguments
    /// * `dataset` - The backing sample store.
    /// * `devices` - The number of partitions to create.
    /// * `batch_size` - Batch size used by every device loader.
    /// * `rng` - A random number generator.
    ///
    /// # Errors
    /// Returns `FlErr` if there are fewer samples than devices.
    pub fn iid<R: Rng>(
        dataset: Dataset,
        devices: NonZeroUsize,
        batch_size: NonZeroUsize,
        rng: &mut R,
    ) -> Result<Self> {
        let devices = devices.get();
        if dataset.len() < devices {
            return Err(FlErr::InvalidConfig(format!(
                "cannot split {} samples across {devices} devices",
                dataset.len()
            )));
        }

        let mut idxs: Vec<usize> = (0..dataset.len()).collect();
        idxs.shuffle(rng);

        // Spread the remainder over the first partitions so every device
        // ends up non-empty.
        let base = dataset.len() / devices;
        let extra = dataset.len() % devices;
        let mut device_data_idxs = Vec::with_capacity(devices);
        let mut cursor = 0;
        for device_id in 0..devices {
            let take = base + usize::from(device_id < extra);
            device_data_idxs.push(idxs[cursor..cursor + take].to_vec());
            cursor += take;
        }

        Self::new(dataset, device_data_idxs, batch_size)
    }

    /// Restores a previously persisted partition table over a loaded dataset.
    ///
    /// # Arguments
    /// * `dataset` - The backing sample store the snapshot was built for.
    /// * `dataset_name` - The registered name the snapshot must carry.
    /// * `batch_size` - Batch size used by every device loader.
    /// * `path` - Location of the JSON snapshot.
    ///
    /// # Errors
    /// Returns `FlErr` if the snapshot cannot be read, was built for another
    /// dataset, or no longer fits the loaded samples.
    pub fn load(
        dataset: Dataset,
        dataset_name: &str,
        batch_size: NonZeroUsize,
        path: &Path,
    ) -> Result<Self> {
        let bytes = fs::read(path)?;
        let snapshot: PartitionSnapshot = serde_json::from_slice(&bytes)?;

        if snapshot.dataset != dataset_name {
            return Err(FlErr::SnapshotMismatch {
                expected: dataset_name.to_string(),
                found: snapshot.dataset,
            });
        }

        Self::new(dataset, snapshot.device_data_idxs, batch_size)
    }

    /// Persists the partition table as a JSON snapshot.
    ///
    /// # Errors
    /// Returns `FlErr` on serialization or I/O failures.
    pub fn save(&self, dataset_name: &str, path: &Path) -> Result<()> {
        let snapshot = PartitionSnapshot {
            dataset: dataset_name.to_string(),
            device_data_idxs: self.device_data_idxs.clone(),
        };

        fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn num_devices(&self) -> usize {
        self.device_data_idxs.len()
    }
}

impl DataProvider for PartitionedDataset {
    fn device_data_idxs(&self) -> &[Vec<usize>] {
        &self.device_data_idxs
    }

    fn training_data_loader(&self, device_id: usize) -> Result<DeviceLoader<'_>> {
        let idxs = self
            .device_data_idxs
            .get(device_id)
            .ok_or(FlErr::UnknownDevice {
                device_id,
                devices: self.device_data_idxs.len(),
            })?;

        if idxs.is_empty() {
            return Err(FlErr::EmptyPartition { device_id });
        }

        Ok(DeviceLoader {
            dataset: &self.dataset,
            idxs,
            batch_size: self.batch_size,
        })
    }
}

/// A restartable batch loader over one device's partition.
///
/// Every call to `batches` starts a fresh pass in the fixed partition order,
/// so repeated local epochs see the samples in the same sequence.
#[derive(Clone, Copy)]
pub struct DeviceLoader<'a> {
    dataset: &'a Dataset,
    idxs: &'a [usize],
    batch_size: NonZeroUsize,
}

impl<'a> DeviceLoader<'a> {
    /// Creates a new `DeviceLoader`.
    pub fn new(dataset: &'a Dataset, idxs: &'a [usize], batch_size: NonZeroUsize) -> Self {
        Self { dataset, idxs, batch_size }
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.idxs.len()
    }

    /// Starts a fresh pass over the partition.
    pub fn batches(&self) -> Batches<'a> {
        Batches {
            dataset: self.dataset,
            idxs: self.idxs,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Iterator over one device's partition in owned batches.
pub struct Batches<'a> {
    dataset: &'a Dataset,
    idxs: &'a [usize],
    batch_size: NonZeroUsize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<(Array2<f32>, Vec<usize>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.idxs.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size.get()).min(self.idxs.len());
        let batch = self
            .dataset
            .gather(&self.idxs[self.cursor..end])
            .map_err(FlErr::from);

        self.cursor = end;
        Some(batch)
    }
}
