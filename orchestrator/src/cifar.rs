use std::{fs, path::Path};

use ml_core::Dataset;

use crate::DriverErr;

/// Bytes per CIFAR-10 record: one label byte followed by a 32x32x3 image.
const RECORD_LEN: usize = 3073;
const IMAGE_LEN: usize = RECORD_LEN - 1;

const TRAIN_FILES: &[&str] = &[
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

/// Loads the CIFAR-10 training split from its binary batch files.
///
/// Pixels are scaled to `[0, 1]`; labels are kept as raw class indices.
///
/// # Arguments
/// * `dir` - Directory holding the `data_batch_*.bin` files.
///
/// # Errors
/// Returns `DriverErr` if a batch file is missing or truncated.
pub fn load_training(dir: &Path) -> Result<Dataset, DriverErr> {
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for name in TRAIN_FILES {
        let path = dir.join(name);
        let bytes = fs::read(&path).map_err(|source| DriverErr::DatasetFile {
            path: path.clone(),
            source,
        })?;

        if bytes.is_empty() || bytes.len() % RECORD_LEN != 0 {
            return Err(DriverErr::InvalidConfig(format!(
                "{} is not a CIFAR-10 batch: {} bytes is not a multiple of {RECORD_LEN}",
                path.display(),
                bytes.len()
            )));
        }

        for record in bytes.chunks_exact(RECORD_LEN) {
            labels.push(record[0] as usize);
            features.extend(record[1..].iter().map(|&b| f32::from(b) / 255.0));
        }
    }

    Ok(Dataset::new(IMAGE_LEN, features, labels))
}
