use crate::{FlErr, Result};

/// Datasets the simulation knows, paired with their class counts.
const SUPPORTED: &[(&str, usize)] = &[("cifar10", 10)];

/// Looks up the class count registered for a dataset name.
///
/// # Errors
/// Returns `FlErr::UnknownDataset` when the name is not registered; the error
/// message enumerates every supported dataset.
pub fn class_count(name: &str) -> Result<usize> {
    SUPPORTED
        .iter()
        .find(|(supported, _)| *supported == name)
        .map(|&(_, classes)| classes)
        .ok_or_else(|| FlErr::UnknownDataset { name: name.to_string() })
}

/// Iterates the registered dataset names.
pub fn supported_names() -> impl Iterator<Item = &'static str> {
    SUPPORTED.iter().map(|&(name, _)| name)
}
