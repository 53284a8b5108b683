use std::collections::BTreeMap;

use crate::{MlErr, Result};

/// A named slot in the flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEntry {
    pub name: String,
    pub offset: usize,
    pub shape: Vec<usize>,
}

impl ParamEntry {
    /// Returns the number of scalars this entry spans.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned named tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// A full named-parameter snapshot of a model, keyed by parameter name.
pub type ParamState = BTreeMap<String, Tensor>;

/// Copies the flat parameter buffer out into a named-parameter state.
///
/// # Arguments
/// * `layout` - The model layout the buffer follows.
/// * `params` - The flat parameter buffer.
///
/// # Returns
/// An owned state holding one tensor per layout entry.
pub fn export_state(layout: &[ParamEntry], params: &[f32]) -> ParamState {
    layout
        .iter()
        .map(|entry| {
            let data = params[entry.offset..entry.offset + entry.len()].to_vec();
            (entry.name.clone(), Tensor { shape: entry.shape.clone(), data })
        })
        .collect()
}

/// Loads a named-parameter state wholesale into the flat parameter buffer.
///
/// The state must match the layout exactly: every layout entry present with
/// its exact shape, and no extra entries.
///
/// # Errors
/// Returns `MlErr` if a parameter is missing, unexpected, or misshapen.
pub fn import_state(layout: &[ParamEntry], state: &ParamState, params: &mut [f32]) -> Result<()> {
    if state.len() != layout.len() {
        let known: Vec<&str> = layout.iter().map(|e| e.name.as_str()).collect();
        for name in state.keys() {
            if !known.contains(&name.as_str()) {
                return Err(MlErr::UnexpectedParam { name: name.clone() });
            }
        }
    }

    for entry in layout {
        let tensor = state
            .get(&entry.name)
            .ok_or_else(|| MlErr::MissingParam { name: entry.name.clone() })?;

        if tensor.shape != entry.shape || tensor.data.len() != entry.len() {
            return Err(MlErr::ShapeMismatch {
                what: "state tensor",
                got: tensor.data.len(),
                expected: entry.len(),
            });
        }

        params[entry.offset..entry.offset + entry.len()].copy_from_slice(&tensor.data);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{LayerSpec, ModelSpec};

    fn spec() -> ModelSpec {
        ModelSpec {
            layers: vec![LayerSpec::Dense { input: 2, output: 1, act_fn: None }],
        }
    }

    #[test]
    fn export_import_roundtrip() {
        let layout = spec().layout();
        let params = [1.0, 2.0, 3.0];

        let state = export_state(&layout, &params);
        assert_eq!(state["dense0.weight"].data, vec![1.0, 2.0]);
        assert_eq!(state["dense0.bias"].data, vec![3.0]);

        let mut restored = [0.0; 3];
        import_state(&layout, &state, &mut restored).unwrap();
        assert_eq!(restored, params);
    }

    #[test]
    fn import_rejects_missing_param() {
        let layout = spec().layout();
        let mut state = export_state(&layout, &[1.0, 2.0, 3.0]);
        state.remove("dense0.bias");

        let mut params = [0.0; 3];
        assert!(matches!(
            import_state(&layout, &state, &mut params),
            Err(MlErr::MissingParam { .. })
        ));
    }

    #[test]
    fn import_rejects_unexpected_param() {
        let layout = spec().layout();
        let mut state = export_state(&layout, &[1.0, 2.0, 3.0]);
        state.insert("dense7.weight".into(), Tensor { shape: vec![1], data: vec![0.0] });

        let mut params = [0.0; 3];
        assert!(matches!(
            import_state(&layout, &state, &mut params),
            Err(MlErr::UnexpectedParam { .. })
        ));
    }

    #[test]
    fn import_rejects_misshapen_tensor() {
        let layout = spec().layout();
        let mut state = export_state(&layout, &[1.0, 2.0, 3.0]);
        state.insert("dense0.bias".into(), Tensor { shape: vec![2], data: vec![0.0, 0.0] });

        let mut params = [0.0; 3];
        assert!(matches!(
            import_state(&layout, &state, &mut params),
            Err(MlErr::ShapeMismatch { .. })
        ));
    }
}
