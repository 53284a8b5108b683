use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use ml_core::{ParamState, Tensor, arch::ModelSpec};
use safetensors::{
    Dtype, SafeTensors,
    tensor::{TensorView, serialize_to_file},
};

use crate::{FlErr, GlobalModel, Result};

/// File extension of candidate parameter snapshots.
pub const PARAMS_EXT: &str = "safetensors";

/// Suffix appended to a model path for each round's output.
const ROUND_TAG: &str = "_FLepoch_";

/// Returns the path a round's parameter snapshot is written to.
///
/// Round outputs append a suffix to the full model path, so they never match
/// the candidate extension and are not rediscovered as base models.
pub fn round_path(model_path: &Path, round: usize) -> PathBuf {
    let mut os = model_path.as_os_str().to_os_string();
    os.push(format!("{ROUND_TAG}{round}"));
    PathBuf::from(os)
}

/// Returns the path of the architecture descriptor belonging to a parameter
/// snapshot, stripping any round suffix first.
///
/// The descriptor is written once per candidate; every round output produced
/// from that candidate shares it.
pub fn arch_path(params_path: &Path) -> PathBuf {
    let name = params_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let base = match name.rfind(ROUND_TAG) {
        Some(pos)
            if pos + ROUND_TAG.len() < name.len()
                && name[pos + ROUND_TAG.len()..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &name[..pos]
        }
        _ => name.as_str(),
    };

    let stem = base.strip_suffix(&format!(".{PARAMS_EXT}")).unwrap_or(base);
    params_path.with_file_name(format!("{stem}.arch.json"))
}

/// Writes an architecture descriptor as JSON.
///
/// # Errors
/// Returns `FlErr` on serialization or I/O failures.
pub fn save_arch(spec: &ModelSpec, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(spec)?)?;
    Ok(())
}

/// Reads an architecture descriptor back from JSON.
///
/// # Errors
/// Returns `FlErr` if the file cannot be read or parsed.
pub fn load_arch(path: &Path) -> Result<ModelSpec> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes a named-parameter state as a safetensors snapshot.
///
/// # Errors
/// Returns `FlErr` on encoding or I/O failures.
pub fn save_params(state: &ParamState, path: &Path) -> Result<()> {
    let mut views = Vec::with_capacity(state.len());
    for (name, tensor) in state {
        let view = TensorView::new(
            Dtype::F32,
            tensor.shape.clone(),
            bytemuck::cast_slice(&tensor.data),
        )?;
        views.push((name.as_str(), view));
    }

    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), "fl-params".to_string());

    serialize_to_file(views, &Some(metadata), path)?;
    Ok(())
}

/// Reads a named-parameter state back from a safetensors snapshot.
///
/// # Errors
/// Returns `FlErr` if the file cannot be read, decoded, or holds non-f32
/// tensors.
pub fn load_params(path: &Path) -> Result<ParamState> {
    let buf = fs::read(path)?;
    let st = SafeTensors::deserialize(&buf)?;

    let mut state = ParamState::new();
    for (name, view) in st.tensors() {
        if view.dtype() != Dtype::F32 {
            return Err(FlErr::StateMismatch {
                name,
                reason: "snapshot tensor is not f32",
            });
        }

        let data: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
        state.insert(name, Tensor { shape: view.shape().to_vec(), data });
    }

    Ok(state)
}

/// Writes a full candidate checkpoint: the architecture descriptor next to
/// the parameter snapshot.
///
/// # Errors
/// Returns `FlErr` on encoding or I/O failures.
pub fn save_model(model: &GlobalModel, params_path: &Path) -> Result<()> {
    save_arch(model.spec(), &arch_path(params_path))?;
    save_params(&model.state(), params_path)
}

/// Loads a model from a parameter snapshot and its sibling descriptor.
///
/// Works for base candidates and for round outputs, whose descriptor is the
/// originating candidate's.
///
/// # Errors
/// Returns `FlErr` if either artifact is missing, malformed, or inconsistent.
pub fn load_model(params_path: &Path) -> Result<GlobalModel> {
    let spec = load_arch(&arch_path(params_path))?;
    let mut model = GlobalModel::new(spec)?;
    let state = load_params(params_path)?;
    model.load_state(&state)?;

    Ok(model)
}

#[cfg(test)]
mod tests {
    use ml_core::arch::LayerSpec;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn spec() -> ModelSpec {
        ModelSpec {
            layers: vec![LayerSpec::Dense { input: 3, output: 2, act_fn: None }],
        }
    }

    #[test]
    fn round_path_appends_the_round_index() {
        let path = round_path(Path::new("/models/net.safetensors"), 4);
        assert_eq!(path, Path::new("/models/net.safetensors_FLepoch_4"));
    }

    #[test]
    fn arch_path_strips_round_suffixes() {
        let base = Path::new("/models/net.safetensors");
        assert_eq!(arch_path(base), Path::new("/models/net.arch.json"));

        let round = round_path(base, 12);
        assert_eq!(arch_path(&round), Path::new("/models/net.arch.json"));
    }

    #[test]
    fn arch_path_ignores_false_round_tags() {
        let odd = Path::new("/models/net_FLepoch_x.safetensors");
        assert_eq!(arch_path(odd), Path::new("/models/net_FLepoch_x.arch.json"));
    }

    #[test]
    fn model_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.safetensors");

        let mut rng = StdRng::seed_from_u64(11);
        let model = GlobalModel::init_uniform(spec(), -1.0, 1.0, &mut rng).unwrap();
        save_model(&model, &path).unwrap();

        let restored = load_model(&path).unwrap();
        assert_eq!(restored.spec(), model.spec());
        assert_eq!(restored.params(), model.params());
    }

    #[test]
    fn round_output_loads_with_the_base_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.safetensors");

        let model = GlobalModel::new(spec()).unwrap();
        save_model(&model, &path).unwrap();
        save_params(&model.state(), &round_path(&path, 0)).unwrap();

        let restored = load_model(&round_path(&path, 0)).unwrap();
        assert_eq!(restored.params(), model.params());
    }
}
