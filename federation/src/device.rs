use ml_core::{
    ParamState,
    arch::BceWithLogits,
    export_state, one_hot,
    optimization::Sgd,
};

use crate::{DeviceLoader, FlErr, GlobalModel, Result, rounds::RoundConfig};

/// Runs one device's local fine-tuning pass.
///
/// The global model is only read: the device checks out an independent copy
/// of the parameters, trains it for `local_epochs` passes over its partition
/// and returns the resulting state as an owned value. Nothing is shared
/// between device simulations, so they could run in any order (or in
/// parallel) without changing the aggregation contract.
///
/// # Arguments
/// * `global` - The immutable shared model snapshot to start from.
/// * `loader` - The device's restartable batch loader.
/// * `cfg` - The round configuration carrying the training hyperparameters.
///
/// # Returns
/// The device's post-training parameter state.
///
/// # Errors
/// Returns `FlErr` if the model does not fit the class count or a training
/// step fails.
pub fn device_train(
    global: &GlobalModel,
    loader: &DeviceLoader<'_>,
    cfg: &RoundConfig,
) -> Result<ParamState> {
    let outputs = global.spec().output_dim();
    if outputs != cfg.num_classes {
        return Err(FlErr::ClassCountMismatch { outputs, classes: cfg.num_classes });
    }

    let mut net = global.clone_net();
    let mut params = global.params().to_vec();
    let mut grad = vec![0.0; params.len()];
    let mut sgd = Sgd::new(
        params.len(),
        cfg.learning_rate,
        cfg.momentum,
        cfg.weight_decay,
    );
    let loss_fn = BceWithLogits::new();

    for _ in 0..cfg.local_epochs {
        for batch in loader.batches() {
            let (inputs, labels) = batch?;
            let targets = one_hot(&labels, cfg.num_classes)?;

            net.train_batch(
                &mut params,
                &mut grad,
                &loss_fn,
                &mut sgd,
                inputs.view(),
                targets.view(),
            )?;
        }
    }

    Ok(export_state(&global.spec().layout(), &params))
}
