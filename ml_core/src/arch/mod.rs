mod activations;
mod dense;
mod loss;
mod sequential;
mod spec;

pub use activations::ActFn;
pub use dense::Dense;
pub use loss::{BceWithLogits, LossFn};
pub use sequential::Sequential;
pub use spec::{LayerSpec, ModelSpec};
