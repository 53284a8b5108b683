use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A shape invariant was violated (e.g. mismatched lengths).
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// A class label does not fit the configured class count.
    LabelOutOfRange { label: usize, classes: usize },

    /// A named parameter expected by the model layout is absent.
    MissingParam { name: String },

    /// A named parameter does not belong to the model layout.
    UnexpectedParam { name: String },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            MlErr::LabelOutOfRange { label, classes } => {
                write!(f, "label {label} is out of range for {classes} classes")
            }
            MlErr::MissingParam { name } => {
                write!(f, "parameter {name} is missing from the given state")
            }
            MlErr::UnexpectedParam { name } => {
                write!(f, "parameter {name} does not exist in the model layout")
            }
        }
    }
}

impl Error for MlErr {}
