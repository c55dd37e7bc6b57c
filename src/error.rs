//! Error types for neural field construction and simulation
//!
//! Every failure here is a graph-construction or programming error. Nothing
//! is retried internally; every variant propagates to the caller of
//! `init`/`step`/`connect`/`set_parameters`.

use thiserror::Error;

use crate::layers::Shape;

/// Root error type for all neural field operations.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Two layers were registered with the same non-empty label.
    #[error("duplicate layer label '{0}': labels must be unique within a network")]
    DuplicateLabel(String),

    /// Lookup by label found no layer.
    #[error("cannot find layer labeled '{0}'")]
    UnknownLabel(String),

    /// A layer handle that does not belong to this network.
    #[error("unknown layer handle #{0}")]
    UnknownLayer(usize),

    /// `init()` could not order the function layers.
    #[error(
        "cannot determine an evaluation order, unresolved layers: {}",
        .labels.iter().map(|l| format!("\"{l}\"")).collect::<Vec<_>>().join(" ")
    )]
    CyclicDependency {
        /// Labels (or `#id` for unlabeled layers) of the layers left unordered.
        labels: Vec<String>,
    },

    /// A layer was updated without the predecessors it requires.
    #[error("layer '{label}' requires {expected} connected layer(s), found {found}")]
    MissingConnection {
        label: String,
        expected: usize,
        found: usize,
    },

    /// A connection that the destination layer cannot accept.
    #[error("cannot connect into layer '{label}': {reason}")]
    InvalidConnection { label: String, reason: String },

    /// Two layers combined together have different shapes.
    #[error("shape mismatch on layer '{label}': expected {expected}, found {found}")]
    ShapeMismatch {
        label: String,
        expected: Shape,
        found: Shape,
    },

    /// `set_parameters` called with the wrong number of values.
    #[error("layer '{label}' takes {expected} parameter(s), got {found}")]
    ParameterArityMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    /// A parameter value outside the domain of the layer.
    #[error("invalid parameter for layer '{label}': {reason}")]
    InvalidParameter { label: String, reason: String },

    /// Only 1D and 2D fields are supported.
    #[error("unsupported field dimension {rank}: only 1D and 2D fields are handled")]
    UnsupportedDimension { rank: usize },

    /// A shape with a zero-sized axis.
    #[error("invalid shape {0:?}: every axis must be strictly positive")]
    InvalidShape(Vec<usize>),

    /// A configuration that has no defined semantics yet.
    #[error("not implemented: {0}")]
    Unimplemented(String),

    /// An input layer was accessed with an input type it was not built for.
    #[error("input layer '{label}' is fed with {registered}, not {requested}")]
    TypeMismatch {
        label: String,
        registered: &'static str,
        requested: &'static str,
    },

    /// Unknown transfer function name.
    #[error("unknown function '{0}': expected one of sigmoid, relu")]
    UnknownFunction(String),

    /// `step`/`reset` called before `init`.
    #[error("network must be initialized with init() before it is stepped or reset")]
    NotInitialized,

    /// Invalid configuration file contents.
    #[error("config error: {0}")]
    Config(String),

    /// IO error while reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for neural field operations.
pub type FieldResult<T> = Result<T, FieldError>;

impl FieldError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(label: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dependency_lists_labels() {
        let err = FieldError::CyclicDependency {
            labels: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("\"b\""));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = FieldError::ShapeMismatch {
            label: "s".to_string(),
            expected: Shape::d1(10).unwrap(),
            found: Shape::d2(2, 5).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch on layer 's': expected [10], found [2x5]"
        );
    }
}
