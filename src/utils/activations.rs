//! Transfer functions for field activity
//!
//! Field layers apply these element-wise to the potential of a predecessor:
//! - Sigmoid, the usual firing-rate nonlinearity of a neural field
//! - ReLU, a rectified linear rate

use crate::error::{FieldError, FieldResult};

/// Sigmoid transfer function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Rectified linear transfer function: max(0, x).
pub fn relu(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Apply `f` element-wise from `source` into `destination`.
///
/// # Panics
///
/// Panics if the two slices differ in length.
pub fn map_into(source: &[f64], destination: &mut [f64], f: fn(f64) -> f64) {
    assert_eq!(
        source.len(),
        destination.len(),
        "length mismatch in map_into"
    );
    for (dst, &src) in destination.iter_mut().zip(source) {
        *dst = f(src);
    }
}

/// Look up a transfer function by name (`"sigmoid"` or `"relu"`).
pub fn by_name(name: &str) -> FieldResult<fn(f64) -> f64> {
    match name.to_lowercase().as_str() {
        "sigmoid" => Ok(sigmoid),
        "relu" => Ok(relu),
        _ => Err(FieldError::UnknownFunction(name.to_string())),
    }
}
