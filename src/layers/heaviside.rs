//! Box-kernel coupling computed with a prefix sum
//!
//! A Heaviside link sums a predecessor over a window of cells around each
//! cell. The window sums come from a cumulative sum, so an update costs
//! O(N) whatever the radius.

use crate::error::{FieldError, FieldResult};
use crate::layers::Shape;

/// Windowed sum over a 1D linear field.
///
/// Parameters are `[weight, radius]` with `radius` in (0, 1], a fraction of
/// the field size. Cell `i` receives `weight / N` times the sum of the
/// predecessor over `[i - r, i + r]` clipped to the field, with
/// `r = floor(radius · N)`.
#[derive(Debug, Clone)]
pub struct HeavisideLink {
    prefix: Vec<f64>,
}

impl HeavisideLink {
    /// Only 1D linear fields are supported: a 2D shape fails with
    /// `UnsupportedDimension` and a toric one with `Unimplemented`.
    pub fn new(label: &str, shape: &Shape, toric: bool) -> FieldResult<Self> {
        if shape.rank() != 1 {
            return Err(FieldError::UnsupportedDimension { rank: shape.rank() });
        }
        if toric {
            return Err(FieldError::Unimplemented(format!(
                "toric heaviside layer '{label}'"
            )));
        }
        Ok(Self {
            prefix: vec![0.0; shape.size() + 1],
        })
    }

    pub(crate) fn update(&mut self, weight: f64, radius: f64, input: &[f64], output: &mut [f64]) {
        let n = input.len();
        self.prefix[0] = 0.0;
        for (i, &v) in input.iter().enumerate() {
            self.prefix[i + 1] = self.prefix[i] + v;
        }

        let r = (radius * n as f64).floor() as usize;
        let scale = weight / n as f64;
        for (i, out) in output.iter_mut().enumerate() {
            let lo = i.saturating_sub(r);
            let hi = (i + r + 1).min(n);
            *out = scale * (self.prefix[hi] - self.prefix[lo]);
        }
    }
}

/// Check the `[weight, radius]` parameters of a Heaviside link.
pub(crate) fn validate_radius(label: &str, radius: f64) -> FieldResult<()> {
    if radius > 0.0 && radius <= 1.0 {
        Ok(())
    } else {
        Err(FieldError::invalid_parameter(
            label,
            format!("heaviside radius must lie in (0, 1], got {radius}"),
        ))
    }
}
