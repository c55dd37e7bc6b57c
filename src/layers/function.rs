//! Stateless layers recomputed from their predecessors on every tick

use std::fmt;

use crate::layers::gaussian::GaussianLink;
use crate::layers::heaviside::HeavisideLink;
use crate::layers::LayerId;
use crate::utils::activations;
use crate::utils::rng::SimpleRng;

/// Element-wise map applied by a vectorized function layer.
#[derive(Clone)]
pub struct Vectorized {
    name: String,
    f: fn(f64) -> f64,
}

impl Vectorized {
    pub fn new(name: impl Into<String>, f: fn(f64) -> f64) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, x: f64) -> f64 {
        (self.f)(x)
    }

    /// Map `input` into `output` element by element.
    pub fn map(&self, input: &[f64], output: &mut [f64]) {
        activations::map_into(input, output, self.f);
    }
}

impl fmt::Debug for Vectorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Vectorized").field(&self.name).finish()
    }
}

/// Operator of a function layer together with the state it needs.
#[derive(Debug, Clone)]
pub enum FunctionOp {
    /// `[amplitude, spread]`, one predecessor.
    Gaussian(GaussianLink),
    /// `[weight, radius]`, one predecessor.
    Heaviside(HeavisideLink),
    /// `[weight]`, one predecessor of any shape.
    Full,
    /// No parameter, two predecessors.
    Sum,
    /// `[value]`, no predecessor.
    Constant,
    /// No parameter, one predecessor.
    Vectorized(Vectorized),
    /// `[min, max]`, no predecessor.
    UniformNoise(SimpleRng),
}

impl FunctionOp {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionOp::Gaussian(_) => "gaussian",
            FunctionOp::Heaviside(_) => "heaviside",
            FunctionOp::Full => "full",
            FunctionOp::Sum => "sum",
            FunctionOp::Constant => "constant",
            FunctionOp::Vectorized(_) => "function",
            FunctionOp::UniformNoise(_) => "uniform_noise",
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            FunctionOp::Gaussian(_) | FunctionOp::Heaviside(_) | FunctionOp::UniformNoise(_) => 2,
            FunctionOp::Full | FunctionOp::Constant => 1,
            FunctionOp::Sum | FunctionOp::Vectorized(_) => 0,
        }
    }

    /// Number of predecessors the operator combines.
    pub fn arity(&self) -> usize {
        match self {
            FunctionOp::Constant | FunctionOp::UniformNoise(_) => 0,
            FunctionOp::Sum => 2,
            _ => 1,
        }
    }

    /// Whether predecessors may have a shape other than the layer's own.
    pub fn accepts_any_shape(&self) -> bool {
        matches!(self, FunctionOp::Full)
    }
}

/// A function layer: an operator and its ordered predecessors.
#[derive(Debug, Clone)]
pub struct FunctionLayer {
    pub(crate) predecessors: Vec<LayerId>,
    pub(crate) op: FunctionOp,
}

impl FunctionLayer {
    pub fn new(op: FunctionOp) -> Self {
        Self {
            predecessors: Vec::new(),
            op,
        }
    }

    pub fn op(&self) -> &FunctionOp {
        &self.op
    }

    pub fn predecessors(&self) -> &[LayerId] {
        &self.predecessors
    }
}

/// `output[i] = weight / output.len() · Σ input`.
pub fn full(weight: f64, input: &[f64], output: &mut [f64]) {
    let total: f64 = input.iter().sum();
    output.fill(weight / output.len() as f64 * total);
}

/// `output[i] = a[i] + b[i]`.
pub fn sum(a: &[f64], b: &[f64], output: &mut [f64]) {
    for ((out, &x), &y) in output.iter_mut().zip(a).zip(b) {
        *out = x + y;
    }
}
