//! Stateful, double-buffered layers
//!
//! A buffered layer computes its next state into a shadow buffer during the
//! first phase of a tick and only exposes it when swapped, so every
//! buffered layer reads the state of the previous tick.

use crate::layers::LayerId;

/// Temporal operator of a buffered layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferedOp {
    /// `next = (1 - alpha) · current + alpha · input`, parameters `[alpha]`.
    LeakyIntegrator,
}

impl BufferedOp {
    pub fn name(&self) -> &'static str {
        match self {
            BufferedOp::LeakyIntegrator => "leaky_integrator",
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            BufferedOp::LeakyIntegrator => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferedLayer {
    pub(crate) predecessor: Option<LayerId>,
    pub(crate) next_values: Vec<f64>,
    pub(crate) op: BufferedOp,
}

impl BufferedLayer {
    pub fn new(op: BufferedOp, size: usize) -> Self {
        Self {
            predecessor: None,
            next_values: vec![0.0; size],
            op,
        }
    }

    pub fn op(&self) -> BufferedOp {
        self.op
    }

    pub fn predecessor(&self) -> Option<LayerId> {
        self.predecessor
    }

    /// Values that the next swap will expose.
    pub fn next_values(&self) -> &[f64] {
        &self.next_values
    }
}

/// One leaky integration step from `current` towards `input`.
pub fn leaky_integrate(alpha: f64, current: &[f64], input: &[f64], next: &mut [f64]) {
    for ((n, &v), &x) in next.iter_mut().zip(current).zip(input) {
        *n = (1.0 - alpha) * v + alpha * x;
    }
}
