//! Gaussian lateral coupling
//!
//! This module provides the convolution layer of a neural field: every cell
//! receives the sum of a predecessor's activity weighted by a Gaussian of
//! the distance to that cell. The convolution itself runs through a
//! `SpectralConvolver` planned once per layer.

use tracing::debug;

use crate::error::{FieldError, FieldResult};
use crate::layers::Shape;
use crate::utils::convolution::{ConvolutionMode, SpectralConvolver};
use crate::utils::distances::{axis_offset, Topology};

/// Kernel and per-cell scaling factors derived from the parameters of a
/// Gaussian layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    /// Kernel values, row-major over `kernel_shape(shape, topology)`.
    pub kernel: Vec<f64>,
    /// One multiplicative factor per output cell.
    pub scaling: Vec<f64>,
}

/// Shape of the kernel used on a field of `shape`.
///
/// Toric fields use a kernel as large as the field, indexed by offset from
/// cell 0. Linear fields use `2N - 1` samples per axis centred on `N - 1`,
/// which covers every offset between two cells of the field.
pub fn kernel_shape(shape: &Shape, topology: Topology) -> Shape {
    let dims: Vec<usize> = match topology {
        Topology::Toric => shape.dims().to_vec(),
        Topology::Linear => shape.dims().iter().map(|&n| 2 * n - 1).collect(),
    };
    // Extents stay in range and strictly positive.
    Shape::new(&dims).unwrap_or_else(|_| shape.clone())
}

/// Build the kernel and scaling factors of a Gaussian layer.
///
/// The kernel value at grid offset `d` is `amplitude * exp(-d² / (2 spread²))`
/// divided by the number of kernel elements; in 2D, `d` is the Euclidean
/// norm of the per-axis offsets. Scaling factors compensate for the part
/// of the kernel that falls outside a linear field near its edges; they are
/// all 1 for toric fields or when `scale` is off.
pub fn build_kernel(
    amplitude: f64,
    spread: f64,
    shape: &Shape,
    topology: Topology,
    scale: bool,
) -> GaussianKernel {
    let (rows, cols) = shape.rows_cols();
    let (k_rows, k_cols) = kernel_shape(shape, topology).rows_cols();
    let (c_rows, c_cols) = match topology {
        Topology::Toric => (0, 0),
        Topology::Linear => (rows - 1, cols - 1),
    };

    let count = (k_rows * k_cols) as f64;
    let two_s2 = 2.0 * spread * spread;
    let mut kernel = Vec::with_capacity(k_rows * k_cols);
    for r in 0..k_rows {
        let dr = axis_offset(r as f64, c_rows as f64, k_rows, topology);
        for c in 0..k_cols {
            let dc = axis_offset(c as f64, c_cols as f64, k_cols, topology);
            let d2 = dr * dr + dc * dc;
            kernel.push(amplitude * (-d2 / two_s2).exp() / count);
        }
    }

    let scaling = if scale && !topology.is_toric() {
        border_scaling(&kernel, (k_rows, k_cols), (rows, cols))
    } else {
        vec![1.0; rows * cols]
    };

    GaussianKernel { kernel, scaling }
}

/// Per-cell ratio between the largest and the local kernel mass.
///
/// On a linear field the output cell `(i, j)` sees the kernel window
/// `[i, i + rows) × [j, j + cols)`; its mass is read from a summed-area
/// table over the kernel magnitudes.
fn border_scaling(kernel: &[f64], (k_rows, k_cols): (usize, usize), (rows, cols): (usize, usize)) -> Vec<f64> {
    let stride = k_cols + 1;
    let mut table = vec![0.0; (k_rows + 1) * stride];
    for r in 0..k_rows {
        let mut row_sum = 0.0;
        for c in 0..k_cols {
            row_sum += kernel[r * k_cols + c].abs();
            table[(r + 1) * stride + (c + 1)] = table[r * stride + (c + 1)] + row_sum;
        }
    }

    let window = |r0: usize, c0: usize| -> f64 {
        let (r1, c1) = (r0 + rows, c0 + cols);
        table[r1 * stride + c1] - table[r0 * stride + c1] - table[r1 * stride + c0]
            + table[r0 * stride + c0]
    };

    let mut local = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            local.push(window(i, j));
        }
    }

    let max = local.iter().cloned().fold(0.0, f64::max);
    local
        .into_iter()
        .map(|sum| if sum > 0.0 { max / sum } else { 1.0 })
        .collect()
}

/// Check that a spread can be used to build a kernel.
pub(crate) fn validate_spread(label: &str, spread: f64) -> FieldResult<()> {
    if spread > 0.0 && spread.is_finite() {
        Ok(())
    } else {
        Err(FieldError::invalid_parameter(
            label,
            format!("gaussian spread must be strictly positive, got {spread}"),
        ))
    }
}

/// Convolution with a Gaussian kernel.
///
/// Parameters are `[amplitude, spread]`; the spread is a standard deviation
/// in grid cells. The kernel is rebuilt, and its spectrum cached, only when
/// the parameters change.
///
/// # Example
///
/// ```ignore
/// use rust_neural_fields::layers::Shape;
/// use rust_neural_fields::layers::gaussian::GaussianLink;
///
/// let link = GaussianLink::new("gexc", &Shape::d1(100)?, 1.5, 2.0, false, true)?;
/// assert_eq!(link.kernel().len(), 199);
/// ```
#[derive(Debug, Clone)]
pub struct GaussianLink {
    topology: Topology,
    scale: bool,
    kernel_shape: Shape,
    kernel: GaussianKernel,
    convolver: SpectralConvolver,
}

impl GaussianLink {
    /// Plan the convolution of a field of `shape` and build its first kernel.
    pub fn new(
        label: &str,
        shape: &Shape,
        amplitude: f64,
        spread: f64,
        toric: bool,
        scale: bool,
    ) -> FieldResult<Self> {
        validate_spread(label, spread)?;
        let topology = Topology::from_toric(toric);
        let kernel_shape = kernel_shape(shape, topology);
        let mode = match topology {
            Topology::Toric => ConvolutionMode::CircularSame,
            Topology::Linear => ConvolutionMode::LinearSame,
        };
        let mut convolver = SpectralConvolver::new(shape, &kernel_shape, mode);
        let kernel = build_kernel(amplitude, spread, shape, topology, scale);
        convolver.set_kernel(&kernel.kernel);

        Ok(Self {
            topology,
            scale,
            kernel_shape,
            kernel,
            convolver,
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn is_toric(&self) -> bool {
        self.topology.is_toric()
    }

    /// Whether border scaling applies. Always false on a toric field.
    pub fn scale(&self) -> bool {
        self.scale && !self.topology.is_toric()
    }

    pub fn kernel_shape(&self) -> &Shape {
        &self.kernel_shape
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel.kernel
    }

    pub fn scaling_factors(&self) -> &[f64] {
        &self.kernel.scaling
    }

    /// Rebuild the kernel for new `[amplitude, spread]`. On error the
    /// current kernel stays in place.
    pub(crate) fn rebuild(
        &mut self,
        label: &str,
        shape: &Shape,
        amplitude: f64,
        spread: f64,
    ) -> FieldResult<()> {
        validate_spread(label, spread)?;
        let kernel = build_kernel(amplitude, spread, shape, self.topology, self.scale);
        self.convolver.set_kernel(&kernel.kernel);
        self.kernel = kernel;
        debug!(layer = label, amplitude, spread, "rebuilt gaussian kernel");
        Ok(())
    }

    /// Convolve `input` into `output`, then apply the scaling factors.
    pub(crate) fn update(&mut self, input: &[f64], output: &mut [f64]) {
        self.convolver.apply(input, output);
        if self.scale() {
            for (value, factor) in output.iter_mut().zip(&self.kernel.scaling) {
                *value *= factor;
            }
        }
    }
}
