//! FFT-based convolution with a reusable workspace
//!
//! `SpectralConvolver` plans its transforms once and owns every buffer it
//! needs, so convolving in the per-tick hot path never allocates. The
//! kernel spectrum is cached: a layer whose kernel only changes with its
//! parameters calls `set_kernel` on rebuild and `apply` on every tick.
//!
//! 2D transforms are computed as row FFTs, a transpose, then column FFTs;
//! the spectrum is kept in transposed layout until the inverse transform
//! brings it back.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::layers::Shape;

/// Boundary handling of a same-size convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolutionMode {
    /// Zero padding outside the source. The output is the centred part of
    /// the full linear convolution: `dst[i] = full[i + K/2]`.
    LinearSame,
    /// Periodic source. The kernel is indexed by offset with its centre at
    /// index 0: `dst[i] = Σ_j src[j] · k[(i - j) mod N]`.
    CircularSame,
}

/// Reusable convolution workspace for one source shape and kernel shape.
#[derive(Clone)]
pub struct SpectralConvolver {
    mode: ConvolutionMode,
    source: (usize, usize),
    kernel: (usize, usize),
    fft: (usize, usize),
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
    signal: Vec<Complex<f64>>,
    transposed: Vec<Complex<f64>>,
    kernel_spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralConvolver {
    /// Plan a convolution of a `source`-shaped array with a `kernel`-shaped
    /// array. The kernel starts out as zero until `set_kernel` is called.
    pub fn new(source: &Shape, kernel: &Shape, mode: ConvolutionMode) -> Self {
        let (src_rows, src_cols) = source.rows_cols();
        let (ker_rows, ker_cols) = kernel.rows_cols();
        let (fft_rows, fft_cols) = match mode {
            ConvolutionMode::LinearSame => (src_rows + ker_rows - 1, src_cols + ker_cols - 1),
            ConvolutionMode::CircularSame => (src_rows, src_cols),
        };

        let mut planner = FftPlanner::<f64>::new();
        let row_forward = planner.plan_fft_forward(fft_cols);
        let row_inverse = planner.plan_fft_inverse(fft_cols);
        let col_forward = planner.plan_fft_forward(fft_rows);
        let col_inverse = planner.plan_fft_inverse(fft_rows);

        let scratch_len = [&row_forward, &row_inverse, &col_forward, &col_inverse]
            .iter()
            .map(|plan| plan.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);

        let len = fft_rows * fft_cols;
        Self {
            mode,
            source: (src_rows, src_cols),
            kernel: (ker_rows, ker_cols),
            fft: (fft_rows, fft_cols),
            row_forward,
            row_inverse,
            col_forward,
            col_inverse,
            signal: vec![Complex::new(0.0, 0.0); len],
            transposed: vec![Complex::new(0.0, 0.0); len],
            kernel_spectrum: vec![Complex::new(0.0, 0.0); len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn mode(&self) -> ConvolutionMode {
        self.mode
    }

    /// Size of the transforms as `(rows, cols)`.
    pub fn fft_size(&self) -> (usize, usize) {
        self.fft
    }

    /// Transform and cache a new kernel.
    ///
    /// # Panics
    ///
    /// Panics if `kernel` does not hold exactly the planned number of
    /// kernel elements.
    pub fn set_kernel(&mut self, kernel: &[f64]) {
        let (ker_rows, ker_cols) = self.kernel;
        let (fft_rows, fft_cols) = self.fft;
        assert_eq!(
            kernel.len(),
            ker_rows * ker_cols,
            "kernel length mismatch in set_kernel"
        );

        self.signal.fill(Complex::new(0.0, 0.0));
        for r in 0..ker_rows {
            for c in 0..ker_cols {
                // Circular kernels larger than the grid fold back onto it.
                let idx = (r % fft_rows) * fft_cols + (c % fft_cols);
                self.signal[idx].re += kernel[r * ker_cols + c];
            }
        }
        self.forward();
        self.kernel_spectrum.copy_from_slice(&self.transposed);
    }

    /// Convolve `source` with the cached kernel into `destination`.
    ///
    /// # Panics
    ///
    /// Panics if `source` or `destination` do not match the planned source
    /// size.
    pub fn apply(&mut self, source: &[f64], destination: &mut [f64]) {
        let (src_rows, src_cols) = self.source;
        let (ker_rows, ker_cols) = self.kernel;
        let (fft_rows, fft_cols) = self.fft;
        assert_eq!(source.len(), src_rows * src_cols, "source length mismatch in apply");
        assert_eq!(
            destination.len(),
            src_rows * src_cols,
            "destination length mismatch in apply"
        );

        self.signal.fill(Complex::new(0.0, 0.0));
        for r in 0..src_rows {
            let row = &source[r * src_cols..(r + 1) * src_cols];
            for (c, &v) in row.iter().enumerate() {
                self.signal[r * fft_cols + c] = Complex::new(v, 0.0);
            }
        }

        self.forward();
        for (s, k) in self.transposed.iter_mut().zip(&self.kernel_spectrum) {
            *s *= *k;
        }
        self.inverse();

        let (off_r, off_c) = match self.mode {
            ConvolutionMode::LinearSame => (ker_rows / 2, ker_cols / 2),
            ConvolutionMode::CircularSame => (0, 0),
        };
        let norm = 1.0 / (fft_rows * fft_cols) as f64;
        for r in 0..src_rows {
            for c in 0..src_cols {
                destination[r * src_cols + c] =
                    self.signal[(r + off_r) * fft_cols + (c + off_c)].re * norm;
            }
        }
    }

    /// Convolve `source` with `kernel` into `destination`.
    pub fn convolve(&mut self, source: &[f64], kernel: &[f64], destination: &mut [f64]) {
        self.set_kernel(kernel);
        self.apply(source, destination);
    }

    fn forward(&mut self) {
        let (rows, cols) = self.fft;
        if cols > 1 {
            self.row_forward
                .process_with_scratch(&mut self.signal, &mut self.scratch);
        }
        transpose(&self.signal, &mut self.transposed, rows, cols);
        if rows > 1 {
            self.col_forward
                .process_with_scratch(&mut self.transposed, &mut self.scratch);
        }
    }

    fn inverse(&mut self) {
        let (rows, cols) = self.fft;
        if rows > 1 {
            self.col_inverse
                .process_with_scratch(&mut self.transposed, &mut self.scratch);
        }
        transpose(&self.transposed, &mut self.signal, cols, rows);
        if cols > 1 {
            self.row_inverse
                .process_with_scratch(&mut self.signal, &mut self.scratch);
        }
    }
}

impl fmt::Debug for SpectralConvolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralConvolver")
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("kernel", &self.kernel)
            .field("fft", &self.fft)
            .finish()
    }
}

/// Row-major `rows × cols` into row-major `cols × rows`.
fn transpose(src: &[Complex<f64>], dst: &mut [Complex<f64>], rows: usize, cols: usize) {
    for r in 0..rows {
        for c in 0..cols {
            dst[c * rows + r] = src[r * cols + c];
        }
    }
}
