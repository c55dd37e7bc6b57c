//! Grid distances under toric or linear topology
//!
//! Two flavours live here:
//! - `axis_offset`, the raw offset in grid units used to sample kernels
//! - `distance_1d` / `distance_2d`, distances normalised by the extent of
//!   each axis, used to place stimuli on a field independently of its size

use serde::{Deserialize, Serialize};

/// Boundary behaviour of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// The grid wraps around at its edges.
    Toric,
    /// The grid is bounded.
    Linear,
}

impl Topology {
    pub fn from_toric(toric: bool) -> Self {
        if toric {
            Topology::Toric
        } else {
            Topology::Linear
        }
    }

    pub fn is_toric(self) -> bool {
        self == Topology::Toric
    }
}

/// Offset between two positions along an axis of `extent` cells, in grid
/// units. Toric offsets are the shorter way around.
pub fn axis_offset(a: f64, b: f64, extent: usize, topology: Topology) -> f64 {
    let d = (a - b).abs();
    match topology {
        Topology::Toric => d.min(extent as f64 - d),
        Topology::Linear => d,
    }
}

/// Distance between two positions on a 1D field of `extent` cells, as a
/// fraction of the extent.
pub fn distance_1d(a: f64, b: f64, extent: usize, topology: Topology) -> f64 {
    axis_offset(a, b, extent, topology) / extent as f64
}

/// Euclidean distance between two positions on a `rows × cols` field, each
/// axis normalised by its extent.
pub fn distance_2d(
    a: [f64; 2],
    b: [f64; 2],
    extents: [usize; 2],
    topology: Topology,
) -> f64 {
    let d0 = distance_1d(a[0], b[0], extents[0], topology);
    let d1 = distance_1d(a[1], b[1], extents[1], topology);
    (d0 * d0 + d1 * d1).sqrt()
}
