//! Rust Neural Fields Library
//!
//! Dynamic neural fields built as computation graphs: layers holding 1D or
//! 2D activity maps, wired together and stepped in discrete time.
//!
//! # Modules
//!
//! - `layers`: Layer kinds and operators (Gaussian, Heaviside, leaky integrator, etc.)
//! - `network`: Layer ownership, evaluation order and ticks
//! - `utils`: Shared utilities (RNG, transfer functions, distances, FFT convolution)
//! - `config`: Competition field configuration
//! - `architecture`: Arbitrary graphs described in JSON
//! - `error`: Error type shared by every fallible operation

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod utils;

pub use error::{FieldError, FieldResult};
pub use layers::{InputId, Layer, LayerId, Shape};
pub use network::Network;
