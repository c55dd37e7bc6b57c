//! Shared utilities for neural field layers
//!
//! This module provides the numerical building blocks the layers rely on:
//! random number generation, transfer functions, grid distances and
//! FFT-based convolution.

pub mod activations;
pub mod convolution;
pub mod distances;
pub mod rng;
