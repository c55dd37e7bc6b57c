//! Configuration of the competition field
//!
//! This module describes the canonical neural field used for competition
//! (winner-take-all) experiments and builds its network:
//!
//! ```text
//! u <- gexc + ginh + input + h
//! gexc, ginh <- fu
//! fu <- u
//! ```
//!
//! `u` is a leaky integrator, `fu` its transfer function, `gexc`/`ginh`
//! Gaussian excitation and inhibition, `h` a constant baseline and `input`
//! the external stimulus, fed with a `Vec<f64>`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{FieldError, FieldResult};
use crate::layers::Shape;
use crate::network::Network;
use crate::utils::activations;

/// Amplitude and spread of a Gaussian coupling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    pub amplitude: f64,
    /// Standard deviation, in grid cells
    pub spread: f64,
}

/// Parameters of the competition field.
///
/// Every field is optional in JSON; missing ones take their `Default`
/// value.
///
/// # Example
///
/// ```json
/// {
///   "shape": [100],
///   "toric": false,
///   "scale": true,
///   "dt_tau": 0.01,
///   "h": 0.0,
///   "excitation": { "amplitude": 1.5, "spread": 2.0 },
///   "inhibition": { "amplitude": -1.3, "spread": 10.0 },
///   "transfer_function": "sigmoid",
///   "steps": 100
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// One or two extents
    pub shape: Vec<usize>,
    /// Wrap-around boundaries for both Gaussian couplings
    pub toric: bool,
    /// Border scaling for both Gaussian couplings (linear fields only)
    pub scale: bool,
    /// Integration rate of the field potential, in (0, 1]
    pub dt_tau: f64,
    /// Baseline added to the potential
    pub h: f64,
    pub excitation: KernelConfig,
    pub inhibition: KernelConfig,
    /// "sigmoid" or "relu"
    pub transfer_function: String,
    /// Number of ticks a scenario runs for
    pub steps: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            shape: vec![100],
            toric: false,
            scale: true,
            dt_tau: 0.01,
            h: 0.0,
            excitation: KernelConfig {
                amplitude: 1.5,
                spread: 2.0,
            },
            inhibition: KernelConfig {
                amplitude: -1.3,
                spread: 10.0,
            },
            transfer_function: "sigmoid".to_string(),
            steps: 100,
        }
    }
}

/// Loads a field configuration from a JSON file and validates it.
///
/// # Examples
///
/// ```no_run
/// use rust_neural_fields::config::load_config;
///
/// let cfg = load_config("config/competition_1d.json").unwrap();
/// assert_eq!(cfg.transfer_function, "sigmoid");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> FieldResult<FieldConfig> {
    let contents = fs::read_to_string(path)?;
    FieldConfig::from_json(&contents)
}

impl FieldConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> FieldResult<Self> {
        let config: FieldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FieldResult<()> {
        Shape::new(&self.shape)
            .map_err(|e| FieldError::config(format!("invalid shape {:?}: {e}", self.shape)))?;

        if !(self.dt_tau > 0.0 && self.dt_tau <= 1.0) {
            return Err(FieldError::config(format!(
                "dt_tau must be in range (0.0, 1.0], got {}",
                self.dt_tau
            )));
        }
        for (name, kernel) in [("excitation", &self.excitation), ("inhibition", &self.inhibition)] {
            if !(kernel.spread > 0.0 && kernel.spread.is_finite()) {
                return Err(FieldError::config(format!(
                    "{name} spread must be positive and finite, got {}",
                    kernel.spread
                )));
            }
            if !kernel.amplitude.is_finite() {
                return Err(FieldError::config(format!(
                    "{name} amplitude must be finite, got {}",
                    kernel.amplitude
                )));
            }
        }
        if !self.h.is_finite() {
            return Err(FieldError::config(format!("h must be finite, got {}", self.h)));
        }
        activations::by_name(&self.transfer_function).map_err(|_| {
            FieldError::config(format!(
                "Invalid transfer function '{}'. Must be one of: sigmoid, relu",
                self.transfer_function
            ))
        })?;
        if self.steps == 0 {
            return Err(FieldError::config("steps must be greater than 0"));
        }
        Ok(())
    }

    pub fn field_shape(&self) -> FieldResult<Shape> {
        Shape::new(&self.shape)
    }

    /// The optimisation vector `[dt_tau, h, Ap, sm, ka, ks]`, where the
    /// inhibition amplitude is `ka · Ap` and the excitation spread `ks · sm`.
    pub fn parameter_vector(&self) -> [f64; 6] {
        let ka = if self.excitation.amplitude != 0.0 {
            self.inhibition.amplitude / self.excitation.amplitude
        } else {
            0.0
        };
        [
            self.dt_tau,
            self.h,
            self.excitation.amplitude,
            self.inhibition.spread,
            ka,
            self.excitation.spread / self.inhibition.spread,
        ]
    }

    /// Copy of this configuration with the parameters of an optimisation
    /// vector `[dt_tau, h, Ap, sm, ka, ks]`.
    pub fn with_parameter_vector(&self, params: &[f64]) -> FieldResult<Self> {
        let [dt_tau, h, ap, sm, ka, ks] = match params {
            &[a, b, c, d, e, f] => [a, b, c, d, e, f],
            _ => {
                return Err(FieldError::config(format!(
                    "parameter vector must hold 6 values [dt_tau, h, Ap, sm, ka, ks], got {}",
                    params.len()
                )))
            }
        };

        let config = Self {
            dt_tau,
            h,
            excitation: KernelConfig {
                amplitude: ap,
                spread: ks * sm,
            },
            inhibition: KernelConfig {
                amplitude: ka * ap,
                spread: sm,
            },
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Build and initialise the competition network.
    pub fn build_network(&self) -> FieldResult<Network> {
        self.validate()?;
        let shape = self.field_shape()?;
        let mut net = Network::new();

        let input = net.input("input", shape.clone(), |values: &mut [f64], stimulus: &Vec<f64>| {
            for (v, &s) in values.iter_mut().zip(stimulus) {
                *v = s;
            }
        })?;
        let h = net.constant("h", shape.clone(), self.h)?;
        let u = net.leaky_integrator("u", shape.clone(), self.dt_tau)?;
        let gexc = net.gaussian(
            "gexc",
            shape.clone(),
            self.excitation.amplitude,
            self.excitation.spread,
            self.toric,
            self.scale,
        )?;
        let ginh = net.gaussian(
            "ginh",
            shape.clone(),
            self.inhibition.amplitude,
            self.inhibition.spread,
            self.toric,
            self.scale,
        )?;
        let fu = net.function("fu", shape, &self.transfer_function)?;

        net.connect(gexc, fu)?;
        net.connect(ginh, fu)?;
        net.connect(fu, u)?;
        let lateral = net.sum(gexc, ginh, "")?;
        let driven = net.sum(lateral, input, "")?;
        let total = net.sum(driven, h, "")?;
        net.connect(u, total)?;

        net.init()?;
        Ok(net)
    }

    /// Push the parameters of this configuration into a network built by
    /// `build_network`.
    pub fn apply(&self, net: &mut Network) -> FieldResult<()> {
        self.validate()?;
        net.set_parameters("gexc", &[self.excitation.amplitude, self.excitation.spread])?;
        net.set_parameters("ginh", &[self.inhibition.amplitude, self.inhibition.spread])?;
        net.set_parameters("h", &[self.h])?;
        net.set_parameters("u", &[self.dt_tau])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(FieldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let cfg = FieldConfig::from_json(r#"{ "shape": [20], "h": -0.5 }"#).unwrap();
        assert_eq!(cfg.shape, vec![20]);
        assert_relative_eq!(cfg.h, -0.5);
        assert_relative_eq!(cfg.dt_tau, 0.01);
        assert_relative_eq!(cfg.inhibition.spread, 10.0);
    }

    #[test]
    fn test_parameter_vector_roundtrip() {
        let cfg = FieldConfig::default();
        let params = cfg.parameter_vector();
        let back = cfg.with_parameter_vector(&params).unwrap();
        assert_relative_eq!(back.inhibition.amplitude, -1.3, epsilon = 1e-12);
        assert_relative_eq!(back.excitation.spread, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parameter_vector_length() {
        let err = FieldConfig::default()
            .with_parameter_vector(&[0.1, 0.0])
            .unwrap_err();
        assert!(matches!(err, FieldError::Config(_)));
    }
}
