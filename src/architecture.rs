//! Architecture configuration structures
//!
//! This module describes arbitrary neural field graphs in JSON: a list of
//! labeled layers, each naming the layers it reads from. This enables
//! experimenting with field equations without code changes.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{FieldError, FieldResult};
use crate::layers::{Layer, Shape};
use crate::network::Network;
use crate::utils::activations;

/// Layer types understood by `build_network`.
pub const LAYER_TYPES: [&str; 9] = [
    "input",
    "constant",
    "gaussian",
    "heaviside",
    "full",
    "sum",
    "function",
    "uniform_noise",
    "leaky_integrator",
];

/// Configuration for a single layer of the graph.
///
/// Different layer types require different fields:
///
/// - **input**: nothing; fed with a `Vec<f64>` copied verbatim
/// - **constant**: `value`
/// - **gaussian**: `amplitude`, `spread`, optional `toric`, `scale` (default false)
/// - **heaviside**: `weight`, `radius` in (0, 1], optional `toric`
/// - **full**: `weight`
/// - **sum**: exactly two `inputs`
/// - **function**: `function` ("sigmoid" or "relu")
/// - **uniform_noise**: `min`, `max`, optional `seed` (default 0)
/// - **leaky_integrator**: `alpha` in (0, 1]
///
/// # Example
///
/// ```json
/// {
///   "layer_type": "gaussian",
///   "label": "gexc",
///   "amplitude": 1.5,
///   "spread": 2.0,
///   "inputs": ["fu"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Type of layer, one of `LAYER_TYPES`
    pub layer_type: String,
    /// Unique, non-empty label
    pub label: String,
    /// Shape of the layer; defaults to the architecture's shape
    pub shape: Option<Vec<usize>>,
    /// Labels of the predecessors, in connection order
    #[serde(default)]
    pub inputs: Vec<String>,

    // Gaussian parameters
    pub amplitude: Option<f64>,
    pub spread: Option<f64>,
    pub toric: Option<bool>,
    pub scale: Option<bool>,

    // Heaviside and full parameters
    pub weight: Option<f64>,
    pub radius: Option<f64>,

    // Constant parameter
    pub value: Option<f64>,

    // Function parameter
    pub function: Option<String>,

    // Uniform noise parameters
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub seed: Option<u64>,

    // Leaky integrator parameter
    pub alpha: Option<f64>,
}

/// Configuration for a whole graph.
///
/// # Example
///
/// ```json
/// {
///   "shape": [50],
///   "layers": [
///     { "layer_type": "input", "label": "input" },
///     { "layer_type": "leaky_integrator", "label": "u", "alpha": 0.1, "inputs": ["input"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Shape of every layer that does not give its own
    pub shape: Option<Vec<usize>>,
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file and validates it.
///
/// # Examples
///
/// ```no_run
/// use rust_neural_fields::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/basics.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: impl AsRef<Path>) -> FieldResult<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    parse_architecture(&contents)
}

/// Parses and validates an architecture from a JSON string.
pub fn parse_architecture(json: &str) -> FieldResult<ArchitectureConfig> {
    let config: ArchitectureConfig = serde_json::from_str(json)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - The architecture has at least one layer
/// - Each layer has the fields its type requires, with valid values
/// - Labels are non-empty and unique
/// - Every input names a layer of the architecture
pub fn validate_architecture(config: &ArchitectureConfig) -> FieldResult<()> {
    if config.layers.is_empty() {
        return Err(FieldError::config("Architecture must have at least one layer"));
    }

    let mut labels = HashSet::new();
    for (i, layer) in config.layers.iter().enumerate() {
        if layer.label.is_empty() {
            return Err(FieldError::config(format!("Layer {i}: label must not be empty")));
        }
        if !labels.insert(layer.label.as_str()) {
            return Err(FieldError::config(format!(
                "Layer {i}: duplicate label '{}'",
                layer.label
            )));
        }
        validate_layer(config, layer, i)?;
    }

    for (i, layer) in config.layers.iter().enumerate() {
        if let Some(missing) = layer.inputs.iter().find(|l| !labels.contains(l.as_str())) {
            return Err(FieldError::config(format!(
                "Layer {i}: input '{missing}' is not defined"
            )));
        }
    }

    Ok(())
}

fn require<T: Copy>(value: Option<T>, index: usize, layer_type: &str, field: &str) -> FieldResult<T> {
    value.ok_or_else(|| {
        FieldError::config(format!("Layer {index}: {layer_type} layer requires '{field}'"))
    })
}

fn expected_inputs(layer_type: &str) -> usize {
    match layer_type {
        "input" | "constant" | "uniform_noise" => 0,
        "sum" => 2,
        _ => 1,
    }
}

/// Validates a single layer configuration.
fn validate_layer(config: &ArchitectureConfig, layer: &LayerConfig, index: usize) -> FieldResult<()> {
    let layer_type = layer.layer_type.to_lowercase();
    if !LAYER_TYPES.contains(&layer_type.as_str()) {
        return Err(FieldError::config(format!(
            "Layer {index}: Invalid layer type '{}'. Must be one of: {}",
            layer.layer_type,
            LAYER_TYPES.join(", ")
        )));
    }

    layer_shape(config, layer, index)?;

    let expected = expected_inputs(&layer_type);
    if layer.inputs.len() != expected {
        return Err(FieldError::config(format!(
            "Layer {index}: {layer_type} layer takes {expected} input(s), got {}",
            layer.inputs.len()
        )));
    }

    match layer_type.as_str() {
        "constant" => {
            require(layer.value, index, &layer_type, "value")?;
        }
        "gaussian" => {
            require(layer.amplitude, index, &layer_type, "amplitude")?;
            let spread = require(layer.spread, index, &layer_type, "spread")?;
            if spread <= 0.0 {
                return Err(FieldError::config(format!(
                    "Layer {index}: spread must be positive"
                )));
            }
        }
        "heaviside" => {
            require(layer.weight, index, &layer_type, "weight")?;
            let radius = require(layer.radius, index, &layer_type, "radius")?;
            if !(radius > 0.0 && radius <= 1.0) {
                return Err(FieldError::config(format!(
                    "Layer {index}: radius must be in range (0.0, 1.0]"
                )));
            }
        }
        "full" => {
            require(layer.weight, index, &layer_type, "weight")?;
        }
        "function" => {
            let name = layer.function.as_deref().ok_or_else(|| {
                FieldError::config(format!("Layer {index}: function layer requires 'function'"))
            })?;
            activations::by_name(name).map_err(|e| FieldError::config(format!("Layer {index}: {e}")))?;
        }
        "uniform_noise" => {
            let min = require(layer.min, index, &layer_type, "min")?;
            let max = require(layer.max, index, &layer_type, "max")?;
            if min > max {
                return Err(FieldError::config(format!(
                    "Layer {index}: min must not exceed max"
                )));
            }
        }
        "leaky_integrator" => {
            let alpha = require(layer.alpha, index, &layer_type, "alpha")?;
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(FieldError::config(format!(
                    "Layer {index}: alpha must be in range (0.0, 1.0]"
                )));
            }
        }
        _ => {}
    }

    Ok(())
}

fn layer_shape(config: &ArchitectureConfig, layer: &LayerConfig, index: usize) -> FieldResult<Shape> {
    let dims = layer.shape.as_ref().or(config.shape.as_ref()).ok_or_else(|| {
        FieldError::config(format!(
            "Layer {index}: no 'shape' given for the layer or the architecture"
        ))
    })?;
    Shape::new(dims).map_err(|e| FieldError::config(format!("Layer {index}: {e}")))
}

fn build_layer(config: &ArchitectureConfig, layer: &LayerConfig, index: usize) -> FieldResult<Layer> {
    let layer_type = layer.layer_type.to_lowercase();
    let shape = layer_shape(config, layer, index)?;
    let label = layer.label.as_str();

    match layer_type.as_str() {
        "input" => Ok(Layer::input(label, shape, |values: &mut [f64], input: &Vec<f64>| {
            for (v, &x) in values.iter_mut().zip(input) {
                *v = x;
            }
        })),
        "constant" => Ok(Layer::constant(
            label,
            shape,
            require(layer.value, index, &layer_type, "value")?,
        )),
        "gaussian" => Layer::gaussian(
            label,
            shape,
            require(layer.amplitude, index, &layer_type, "amplitude")?,
            require(layer.spread, index, &layer_type, "spread")?,
            layer.toric.unwrap_or(false),
            layer.scale.unwrap_or(false),
        ),
        "heaviside" => Layer::heaviside(
            label,
            shape,
            require(layer.weight, index, &layer_type, "weight")?,
            require(layer.radius, index, &layer_type, "radius")?,
            layer.toric.unwrap_or(false),
        ),
        "full" => Ok(Layer::full(
            label,
            shape,
            require(layer.weight, index, &layer_type, "weight")?,
        )),
        "sum" => Ok(Layer::sum(label, shape)),
        "function" => Layer::function(label, shape, layer.function.as_deref().unwrap_or_default()),
        "uniform_noise" => Layer::uniform_noise(
            label,
            shape,
            require(layer.min, index, &layer_type, "min")?,
            require(layer.max, index, &layer_type, "max")?,
            layer.seed.unwrap_or(0),
        ),
        "leaky_integrator" => Layer::leaky_integrator(
            label,
            shape,
            require(layer.alpha, index, &layer_type, "alpha")?,
        ),
        other => Err(FieldError::config(format!(
            "Layer {index}: Invalid layer type '{other}'"
        ))),
    }
}

/// Builds and initialises a network from an architecture configuration.
///
/// Layers are registered in the order they appear, then connected to their
/// inputs in order, so the network's insertion order follows the file.
///
/// # Examples
///
/// ```no_run
/// use rust_neural_fields::architecture::{load_architecture, build_network};
///
/// let config = load_architecture("config/architectures/basics.json").unwrap();
/// let net = build_network(&config).unwrap();
/// assert_eq!(net.len(), config.layers.len());
/// ```
pub fn build_network(config: &ArchitectureConfig) -> FieldResult<Network> {
    validate_architecture(config)?;

    let mut net = Network::new();
    let mut ids = Vec::with_capacity(config.layers.len());
    for (i, layer_config) in config.layers.iter().enumerate() {
        ids.push(net.add(build_layer(config, layer_config, i)?)?);
    }

    for (layer_config, &id) in config.layers.iter().zip(&ids) {
        for input in &layer_config.inputs {
            let source = net.id_of(input)?;
            net.connect(id, source)?;
        }
    }

    net.init()?;
    Ok(net)
}
