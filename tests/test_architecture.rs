//! Tests for architecture parsing and building
//!
//! This file tests the architecture module including:
//! - Loading valid JSON architecture configs
//! - Parsing every layer type
//! - Building networks from configs
//! - Handling invalid JSON and missing files
//! - Validating labels and layer connections

use approx::assert_relative_eq;
use rust_neural_fields::architecture::{build_network, load_architecture, parse_architecture};
use rust_neural_fields::FieldError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

fn assert_config_error(json: &str, needle: &str) {
    let err = parse_architecture(json).unwrap_err();
    match err {
        FieldError::Config(msg) => assert!(msg.contains(needle), "'{msg}' lacks '{needle}'"),
        other => panic!("expected a config error, got {other}"),
    }
}

// ============================================================================
// Valid Architecture Loading Tests
// ============================================================================

mod valid_architecture_tests {
    use super::*;

    #[test]
    fn test_load_basics() {
        let config = load_architecture("config/architectures/basics.json").unwrap();

        assert_eq!(config.shape, Some(vec![10]));
        assert_eq!(config.layers.len(), 4);
        assert_eq!(config.layers[0].layer_type, "input");
        assert!(config.layers[0].inputs.is_empty());
        assert_eq!(config.layers[1].alpha, Some(0.01));
        assert_eq!(config.layers[2].function.as_deref(), Some("sigmoid"));
        assert_eq!(config.layers[3].inputs, vec!["fu".to_string()]);
    }

    #[test]
    fn test_load_from_temp_file() {
        let config_json = r#"{
  "layers": [
    { "layer_type": "input", "label": "x", "shape": [3, 4] },
    { "layer_type": "gaussian", "label": "g", "shape": [3, 4],
      "amplitude": 1.0, "spread": 0.5, "toric": true, "inputs": ["x"] }
  ]
}"#;
        let temp_file = write_temp_config(config_json);
        let config = load_architecture(temp_file.path()).unwrap();

        assert_eq!(config.shape, None);
        assert_eq!(config.layers[1].toric, Some(true));
        assert_eq!(config.layers[1].scale, None);
        assert_eq!(config.layers[1].shape, Some(vec![3, 4]));
    }

    #[test]
    fn test_layer_type_is_case_insensitive() {
        let json = r#"{ "shape": [5], "layers": [
            { "layer_type": "Input", "label": "x" },
            { "layer_type": "FULL", "label": "f", "weight": 1.0, "inputs": ["x"] }
        ] }"#;
        let net = build_network(&parse_architecture(json).unwrap()).unwrap();
        assert_eq!(net.get("f").unwrap().name(), "full");
    }
}

// ============================================================================
// Invalid Architecture Tests
// ============================================================================

mod invalid_architecture_tests {
    use super::*;

    #[test]
    fn test_empty_layers() {
        assert_config_error(r#"{ "shape": [5], "layers": [] }"#, "at least one layer");
    }

    #[test]
    fn test_unknown_layer_type() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "dense", "label": "d" } ] }"#,
            "Invalid layer type 'dense'",
        );
    }

    #[test]
    fn test_empty_and_duplicate_labels() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "input", "label": "" } ] }"#,
            "label must not be empty",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [
                { "layer_type": "input", "label": "x" },
                { "layer_type": "constant", "label": "x", "value": 1.0 }
            ] }"#,
            "duplicate label 'x'",
        );
    }

    #[test]
    fn test_undefined_input() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [
                { "layer_type": "function", "label": "f", "function": "relu", "inputs": ["ghost"] }
            ] }"#,
            "input 'ghost' is not defined",
        );
    }

    #[test]
    fn test_input_count() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [
                { "layer_type": "input", "label": "x" },
                { "layer_type": "sum", "label": "s", "inputs": ["x"] }
            ] }"#,
            "takes 2 input(s), got 1",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [
                { "layer_type": "input", "label": "x" },
                { "layer_type": "constant", "label": "c", "value": 0.0, "inputs": ["x"] }
            ] }"#,
            "takes 0 input(s), got 1",
        );
    }

    #[test]
    fn test_missing_required_fields() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "gaussian", "label": "g", "spread": 1.0,
                "inputs": ["g"] } ] }"#,
            "requires 'amplitude'",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "uniform_noise", "label": "n", "min": 0.0 } ] }"#,
            "requires 'max'",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "constant", "label": "c" } ] }"#,
            "requires 'value'",
        );
    }

    #[test]
    fn test_out_of_range_values() {
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "leaky_integrator", "label": "u",
                "alpha": 2.0, "inputs": ["u"] } ] }"#,
            "alpha must be in range",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "heaviside", "label": "h",
                "weight": 1.0, "radius": 0.0, "inputs": ["h"] } ] }"#,
            "radius must be in range",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "uniform_noise", "label": "n",
                "min": 1.0, "max": 0.0 } ] }"#,
            "min must not exceed max",
        );
        assert_config_error(
            r#"{ "shape": [5], "layers": [ { "layer_type": "function", "label": "f",
                "function": "tanh", "inputs": ["f"] } ] }"#,
            "unknown function 'tanh'",
        );
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_architecture(r#"{ "layers": [ { "layer_type": "input" } ] }"#).unwrap_err();
        assert!(matches!(err, FieldError::Serialization(_)));

        let temp_file = write_temp_config("{ not json");
        let err = load_architecture(temp_file.path()).unwrap_err();
        assert!(matches!(err, FieldError::Serialization(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_architecture("config/architectures/missing.json").unwrap_err();
        assert!(matches!(err, FieldError::Io(_)));
    }
}

// ============================================================================
// Network Building Tests
// ============================================================================

mod build_tests {
    use super::*;

    #[test]
    fn test_build_basics() {
        let config = load_architecture("config/architectures/basics.json").unwrap();
        let mut net = build_network(&config).unwrap();

        assert_eq!(net.len(), 4);
        assert!(net.is_initialized());
        let u = net.id_of("u").unwrap();
        assert_eq!(net.get("fu").unwrap().predecessors(), &[u]);

        net.set_input("input", &vec![1.0; 10]).unwrap();
        net.step().unwrap();
        for &v in net.values("u").unwrap() {
            assert_relative_eq!(v, 0.01, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_build_global_inhibition() {
        let config = load_architecture("config/architectures/global_inhibition.json").unwrap();
        let mut net = build_network(&config).unwrap();

        // fu is declared last but feeds exc and inh.
        let order = net.function_order().to_vec();
        let pos = |label: &str| {
            let id = net.id_of(label).unwrap();
            order.iter().position(|&o| o == id).unwrap()
        };
        assert!(pos("fu") < pos("exc"));
        assert!(pos("fu") < pos("inh"));
        assert!(pos("lateral") < pos("driven"));
        assert!(pos("driven") < pos("total"));

        let stimulus: Vec<f64> = (0..50).map(|i| if (20..30).contains(&i) { 1.0 } else { 0.0 }).collect();
        net.set_input("input", &stimulus).unwrap();
        for _ in 0..50 {
            net.step().unwrap();
        }
        assert!(net.values("u").unwrap().iter().all(|v| v.is_finite()));
        assert!(net.values("fu").unwrap().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_cyclic_architecture_fails_to_build() {
        let json = r#"{ "shape": [4], "layers": [
            { "layer_type": "function", "label": "a", "function": "relu", "inputs": ["b"] },
            { "layer_type": "function", "label": "b", "function": "relu", "inputs": ["a"] }
        ] }"#;
        let err = build_network(&parse_architecture(json).unwrap()).unwrap_err();
        match err {
            FieldError::CyclicDependency { labels } => assert_eq!(labels, vec!["a", "b"]),
            other => panic!("expected a cycle, got {other}"),
        }
    }

    #[test]
    fn test_shape_mismatch_fails_to_build() {
        let json = r#"{ "shape": [4], "layers": [
            { "layer_type": "input", "label": "x", "shape": [5] },
            { "layer_type": "function", "label": "f", "function": "relu", "inputs": ["x"] }
        ] }"#;
        let err = build_network(&parse_architecture(json).unwrap()).unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { .. }));
    }
}
