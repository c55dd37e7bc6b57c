//! Tests for the non-convolution layer operators
//!
//! This file tests:
//! - Full, sum, constant and vectorized function layers
//! - Leaky integration over several ticks
//! - Layer names and parameter counts

use approx::assert_relative_eq;
use rust_neural_fields::utils::activations::sigmoid;
use rust_neural_fields::{Layer, Network, Shape};

fn shape(n: usize) -> Shape {
    Shape::d1(n).unwrap()
}

fn copy_input(values: &mut [f64], input: &Vec<f64>) {
    values.copy_from_slice(input);
}

// ============================================================================
// Function Layer Tests
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_full_on_2d_predecessor() {
        let mut net = Network::new();
        let x = net.input("x", Shape::d2(2, 3).unwrap(), copy_input).unwrap();
        let f = net.full("f", shape(4), 2.0).unwrap();
        net.connect(f, x).unwrap();
        net.init().unwrap();

        net.set_input("x", &vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        // 2 / 4 · 21
        for &v in net.values("f").unwrap() {
            assert_relative_eq!(v, 10.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sum_of_two_predecessors() {
        let mut net = Network::new();
        let x = net.input("x", shape(3), copy_input).unwrap();
        let c = net.constant("c", shape(3), 0.5).unwrap();
        net.sum(x, c, "s").unwrap();
        net.init().unwrap();

        net.set_input("x", &vec![1.0, -1.0, 2.0]).unwrap();
        assert_eq!(net.values("s").unwrap(), &[1.5, -0.5, 2.5]);
    }

    #[test]
    fn test_constant_without_predecessors() {
        let mut net = Network::new();
        net.constant("h", shape(5), -0.3).unwrap();
        net.init().unwrap();
        net.step().unwrap();
        assert!(net.values("h").unwrap().iter().all(|&v| v == -0.3));

        net.set_parameters("h", &[0.7]).unwrap();
        net.step().unwrap();
        assert!(net.values("h").unwrap().iter().all(|&v| v == 0.7));
    }

    #[test]
    fn test_named_functions() {
        let mut net = Network::new();
        let x = net.input("x", shape(3), copy_input).unwrap();
        let fs = net.function("fs", shape(3), "sigmoid").unwrap();
        let fr = net.function("fr", shape(3), "ReLU").unwrap();
        net.connect(fs, x).unwrap();
        net.connect(fr, x).unwrap();
        net.init().unwrap();

        let input = vec![-2.0, 0.0, 3.0];
        net.set_input("x", &input).unwrap();
        assert_eq!(net.values("fr").unwrap(), &[0.0, 0.0, 3.0]);
        for (a, &b) in net.values("fs").unwrap().iter().zip(&input) {
            assert_relative_eq!(*a, sigmoid(b), epsilon = 1e-15);
        }
        assert_eq!(net.get("fr").unwrap().name(), "function");
    }

    #[test]
    fn test_custom_vectorized_function() {
        let mut net = Network::new();
        let x = net.input("x", shape(4), copy_input).unwrap();
        let sq = net
            .add(Layer::vectorized("sq", shape(4), "square", |v| v * v))
            .unwrap();
        net.connect(sq, x).unwrap();
        net.init().unwrap();

        net.set_input("x", &vec![1.0, -2.0, 0.5, 3.0]).unwrap();
        assert_eq!(net.values("sq").unwrap(), &[1.0, 4.0, 0.25, 9.0]);
        assert_eq!(net.get("sq").unwrap().parameter_count(), 0);
    }
}

// ============================================================================
// Buffered Layer Tests
// ============================================================================

mod buffered_tests {
    use super::*;

    #[test]
    fn test_leaky_integrator_converges_geometrically() {
        let alpha = 0.1;
        let mut net = Network::new();
        let x = net.input("x", shape(2), copy_input).unwrap();
        let u = net.leaky_integrator("u", shape(2), alpha).unwrap();
        net.connect(u, x).unwrap();
        net.init().unwrap();
        net.set_input("x", &vec![1.0, -2.0]).unwrap();

        for k in 1..=20 {
            net.step().unwrap();
            let remaining = (1.0f64 - alpha).powi(k);
            let u = net.values("u").unwrap();
            assert_relative_eq!(u[0], 1.0 - remaining, epsilon = 1e-12);
            assert_relative_eq!(u[1], -2.0 * (1.0 - remaining), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unconnected_buffered_layer_holds_state() {
        let mut net = Network::new();
        net.leaky_integrator("u", shape(3), 0.5).unwrap();
        net.init().unwrap();
        net.step().unwrap();
        assert_eq!(net.values("u").unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_alpha_change_takes_effect() {
        let mut net = Network::new();
        let x = net.input("x", shape(1), copy_input).unwrap();
        let u = net.leaky_integrator("u", shape(1), 0.5).unwrap();
        net.connect(u, x).unwrap();
        net.init().unwrap();
        net.set_input("x", &vec![4.0]).unwrap();

        net.step().unwrap();
        assert_relative_eq!(net.values("u").unwrap()[0], 2.0);
        net.set_parameters("u", &[1.0]).unwrap();
        net.step().unwrap();
        assert_relative_eq!(net.values("u").unwrap()[0], 4.0);
    }
}

// ============================================================================
// Layer Metadata Tests
// ============================================================================

mod metadata_tests {
    use super::*;

    #[test]
    fn test_names_and_parameter_counts() {
        let cases: Vec<(Layer, &str, usize)> = vec![
            (Layer::input("i", shape(3), copy_input), "input", 0),
            (
                Layer::gaussian("g", shape(3), 1.0, 1.0, false, false).unwrap(),
                "gaussian",
                2,
            ),
            (Layer::heaviside("hv", shape(3), 1.0, 0.5, false).unwrap(), "heaviside", 2),
            (Layer::full("f", shape(3), 1.0), "full", 1),
            (Layer::sum("s", shape(3)), "sum", 0),
            (Layer::constant("c", shape(3), 1.0), "constant", 1),
            (Layer::function("fu", shape(3), "sigmoid").unwrap(), "function", 0),
            (
                Layer::uniform_noise("n", shape(3), 0.0, 1.0, 1).unwrap(),
                "uniform_noise",
                2,
            ),
            (Layer::leaky_integrator("u", shape(3), 0.1).unwrap(), "leaky_integrator", 1),
        ];
        for (layer, name, count) in cases {
            assert_eq!(layer.name(), name);
            assert_eq!(layer.parameter_count(), count);
            assert_eq!(layer.parameters().len(), count);
        }
    }

    #[test]
    fn test_input_type_is_reported() {
        let layer = Layer::input("i", shape(3), copy_input);
        assert_eq!(layer.input_type(), Some(std::any::type_name::<Vec<f64>>()));
        assert_eq!(Layer::sum("s", shape(3)).input_type(), None);
    }
}
