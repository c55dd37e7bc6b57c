use std::env;

use rust_neural_fields::config::{load_config, FieldConfig};
use rust_neural_fields::utils::distances::{distance_1d, distance_2d, Topology};
use rust_neural_fields::utils::rng::SimpleRng;
use rust_neural_fields::{FieldResult, Shape};
use tracing::{info, Level};

// Structured stimulus: a few Gaussian bumps of random position and height.
const NB_BUMPS: usize = 3;
// Bump width, as a fraction of the field extent.
const BUMP_SIGMA: f64 = 0.05;

fn structured_input(shape: &Shape, topology: Topology, rng: &mut SimpleRng) -> Vec<f64> {
    let dims = shape.dims();
    let mut input = vec![0.0; shape.size()];

    for _ in 0..NB_BUMPS {
        let center: Vec<f64> = dims
            .iter()
            .map(|&n| rng.gen_range_f64(0.0, (n - 1) as f64))
            .collect();
        let amplitude = rng.next_f64();

        for (k, v) in input.iter_mut().enumerate() {
            let d = match dims {
                [n] => distance_1d(k as f64, center[0], *n, topology),
                [rows, cols] => distance_2d(
                    [(k / cols) as f64, (k % cols) as f64],
                    [center[0], center[1]],
                    [*rows, *cols],
                    topology,
                ),
                _ => 0.0,
            };
            *v += amplitude * (-d * d / (2.0 * BUMP_SIGMA * BUMP_SIGMA)).exp();
        }
    }

    // Normalize so that the input peaks at 1.
    let vmax = input.iter().cloned().fold(f64::MIN, f64::max);
    if vmax > 0.0 {
        input.iter_mut().for_each(|v| *v /= vmax);
    }
    input
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

// Configuration file given as first argument, defaults otherwise.
fn config_from_args(args: &[String]) -> FieldResult<FieldConfig> {
    match args.get(1) {
        Some(path) => {
            info!(path = %path, "loading field configuration");
            load_config(path)
        }
        None => Ok(FieldConfig::default()),
    }
}

fn main() -> FieldResult<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args: Vec<String> = env::args().collect();
    let config = config_from_args(&args)?;

    let mut net = config.build_network()?;
    info!("\n{}", net.describe());

    let shape = config.field_shape()?;
    let mut rng = SimpleRng::from_time();
    let stimulus = structured_input(&shape, Topology::from_toric(config.toric), &mut rng);
    net.set_input("input", &stimulus)?;

    for _ in 0..config.steps {
        net.step()?;
    }

    let fu = net.values("fu")?;
    let winner = argmax(fu);
    info!(
        steps = config.steps,
        winner,
        activity = fu[winner],
        stimulus_peak = argmax(&stimulus),
        "competition done"
    );

    for (i, (s, f)) in stimulus.iter().zip(fu).enumerate() {
        println!("{i} {s} {f}");
    }
    Ok(())
}
