use rust_neural_fields::{FieldResult, Network, Shape};
use tracing::{info, Level};

// Bump stimulus integrated by a field with Gaussian self-excitation.
const SIZE: usize = 10;
const AMPLITUDE: f64 = 1.5;
const SPREAD: f64 = 2.0;
const ALPHA: f64 = 0.01;
const STEPS: usize = 1000;

// Gaussian bump of width SIZE/4 centred on `center`.
fn fill_bump(values: &mut [f64], center: &f64) {
    let sigma = SIZE as f64 / 4.0;
    for (i, v) in values.iter_mut().enumerate() {
        let d = i as f64 - center;
        *v = (-d * d / (2.0 * sigma * sigma)).exp();
    }
}

fn build_network(shape: Shape) -> FieldResult<Network> {
    let mut net = Network::new();
    let input = net.input("input", shape.clone(), fill_bump)?;
    let u = net.leaky_integrator("u", shape.clone(), ALPHA)?;
    let fu = net.function("fu", shape.clone(), "sigmoid")?;
    let gexc = net.gaussian("gexc", shape, AMPLITUDE, SPREAD, false, false)?;

    net.connect(u, input)?;
    net.connect(fu, u)?;
    net.connect(gexc, fu)?;
    Ok(net)
}

fn print_row(name: &str, values: &[f64]) {
    let row: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    println!("{name:>6}: {}", row.join(" "));
}

fn main() -> FieldResult<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let mut net = build_network(Shape::d1(SIZE)?)?;
    net.set_input("input", &(SIZE as f64 / 2.0))?;
    net.init()?;
    info!("\n{}", net.describe());

    for _ in 0..STEPS {
        net.step()?;
    }
    info!(steps = STEPS, "simulation done");

    for label in ["input", "u", "fu", "gexc"] {
        print_row(label, net.values(label)?);
    }
    Ok(())
}
