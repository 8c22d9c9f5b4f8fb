//! Quantum Teleportation Demo
//!
//! Teleports a random real single-qubit state from qubit 0 to qubit 2 and
//! checks the transfer by re-estimating the amplitudes from shot counts.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use console::style;
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;

use qlab_adapter_sim::SimulatorBackend;
use qlab_demos::artifacts::{write_bloch, write_circuit, write_histogram};
use qlab_demos::circuits::{random_input, teleport_circuit};
use qlab_demos::postprocess::{BlochVector, amplitudes_from_counts};
use qlab_demos::{DemoConfig, init_tracing, print_header, print_info, print_section, spinner};
use qlab_hal::Backend;
use qlab_ir::{DrawOptions, draw_with};

#[derive(Parser, Debug)]
#[command(name = "teleport")]
#[command(author, version, about = "Single-qubit teleportation", long_about = None)]
struct Args {
    /// Number of shots (defaults to the configured teleport_shots)
    #[arg(short, long)]
    shots: Option<u32>,

    /// Directory for bloch_plot, histogram and circuit_diagram files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the input state and the simulator
    #[arg(long)]
    seed: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DemoConfig::load(args.config.as_deref())?;
    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    let shots = args.shots.unwrap_or(config.teleport_shots);
    let seed = args.seed.or(config.seed);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    print_header("Quantum Teleportation");
    let input = random_input(&mut rng);
    let circuit = teleport_circuit(input)?;
    print_section("Circuit");
    println!("{}", draw_with(&circuit, DrawOptions::default()));

    let mut backend = SimulatorBackend::new();
    if let Some(seed) = seed {
        backend = backend.with_seed(seed);
    }
    let pb = spinner(&format!("Running {shots} shots..."));
    let result = backend.run(&circuit, shots).await;
    pb.finish_and_clear();
    let result = result?;

    let received = result.counts.marginal(&[2]);
    let (alpha, beta) = amplitudes_from_counts(&received, u64::from(shots))?;
    let bloch = BlochVector::from_amplitudes(Complex64::new(alpha, 0.0), Complex64::new(beta, 0.0));

    print_section("Results");
    println!("Qbit 0: |ψ⟩ ({:.4}, {:.4})", input.alpha, input.beta);
    println!("Qbit 2: |ψ⟩ ({alpha:.4}, {beta:.4})");
    println!("Bloch Vector: {bloch}\n");

    let written = [
        write_bloch(&output_dir, &bloch, "Bloch Vector Plot")?,
        write_histogram(&output_dir, &result.counts, "Histogram Plot")?,
        write_circuit(&output_dir, "circuit_diagram", &circuit, DrawOptions::default())?,
    ];
    for path in written {
        print_info(&format!("Saved {}", path.display()));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
