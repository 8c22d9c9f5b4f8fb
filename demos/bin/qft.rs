//! Quantum Fourier Transform Demo
//!
//! Prepares the basis state of a number, applies the QFT and prints the
//! simulated final statevector.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use console::style;

use qlab_adapter_sim::SimulatorBackend;
use qlab_demos::artifacts::write_circuit;
use qlab_demos::circuits::qft_circuit;
use qlab_demos::postprocess::format_statevector;
use qlab_demos::prompt::Prompter;
use qlab_demos::{DemoConfig, init_tracing, print_header, print_info};
use qlab_hal::Backend;
use qlab_ir::DrawOptions;

#[derive(Parser, Debug)]
#[command(name = "qft")]
#[command(author, version, about = "Quantum Fourier transform of a basis state", long_about = None)]
struct Args {
    /// Number to transform (asked interactively when omitted)
    #[arg(short, long)]
    number: Option<u64>,

    /// Directory for quantum_circuit.txt/.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DemoConfig::load(args.config.as_deref())?;
    let output_dir = args.output_dir.unwrap_or(config.output_dir);

    print_header("Quantum Fourier Transform");
    let number = match args.number {
        Some(n) => n,
        None => Prompter::stdio().qft_number()?,
    };
    println!("You entered: {number}");

    let (circuit, width) = qft_circuit(number)?;
    tracing::info!(width, depth = circuit.depth(), "built QFT circuit");

    let path = write_circuit(&output_dir, "quantum_circuit", &circuit, DrawOptions::default())?;
    print_info(&format!("Circuit diagram written to {}", path.display()));

    let backend = SimulatorBackend::new();
    let result = backend.run(&circuit, 1).await?;
    let amplitudes = match result.statevector {
        Some(amplitudes) => amplitudes,
        // Surfaces the reason the snapshot was skipped.
        None => backend.statevector(&circuit)?,
    };
    println!("{}", format_statevector(&amplitudes));
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
