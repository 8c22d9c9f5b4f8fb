//! Quantum Random Number Generator
//!
//! Samples `n` qubits in uniform superposition on the least busy IBM Quantum
//! device, or on a noisy local simulator when the device is unreachable, and
//! turns one observed outcome into a random number.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand::rngs::StdRng;

use qlab_adapter_sim::SimulatorConfiguration;
use qlab_demos::postprocess::{Enhancement, RadixReport, select_outcome};
use qlab_demos::prompt::{self, EnhancementChoice, Prompter};
use qlab_demos::qrng::{
    FallbackReason, IbmRemote, QrngObserver, QrngRequest, RemoteConnection, RemoteReport,
    SimulatorSettings, generate,
};
use qlab_demos::{DemoConfig, init_tracing, print_success, print_warning, spinner};
use qlab_hal::JobId;
use qlab_ir::{DrawOptions, draw_with};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EnhancementArg {
    /// Use the n-th outcome in observation order
    Nth,
    /// XOR a random outcome with a custom value
    Xor,
    /// Plain random outcome
    None,
}

#[derive(Parser, Debug)]
#[command(name = "qrng")]
#[command(author, version, about = "Quantum random number generator", long_about = None)]
struct Args {
    /// Bit length of the random number (2-128)
    #[arg(short, long)]
    bits: Option<u32>,

    /// Enhancement applied to the measured outcomes
    #[arg(short, long, value_enum)]
    enhancement: Option<EnhancementArg>,

    /// Outcome index for the n-th enhancement (1-based)
    #[arg(long)]
    nth: Option<u128>,

    /// Value for the XOR enhancement
    #[arg(long)]
    xor: Option<u128>,

    /// Skip the quantum device (`--simulator` or `--simulator false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    simulator: Option<bool>,

    /// Write qrng_result.json to this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the simulator and for outcome selection
    #[arg(long)]
    seed: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Prints the remote and simulator progress as it happens.
#[derive(Default)]
struct ConsoleObserver {
    spinner: Option<ProgressBar>,
}

impl ConsoleObserver {
    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

fn print_metadata(title: &str, metadata: &serde_json::Value) {
    println!("{title}");
    if let Some(map) = metadata.as_object() {
        for (key, value) in map {
            println!("   '{key}' : {value},");
        }
    }
}

fn indented(text: impl std::fmt::Display, prefix: &str) -> String {
    text.to_string()
        .lines()
        .map(|l| format!("{prefix}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl QrngObserver for ConsoleObserver {
    fn on_connected(&mut self, c: &RemoteConnection) {
        let b = &c.backend;
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());

        println!("  {}", style("Connected.").green());
        println!("   Account Information:");
        println!("{}\n", indented(&c.account, "  "));
        println!("   Usage Information:");
        println!("{}", indented(&c.usage, "  "));

        println!(" Selecting backend...");
        println!("  Connected to the backend:");
        println!("   Name: {}", style(&b.name).cyan().bold());
        println!("   Version: {}", opt(&b.version));
        println!("   Number of Qubits: {}", b.num_qubits);
        println!("   Simulator: {}", b.simulator);
        println!("   Max Shots: {}", b.max_shots.map_or_else(|| "-".into(), |n| n.to_string()));
        println!("   Max Circuits: {}", b.max_circuits.map_or_else(|| "-".into(), |n| n.to_string()));
        println!("   Basis Gates: {}", b.basis_gates.join(", "));
        println!(
            "   Pending Jobs: {}",
            b.status.pending_jobs.map_or_else(|| "-".into(), |n| n.to_string())
        );
        println!("   Status: {}", opt(&b.status.status_msg));
        println!("   Online Date: {}", opt(&b.online_date));
        println!("   Description: {}", opt(&b.description));
        println!(
            "   Processor Type: {}\n",
            b.processor_type.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        );
    }

    fn on_job_created(&mut self, job_id: &JobId) {
        println!(" Creating job...");
        println!("  Successfully created. Sampler job ID: {}\n", style(job_id).cyan());
        self.spinner = Some(spinner("Waiting for the job to finish..."));
    }

    fn on_remote_result(&mut self, report: &RemoteReport) {
        self.stop_spinner();
        println!(
            "  The result of the submitted job had {} PUB(s).\n",
            report.pub_count
        );
        println!(
            "  The associated PubResult has the following data registers:\n  {}\n",
            report.registers.join(", ")
        );
        print_metadata("  The metadata of the PrimitiveResult is:", &report.job_metadata);
        print_metadata("\n  The metadata of the PubResult result is:", &report.pub_metadata);
    }

    fn on_fallback(&mut self, reason: &FallbackReason) {
        self.stop_spinner();
        match reason {
            FallbackReason::Forced => {}
            FallbackReason::ConnectFailed(_) => {
                print_warning(&reason.to_string());
                println!(" Falling back to the simulator...\n");
            }
            FallbackReason::ExecutionFailed(_) => {
                println!(" {}\n\n Switching to simulator", style(reason).yellow());
            }
        }
    }

    fn on_simulator(&mut self, config: &SimulatorConfiguration) {
        println!("Simulator Configuration Details:");
        println!("{config}");
    }
}

/// Resolve the enhancement from flags, asking for whatever is missing.
fn choose_enhancement<R: std::io::BufRead, W: std::io::Write>(
    args: &Args,
    bits: u32,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Enhancement> {
    let choice = match (args.enhancement, args.nth, args.xor) {
        (Some(EnhancementArg::Nth), _, _) | (None, Some(_), _) => EnhancementChoice::NthCount,
        (Some(EnhancementArg::Xor), _, _) | (None, None, Some(_)) => EnhancementChoice::Xor,
        (Some(EnhancementArg::None), _, _) => EnhancementChoice::None,
        (None, None, None) => prompter.enhancement_choice()?,
    };

    Ok(match choice {
        EnhancementChoice::NthCount => Enhancement::NthCount(match args.nth {
            Some(n) => prompt::parse_nth_index(&n.to_string(), bits)
                .map_err(|e| anyhow!(e.trim().to_string()))?,
            None => prompter.nth_index(bits)?,
        }),
        EnhancementChoice::Xor => Enhancement::Xor(match args.xor {
            Some(v) => prompt::parse_xor_value(&v.to_string())
                .map_err(|e| anyhow!(e.trim().to_string()))?,
            None => prompter.xor_value()?,
        }),
        EnhancementChoice::None => Enhancement::None,
    })
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DemoConfig::load(args.config.as_deref())?;
    let seed = args.seed.or(config.seed);
    let mut prompter = Prompter::stdio();

    println!(
        "\n{}",
        style("Welcome to the Quantum Random Number Generator (QRNG)").cyan().bold()
    );
    println!("Set IBM_API_KEY and IBM_SERVICE_CRN to run on IBM Quantum hardware.");

    let bits = match args.bits {
        Some(bits) => {
            prompt::parse_bit_length(&bits.to_string()).map_err(|e| anyhow!(e.trim().to_string()))?
        }
        None => prompter.bit_length()?,
    };
    let enhancement = choose_enhancement(&args, bits, &mut prompter)?;
    println!(" Selected enhancement: {}", enhancement.label());

    let force_simulator = match args.simulator {
        Some(force) => force,
        None => prompter.force_simulator()?,
    };

    let mut request = QrngRequest::new(bits, config.qrng_shots);
    if force_simulator {
        request = request.simulator_only();
        println!("\n{}", style("-- Enforcing simulator usage -- ").bold());
    } else {
        println!("\n{}", style("-- Attempting to use IBM Quantum Platform -- ").bold());
        println!(" Connecting to the account... ");
    }

    let settings = SimulatorSettings {
        noise: config.noise,
        seed,
    };
    let mut remote = IbmRemote::new(
        config.credentials().await,
        config.session_max_ttl(),
        config.ibm.optimization_level,
    );
    let mut observer = ConsoleObserver::default();

    let execution = generate(&request, Some(&mut remote), &settings, &mut observer)
        .await
        .map_err(|e| anyhow!("Error during RNG generation: {e}"))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let selection = select_outcome(execution.counts(), enhancement, bits, &mut rng)?;
    if let Some(note) = &selection.note {
        println!("   \n{note}");
    }
    let report = RadixReport::from_binary(&selection.bitstring)?;

    println!("\n{}", style("--- Quantum RNG Results ---").green().bold());
    println!("{report}");
    println!("Backend:      {}", execution.backend_name());
    println!("{}\n", execution.circuit_heading());
    println!("{}", draw_with(execution.circuit(), DrawOptions { idle_wires: false }));
    println!();

    if let Some(dir) = &args.output_dir {
        let summary = serde_json::json!({
            "backend": execution.backend_name(),
            "fallback": execution.is_fallback(),
            "enhancement": enhancement,
            "selection": selection,
            "result": report,
            "counts": execution.counts(),
        });
        std::fs::create_dir_all(dir)?;
        let path = dir.join("qrng_result.json");
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("writing {}", path.display()))?;
        print_success(&format!("Result written to {}", path.display()));
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
