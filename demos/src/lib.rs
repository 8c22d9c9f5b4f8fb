//! QLab Demo Suite
//!
//! Library code shared by the three demo programs:
//!
//! - **`qrng`**: a quantum random number generator that runs on the least busy
//!   IBM Quantum device and falls back to a noisy local simulator
//! - **`qft`**: the quantum Fourier transform of a basis state, reported as a
//!   final statevector
//! - **`teleport`**: single-qubit teleportation, checked by re-estimating the
//!   teleported amplitudes from shot counts
//!
//! The binaries stay thin: prompting lives in [`prompt`], circuit builders in
//! [`circuits`], result transforms in [`postprocess`], the backend fallback
//! chain in [`qrng`], and output files in [`artifacts`].
//!
//! ```ignore
//! use qlab_demos::qrng::{QrngRequest, SimulatorSettings, generate, NoopObserver};
//!
//! let request = QrngRequest::new(8, 4096);
//! let execution = generate(&request, None, &SimulatorSettings::default(), &mut NoopObserver).await?;
//! println!("{:?}", execution.counts());
//! ```

pub mod artifacts;
pub mod circuits;
pub mod config;
pub mod error;
pub mod postprocess;
pub mod prompt;
pub mod qrng;

pub use config::DemoConfig;
pub use error::{DemoError, DemoResult};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Install the `tracing` subscriber for a demo binary.
///
/// `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second install (tests calling into binaries' setup) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Spinner shown while a remote job is pending.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

/// Print a demo header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", style("═".repeat(60)).cyan());
    println!("{}", style(format!("  {title}")).cyan().bold());
    println!("{}", style("═".repeat(60)).cyan());
    println!();
}

/// Print a demo section.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("▶ {title}")).green().bold());
    println!("{}", style("─".repeat(40)).dim());
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}
