//! Output files written next to the printed report.
//!
//! Each artifact is a text rendering plus a `.json` sibling with the raw
//! numbers.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use qlab_hal::Counts;
use qlab_ir::{Circuit, DrawOptions, Instruction, draw_with};

use crate::error::DemoResult;
use crate::postprocess::BlochVector;

/// Width of the longest histogram bar, in characters.
const HISTOGRAM_WIDTH: usize = 50;
/// Half-size of the Bloch projection grid, in cells.
const BLOCH_RADIUS: i32 = 10;

fn write_pair(dir: &Path, stem: &str, text: &str, json: &impl Serialize) -> DemoResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let text_path = dir.join(format!("{stem}.txt"));
    fs::write(&text_path, text)?;
    fs::write(dir.join(format!("{stem}.json")), serde_json::to_string_pretty(json)?)?;
    info!(path = %text_path.display(), "artifact written");
    Ok(text_path)
}

#[derive(Serialize)]
struct CircuitSummary<'a> {
    name: &'a str,
    num_qubits: usize,
    num_clbits: usize,
    depth: usize,
    ops: Vec<(String, usize)>,
    instructions: &'a [Instruction],
}

/// Write `{stem}.txt` with the circuit drawing and `{stem}.json` with its
/// instructions.
pub fn write_circuit(
    dir: &Path,
    stem: &str,
    circuit: &Circuit,
    options: DrawOptions,
) -> DemoResult<PathBuf> {
    let summary = CircuitSummary {
        name: circuit.name(),
        num_qubits: circuit.num_qubits(),
        num_clbits: circuit.num_clbits(),
        depth: circuit.depth(),
        ops: circuit.count_ops(),
        instructions: circuit.instructions(),
    };
    write_pair(dir, stem, &draw_with(circuit, options), &summary)
}

/// Text bar chart of `counts`, outcomes in ascending bitstring order.
pub fn render_histogram(counts: &Counts, title: &str) -> String {
    let total = counts.total_shots().max(1) as f64;
    let peak = counts.iter().map(|(_, n)| n).max().unwrap_or(0).max(1);
    let mut rows: Vec<(&str, u64)> = counts.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    let label_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    let mut out = format!("{title}\n\n");
    for (outcome, n) in rows {
        let bar = (n as f64 / peak as f64 * HISTOGRAM_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "{outcome:>label_width$} | {} {n} ({:.3})",
            "█".repeat(bar),
            n as f64 / total
        );
    }
    out
}

/// Write `histogram.txt` and `histogram.json`.
pub fn write_histogram(dir: &Path, counts: &Counts, title: &str) -> DemoResult<PathBuf> {
    write_pair(dir, "histogram", &render_histogram(counts, title), counts)
}

/// Bloch vector with its projection onto the x-z plane.
pub fn render_bloch(vector: &BlochVector, title: &str) -> String {
    let r = BLOCH_RADIUS;
    let px = (vector.x * f64::from(r)).round() as i32;
    let pz = (vector.z * f64::from(r)).round() as i32;

    let mut out = format!("{title}\n\nBloch Vector: {vector}\n\nx-z projection (y = {:.4}):\n", vector.y);
    for row in (-r..=r).rev() {
        let mut line = String::new();
        for col in -r..=r {
            let on_circle = {
                let d = f64::from(col * col + row * row).sqrt();
                (d - f64::from(r)).abs() < 0.5
            };
            let c = if col == px && row == pz {
                '*'
            } else if on_circle {
                '·'
            } else if row == 0 && col == 0 {
                '+'
            } else if row == 0 {
                '─'
            } else if col == 0 {
                '│'
            } else {
                ' '
            };
            line.push(c);
            line.push(' ');
        }
        let label = if row == r {
            " |0⟩"
        } else if row == -r {
            " |1⟩"
        } else {
            ""
        };
        let _ = writeln!(out, "{}{label}", line.trim_end());
    }
    out
}

/// Write `bloch_plot.txt` and `bloch_plot.json`.
pub fn write_bloch(dir: &Path, vector: &BlochVector, title: &str) -> DemoResult<PathBuf> {
    write_pair(dir, "bloch_plot", &render_bloch(vector, title), vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_sorted_and_scaled() {
        let counts = Counts::from_pairs([("11", 50), ("00", 100)]);
        let text = render_histogram(&counts, "Histogram Plot");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Histogram Plot");
        assert!(lines[2].starts_with("00 | "));
        assert!(lines[2].contains(&"█".repeat(HISTOGRAM_WIDTH)));
        assert!(lines[2].ends_with("100 (0.667)"));
        assert!(lines[3].starts_with("11 | "));
        assert_eq!(lines[3].matches('█').count(), HISTOGRAM_WIDTH / 2);
    }

    #[test]
    fn test_bloch_marks_north_pole() {
        let v = BlochVector { x: 0.0, y: 0.0, z: 1.0 };
        let text = render_bloch(&v, "Bloch Vector Plot");
        let top = text
            .lines()
            .find(|l| l.ends_with("|0⟩"))
            .unwrap();
        assert!(top.contains('*'));
        assert!(text.contains("Bloch Vector: (0.0000, 0.0000, 1.0000)"));
    }
}
