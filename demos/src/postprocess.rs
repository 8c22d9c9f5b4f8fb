//! Stateless transforms applied to measurement results.

use std::fmt;

use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;

use qlab_hal::Counts;

use crate::error::{DemoError, DemoResult};

/// Number of outcomes of a `bit_length`-bit register, as decimal text.
pub fn outcome_space(bit_length: u32) -> String {
    match 1u128.checked_shl(bit_length) {
        Some(n) => n.to_string(),
        None if bit_length == 128 => "340282366920938463463374607431768211456".to_string(),
        None => format!("2^{bit_length}"),
    }
}

/// Value of a bitstring. Whitespace between register groups is ignored.
pub fn to_decimal(bitstring: &str) -> DemoResult<u128> {
    let digits: String = bitstring.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() {
        return Err(DemoError::InvalidValue("empty bitstring".into()));
    }
    if digits.len() > 128 {
        return Err(DemoError::InvalidValue(format!(
            "bitstring of {} bits does not fit in 128 bits",
            digits.len()
        )));
    }
    u128::from_str_radix(&digits, 2)
        .map_err(|_| DemoError::InvalidValue(format!("not a bitstring: {bitstring}")))
}

/// Lowercase hexadecimal without prefix.
pub fn to_hex(value: u128) -> String {
    format!("{value:x}")
}

/// Octal without prefix.
pub fn to_octal(value: u128) -> String {
    format!("{value:o}")
}

/// A random number in the four radixes the generator reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadixReport {
    pub binary: String,
    pub decimal: u128,
    pub hexadecimal: String,
    pub octal: String,
}

impl RadixReport {
    /// Convert a bitstring.
    pub fn from_binary(bitstring: &str) -> DemoResult<Self> {
        let decimal = to_decimal(bitstring)?;
        Ok(Self {
            binary: bitstring.to_string(),
            decimal,
            hexadecimal: to_hex(decimal),
            octal: to_octal(decimal),
        })
    }
}

impl fmt::Display for RadixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Binary:       {}", self.binary)?;
        writeln!(f, "Decimal:      {}", self.decimal)?;
        writeln!(f, "Hexadecimal:  {}", self.hexadecimal)?;
        write!(f, "Octal:        {}", self.octal)
    }
}

/// Post-selection applied to the generator's counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Enhancement {
    /// 1-based index into the outcomes in observation order.
    NthCount(u128),
    /// XOR a random outcome with this value.
    Xor(u128),
    /// A random outcome as is.
    None,
}

impl Enhancement {
    /// Name printed after the menu.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NthCount(_) => "nth_count",
            Self::Xor(_) => "xor",
            Self::None => "None",
        }
    }
}

/// Outcome chosen from the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Observed outcome the result came from.
    pub source: String,
    /// Final bitstring after the enhancement.
    pub bitstring: String,
    /// Message to show the user, if the request had to be adjusted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Pick the reported random number from `counts`.
///
/// An out-of-range `NthCount` falls back to the least populated outcome. XOR
/// results are written in binary, zero-padded to `bit_length`; an operand
/// wider than the register widens the result.
pub fn select_outcome<R: Rng + ?Sized>(
    counts: &Counts,
    enhancement: Enhancement,
    bit_length: u32,
    rng: &mut R,
) -> DemoResult<Selection> {
    if counts.is_empty() {
        return Err(DemoError::InvalidValue("no outcomes to select from".into()));
    }

    let random_outcome = |rng: &mut R| -> String {
        let index = rng.gen_range(0..counts.len());
        counts.nth(index).map(|(k, _)| k.to_string()).unwrap_or_default()
    };

    let selection = match enhancement {
        Enhancement::NthCount(n) => {
            let len = counts.len();
            let in_range = usize::try_from(n)
                .ok()
                .filter(|&n| n >= 1)
                .and_then(|n| counts.nth(n - 1));
            match in_range {
                Some((outcome, _)) => Selection {
                    source: outcome.to_string(),
                    bitstring: outcome.to_string(),
                    note: None,
                },
                None => {
                    let outcome = counts
                        .least_frequent()
                        .map(|(k, _)| k.to_string())
                        .unwrap_or_default();
                    Selection {
                        source: outcome.clone(),
                        bitstring: outcome,
                        note: Some(format!(
                            "n-th count {n} is out of range (max counts: {len}). Selecting the least populated outcome."
                        )),
                    }
                }
            }
        }
        Enhancement::Xor(value) => {
            let source = random_outcome(rng);
            let mixed = to_decimal(&source)? ^ value;
            Selection {
                bitstring: format!("{mixed:0width$b}", width = bit_length as usize),
                source,
                note: None,
            }
        }
        Enhancement::None => {
            let source = random_outcome(rng);
            Selection {
                bitstring: source.clone(),
                source,
                note: None,
            }
        }
    };
    Ok(selection)
}

/// Single-qubit amplitudes estimated from single-bit counts:
/// `α = sqrt(n0/shots)`, `β = sqrt(n1/shots)`.
pub fn amplitudes_from_counts(counts: &Counts, shots: u64) -> DemoResult<(f64, f64)> {
    if shots == 0 {
        return Err(DemoError::InvalidValue("shots must be greater than 0".into()));
    }
    let alpha = (counts.get("0") as f64 / shots as f64).sqrt();
    let beta = (counts.get("1") as f64 / shots as f64).sqrt();
    Ok((alpha, beta))
}

/// Cartesian point on the Bloch sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlochVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BlochVector {
    /// Bloch vector of `α|0⟩ + β|1⟩`.
    pub fn from_amplitudes(alpha: Complex64, beta: Complex64) -> Self {
        let cross = beta * alpha.conj();
        Self {
            x: 2.0 * cross.re,
            y: 2.0 * cross.im,
            z: alpha.norm_sqr() - beta.norm_sqr(),
        }
    }

    /// Euclidean length; 1 for pure states.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl fmt::Display for BlochVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// Render a statevector with one amplitude per basis state.
pub fn format_statevector(amplitudes: &[Complex64]) -> String {
    let entries: Vec<String> = amplitudes
        .iter()
        .map(|a| format!("{:.8}{:+.8}j", a.re, a.im))
        .collect();

    let num_qubits = amplitudes.len().max(1).trailing_zeros() as usize;
    let dims = vec!["2"; num_qubits].join(", ");
    let dims = if num_qubits == 1 { format!("{dims},") } else { dims };

    format!(
        "Statevector([{}],\n            dims=({dims}))",
        entries.join(",\n             ")
    )
}
