//! Text rendering of circuits for terminals and text artifacts.
//!
//! Quantum wires are drawn with `─`, classical wires with `═`. Every
//! instruction lands in the earliest column where all wires it spans are free.

use std::f64::consts::PI;
use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::circuit::Circuit;
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};

const QUANTUM_WIRE: char = '─';
const CLASSICAL_WIRE: char = '═';

/// Drawing options.
#[derive(Debug, Clone, Copy)]
pub struct DrawOptions {
    /// Keep wires that no instruction touches.
    pub idle_wires: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self { idle_wires: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Quantum,
    Classical,
}

struct Row {
    label: String,
    kind: RowKind,
}

/// One column worth of cell contents, keyed by row.
type Column = FxHashMap<usize, String>;

/// Render a circuit with default options.
pub fn draw(circuit: &Circuit) -> String {
    draw_with(circuit, DrawOptions::default())
}

/// Render a circuit.
pub fn draw_with(circuit: &Circuit, options: DrawOptions) -> String {
    let active_qubits = circuit.active_qubits();
    let mut active_clbits = rustc_hash::FxHashSet::default();
    for inst in circuit.instructions() {
        active_clbits.extend(inst.clbits.iter().copied());
        if let Some(cond) = inst.condition() {
            active_clbits.insert(cond.clbit);
        }
    }

    let mut rows = vec![];
    let mut qubit_row = FxHashMap::default();
    for qubit in circuit.qubits() {
        if options.idle_wires || active_qubits.contains(&qubit.id) {
            qubit_row.insert(qubit.id, rows.len());
            let label = match (&qubit.register, qubit.index) {
                (Some(reg), Some(idx)) if register_len(circuit, reg, true) > 1 => {
                    format!("{reg}_{idx}")
                }
                (Some(reg), Some(_)) => reg.clone(),
                _ => format!("q_{}", qubit.id.0),
            };
            rows.push(Row {
                label,
                kind: RowKind::Quantum,
            });
        }
    }
    let mut clbit_row = FxHashMap::default();
    for clbit in circuit.clbits() {
        if options.idle_wires || active_clbits.contains(&clbit.id) {
            clbit_row.insert(clbit.id, rows.len());
            let label = match (&clbit.register, clbit.index) {
                (Some(reg), Some(idx)) => format!("{reg}_{idx}"),
                _ => format!("c_{}", clbit.id.0),
            };
            rows.push(Row {
                label,
                kind: RowKind::Classical,
            });
        }
    }

    if rows.is_empty() {
        return String::new();
    }

    let mut columns: Vec<Column> = vec![];
    let mut row_front: Vec<usize> = vec![0; rows.len()];

    for inst in circuit.instructions() {
        let cells = cells_for(inst, &qubit_row, &clbit_row, &rows);
        let Some((&lo, &hi)) = cells.keys().min().zip(cells.keys().max()) else {
            continue;
        };
        let col = (lo..=hi).map(|r| row_front[r]).max().unwrap_or(0);
        if columns.len() <= col {
            columns.resize_with(col + 1, Column::default);
        }
        columns[col].extend(cells);
        for front in &mut row_front[lo..=hi] {
            *front = col + 1;
        }
    }

    let label_width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
    let mut lines: Vec<String> = rows
        .iter()
        .map(|r| format!("{:>label_width$}: {}", r.label, wire(r.kind)))
        .collect();

    for column in &columns {
        let width = column.values().map(|c| c.chars().count()).max().unwrap_or(1);
        for (r, line) in lines.iter_mut().enumerate() {
            let fill = wire(rows[r].kind);
            let cell = column.get(&r).map(String::as_str).unwrap_or("");
            line.push_str(&center(cell, width, fill));
            line.push(fill);
        }
    }

    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    out
}

fn register_len(circuit: &Circuit, name: &str, quantum: bool) -> usize {
    if quantum {
        circuit
            .qubits()
            .iter()
            .filter(|q| q.register.as_deref() == Some(name))
            .count()
    } else {
        circuit
            .clbits()
            .iter()
            .filter(|c| c.register.as_deref() == Some(name))
            .count()
    }
}

fn wire(kind: RowKind) -> char {
    match kind {
        RowKind::Quantum => QUANTUM_WIRE,
        RowKind::Classical => CLASSICAL_WIRE,
    }
}

/// Cell contents of every row an instruction touches or crosses.
fn cells_for(
    inst: &Instruction,
    qubit_row: &FxHashMap<crate::qubit::QubitId, usize>,
    clbit_row: &FxHashMap<crate::qubit::ClbitId, usize>,
    rows: &[Row],
) -> Column {
    let mut cells = Column::default();
    let q_rows: Vec<usize> = inst
        .qubits
        .iter()
        .filter_map(|q| qubit_row.get(q).copied())
        .collect();

    match &inst.kind {
        InstructionKind::Barrier => {
            for r in q_rows {
                cells.insert(r, "░".into());
            }
            return cells;
        }
        InstructionKind::Reset => {
            for r in q_rows {
                cells.insert(r, "|0>".into());
            }
            return cells;
        }
        InstructionKind::Initialize { amplitudes } => {
            let label = format!(
                "[Initialize({},{})]",
                format_amplitude(amplitudes[0]),
                format_amplitude(amplitudes[1])
            );
            for r in q_rows {
                cells.insert(r, label.clone());
            }
            return cells;
        }
        InstructionKind::Measure => {
            for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                let (Some(&qr), Some(&cr)) = (qubit_row.get(q), clbit_row.get(c)) else {
                    continue;
                };
                cells.insert(qr, "[M]".into());
                cells.insert(cr, "╩".into());
                connect(&mut cells, rows, qr, cr, '╫', '╬');
            }
            return cells;
        }
        InstructionKind::Gate(gate) => {
            let symbols = gate_symbols(&gate.standard);
            for (r, sym) in q_rows.iter().zip(symbols) {
                cells.insert(*r, sym);
            }
            if let (Some(&lo), Some(&hi)) = (q_rows.iter().min(), q_rows.iter().max()) {
                connect(&mut cells, rows, lo, hi, '┼', '╪');
            }
            if let Some(cond) = &gate.condition {
                if let Some(&cr) = clbit_row.get(&cond.clbit) {
                    cells.insert(cr, if cond.value { "■" } else { "o" }.into());
                    if let Some(&anchor) = q_rows.iter().max() {
                        connect(&mut cells, rows, anchor, cr, '╫', '╬');
                    }
                }
            }
        }
    }
    cells
}

/// Fill rows strictly between `a` and `b` with crossing symbols.
fn connect(cells: &mut Column, rows: &[Row], a: usize, b: usize, quantum: char, classical: char) {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    for r in lo + 1..hi {
        cells.entry(r).or_insert_with(|| match rows[r].kind {
            RowKind::Quantum => quantum.to_string(),
            RowKind::Classical => classical.to_string(),
        });
    }
}

/// Symbols for each operand of a gate, in operand order.
fn gate_symbols(gate: &StandardGate) -> Vec<String> {
    let boxed = |s: String| format!("[{s}]");
    match gate {
        StandardGate::CX => vec!["■".into(), "⊕".into()],
        StandardGate::CY => vec!["■".into(), boxed("Y".into())],
        StandardGate::CZ => vec!["■".into(), "■".into()],
        StandardGate::CH => vec!["■".into(), boxed("H".into())],
        StandardGate::CP(l) => vec!["■".into(), format!("■P({})", format_angle(*l))],
        StandardGate::Swap => vec!["X".into(), "X".into()],
        StandardGate::CCX => vec!["■".into(), "■".into(), "⊕".into()],
        single => {
            let name = single.name().to_uppercase();
            let params = single.parameters();
            if params.is_empty() {
                vec![boxed(name)]
            } else {
                let args: Vec<String> = params.into_iter().map(format_angle).collect();
                vec![boxed(format!("{name}({})", args.join(",")))]
            }
        }
    }
}

fn center(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let total = width - len;
    let left = total / 2;
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat_n(fill, left));
    out.push_str(s);
    out.extend(std::iter::repeat_n(fill, total - left));
    out
}

fn format_amplitude(a: num_complex::Complex64) -> String {
    if a.im.abs() < 1e-12 {
        format!("{:.4}", a.re)
    } else {
        format!("{:.4}{:+.4}j", a.re, a.im)
    }
}

/// Render an angle as a fraction of π where that is exact.
pub fn format_angle(angle: f64) -> String {
    if angle == 0.0 {
        return "0".into();
    }
    let ratio = angle / PI;
    for denom in (0..=20).map(|k| 1u64 << k).chain([3, 6, 12]) {
        let numer = ratio * denom as f64;
        if (numer - numer.round()).abs() < 1e-9 {
            let n = numer.round() as i64;
            let sign = if n < 0 { "-" } else { "" };
            let n = n.unsigned_abs();
            let head = if n == 1 { "π".to_string() } else { format!("{n}π") };
            return if denom == 1 {
                format!("{sign}{head}")
            } else {
                format!("{sign}{head}/{denom}")
            };
        }
    }
    format!("{angle:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ClassicalCondition;
    use crate::qubit::{ClbitId, QubitId};

    #[test]
    fn test_format_angle() {
        assert_eq!(format_angle(PI), "π");
        assert_eq!(format_angle(PI / 2.0), "π/2");
        assert_eq!(format_angle(-PI / 4.0), "-π/4");
        assert_eq!(format_angle(3.0 * PI / 8.0), "3π/8");
        assert_eq!(format_angle(PI / 1024.0), "π/1024");
        assert_eq!(format_angle(0.0), "0");
        assert_eq!(format_angle(1.0), "1.0000");
    }

    #[test]
    fn test_draw_bell() {
        let circuit = Circuit::bell().unwrap();
        let text = draw(&circuit);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("q_0: "));
        assert!(lines[0].contains("[H]"));
        assert!(lines[0].contains('■'));
        assert!(lines[1].contains('⊕'));
        assert!(lines[2].starts_with("c_0: "));
        assert!(lines[2].contains('╩'));
        // every row has the same width
        let widths: Vec<_> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_draw_registers_and_condition() {
        let mut circuit = Circuit::new("tp");
        circuit.add_qreg("Qbit 0", 1).unwrap();
        circuit.add_qreg("Entangled Qbit 1", 1).unwrap();
        circuit.add_creg("c_bit", 2).unwrap();
        circuit
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .gate_if(StandardGate::X, [QubitId(1)], ClassicalCondition::is_set(ClbitId(0)))
            .unwrap();

        let text = draw(&circuit);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].trim_start().starts_with("Qbit 0: "));
        assert!(lines[1].starts_with("Entangled Qbit 1: "));
        assert!(lines[2].trim_start().starts_with("c_bit_0: "));
        assert!(lines[1].contains("[X]"));
        assert!(lines[2].contains('■'));
    }

    #[test]
    fn test_idle_wires_hidden() {
        let mut circuit = Circuit::with_size("idle", 3, 0);
        circuit.h(QubitId(1)).unwrap();

        assert_eq!(draw(&circuit).lines().count(), 3);
        let text = draw_with(&circuit, DrawOptions { idle_wires: false });
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("q_1: "));
    }

    #[test]
    fn test_parallel_gates_share_column() {
        let mut circuit = Circuit::with_size("par", 2, 0);
        circuit.h(QubitId(0)).unwrap().h(QubitId(1)).unwrap();
        let text = draw(&circuit);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0].find("[H]"), lines[1].find("[H]"));
    }
}
