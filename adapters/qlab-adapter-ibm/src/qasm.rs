//! OpenQASM 3 serialization of circuits for the Sampler service.
//!
//! Qubits are emitted as one flat register `q`. Classical bits keep their
//! registers so the sampler reports data under the same names (a circuit
//! built with `measure_all` yields a `meas` entry); bits without a register
//! go into `c`.

use std::fmt::Write as _;

use qlab_ir::{Circuit, ClbitId, Instruction, InstructionKind, StandardGate};

use crate::error::{IbmError, IbmResult};

/// Register name used for bits that do not belong to a register.
const DEFAULT_CREG: &str = "c";

/// A classical register as declared in the emitted program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicalRegister {
    /// Sanitized register name.
    pub name: String,
    /// Number of bits.
    pub width: usize,
}

/// Where each clbit lives: `(register index, offset)`, indexed by clbit id.
struct ClbitMap {
    registers: Vec<ClassicalRegister>,
    slots: Vec<(usize, usize)>,
}

impl ClbitMap {
    fn new(circuit: &Circuit) -> Self {
        let mut registers: Vec<ClassicalRegister> = vec![];
        let mut slots = Vec::with_capacity(circuit.num_clbits());

        for clbit in circuit.clbits() {
            let name = sanitize(clbit.register.as_deref().unwrap_or(DEFAULT_CREG));
            let reg = match registers.iter().position(|r| r.name == name) {
                Some(i) => i,
                None => {
                    registers.push(ClassicalRegister { name, width: 0 });
                    registers.len() - 1
                }
            };
            slots.push((reg, registers[reg].width));
            registers[reg].width += 1;
        }
        Self { registers, slots }
    }

    fn bit(&self, clbit: ClbitId) -> IbmResult<String> {
        let (reg, offset) = self
            .slots
            .get(clbit.index())
            .copied()
            .ok_or_else(|| IbmError::CircuitError(format!("unknown classical bit {clbit}")))?;
        Ok(format!("{}[{offset}]", self.registers[reg].name))
    }
}

/// Classical registers of a circuit in declaration order.
pub fn classical_registers(circuit: &Circuit) -> Vec<ClassicalRegister> {
    ClbitMap::new(circuit).registers
}

/// Turn a display name such as `"c bit"` into a QASM identifier.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Emit a circuit as OpenQASM 3 source.
pub fn emit(circuit: &Circuit) -> IbmResult<String> {
    let clbits = ClbitMap::new(circuit);
    let mut out = String::new();

    out.push_str("OPENQASM 3.0;\ninclude \"stdgates.inc\";\n\n");
    if circuit.num_qubits() > 0 {
        let _ = writeln!(out, "qubit[{}] q;", circuit.num_qubits());
    }
    for reg in &clbits.registers {
        let _ = writeln!(out, "bit[{}] {};", reg.width, reg.name);
    }
    out.push('\n');

    for instruction in circuit.instructions() {
        emit_instruction(&mut out, instruction, &clbits)?;
    }
    Ok(out)
}

fn qubit_list(instruction: &Instruction) -> String {
    instruction
        .qubits
        .iter()
        .map(|q| format!("q[{}]", q.index()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn angle(value: f64) -> IbmResult<String> {
    if value.is_finite() {
        Ok(format!("{value}"))
    } else {
        Err(IbmError::CircuitError(format!("non-finite angle {value}")))
    }
}

fn gate_call(gate: &StandardGate, qubits: &str) -> IbmResult<String> {
    let name = match gate {
        StandardGate::U(..) => "U",
        other => other.name(),
    };
    let params = gate
        .parameters()
        .into_iter()
        .map(angle)
        .collect::<IbmResult<Vec<_>>>()?;
    if params.is_empty() {
        Ok(format!("{name} {qubits};"))
    } else {
        Ok(format!("{name}({}) {qubits};", params.join(", ")))
    }
}

fn emit_instruction(out: &mut String, instruction: &Instruction, clbits: &ClbitMap) -> IbmResult<()> {
    match &instruction.kind {
        InstructionKind::Gate(gate) => {
            let call = gate_call(&gate.standard, &qubit_list(instruction))?;
            match &gate.condition {
                Some(cond) => {
                    let bit = clbits.bit(cond.clbit)?;
                    let test = if cond.value { bit } else { format!("!{bit}") };
                    let _ = writeln!(out, "if ({test}) {call}");
                }
                None => {
                    let _ = writeln!(out, "{call}");
                }
            }
        }
        InstructionKind::Measure => {
            for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                let _ = writeln!(out, "{} = measure q[{}];", clbits.bit(*c)?, q.index());
            }
        }
        InstructionKind::Reset => {
            for q in &instruction.qubits {
                let _ = writeln!(out, "reset q[{}];", q.index());
            }
        }
        InstructionKind::Barrier => {
            let qubits = qubit_list(instruction);
            if qubits.is_empty() {
                out.push_str("barrier;\n");
            } else {
                let _ = writeln!(out, "barrier {qubits};");
            }
        }
        InstructionKind::Initialize { amplitudes } => {
            // Reset, then rotate |0> onto the target state up to global phase.
            let [alpha, beta] = amplitudes;
            let theta = 2.0 * beta.norm().atan2(alpha.norm());
            let phi = beta.arg() - alpha.arg();
            for q in &instruction.qubits {
                let _ = writeln!(out, "reset q[{}];", q.index());
                let _ = writeln!(
                    out,
                    "U({}, {}, 0) q[{}];",
                    angle(theta)?,
                    angle(phi)?,
                    q.index()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use qlab_ir::{ClassicalCondition, QubitId};

    #[test]
    fn test_emit_measure_all_uses_meas_register() {
        let mut circuit = Circuit::with_size("qrng", 3, 0);
        for i in 0..3 {
            circuit.h(QubitId(i)).unwrap();
        }
        circuit.measure_all().unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.starts_with("OPENQASM 3.0;\ninclude \"stdgates.inc\";"));
        assert!(qasm.contains("qubit[3] q;"));
        assert!(qasm.contains("bit[3] meas;"));
        assert!(qasm.contains("h q[2];"));
        assert!(qasm.contains("barrier q[0], q[1], q[2];"));
        assert!(qasm.contains("meas[2] = measure q[2];"));
        assert_eq!(
            classical_registers(&circuit),
            vec![ClassicalRegister {
                name: "meas".into(),
                width: 3
            }]
        );
    }

    #[test]
    fn test_emit_parameters_and_conditions() {
        let mut circuit = Circuit::with_size("ff", 2, 1);
        circuit.cp(0.5, QubitId(0), QubitId(1)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit
            .gate_if(StandardGate::X, [QubitId(1)], ClassicalCondition::is_set(ClbitId(0)))
            .unwrap();
        circuit
            .gate_if(
                StandardGate::Z,
                [QubitId(1)],
                ClassicalCondition::new(ClbitId(0), false),
            )
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("bit[1] c;"));
        assert!(qasm.contains("cp(0.5) q[0], q[1];"));
        assert!(qasm.contains("c[0] = measure q[0];"));
        assert!(qasm.contains("if (c[0]) x q[1];"));
        assert!(qasm.contains("if (!c[0]) z q[1];"));
    }

    #[test]
    fn test_register_names_are_sanitized() {
        let mut circuit = Circuit::new("regs");
        circuit.add_qreg("Qbit 0", 1).unwrap();
        circuit.add_creg("c bit", 2).unwrap();
        circuit.add_creg("2nd", 1).unwrap();
        circuit.measure(QubitId(0), ClbitId(2)).unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("bit[2] c_bit;"));
        assert!(qasm.contains("bit[1] _2nd;"));
        assert!(qasm.contains("_2nd[0] = measure q[0];"));
    }

    #[test]
    fn test_initialize_becomes_reset_and_rotation() {
        let mut circuit = Circuit::with_size("init", 1, 0);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        circuit
            .initialize(Complex64::new(h, 0.0), Complex64::new(h, 0.0), QubitId(0))
            .unwrap();
        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("reset q[0];"));
        assert!(qasm.contains(&format!("U({}, 0, 0) q[0];", std::f64::consts::FRAC_PI_2)));
    }

    #[test]
    fn test_non_finite_angle_rejected() {
        let mut circuit = Circuit::with_size("bad", 1, 0);
        circuit.rz(f64::NAN, QubitId(0)).unwrap();
        assert!(matches!(emit(&circuit), Err(IbmError::CircuitError(_))));
    }
}
