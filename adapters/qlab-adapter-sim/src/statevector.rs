//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use qlab_ir::{StandardGate, ThermalRelaxation};

/// 2x2 unitary in row-major order.
type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A statevector representing a quantum state.
///
/// Basis index bit `k` is the state of local qubit `k` (little-endian).
#[derive(Debug, Clone)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = ONE;
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitudes in little-endian basis order.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume into the amplitude vector.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply a standard gate to local qubit indices.
    pub fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match *gate {
            StandardGate::I => {}
            StandardGate::X => self.apply_1q(qubits[0], x_matrix()),
            StandardGate::Y => self.apply_1q(qubits[0], [[ZERO, -I], [I, ZERO]]),
            StandardGate::Z => self.apply_1q(qubits[0], phase_matrix(PI)),
            StandardGate::H => self.apply_1q(qubits[0], h_matrix()),
            StandardGate::S => self.apply_1q(qubits[0], phase_matrix(PI / 2.0)),
            StandardGate::Sdg => self.apply_1q(qubits[0], phase_matrix(-PI / 2.0)),
            StandardGate::T => self.apply_1q(qubits[0], phase_matrix(PI / 4.0)),
            StandardGate::Tdg => self.apply_1q(qubits[0], phase_matrix(-PI / 4.0)),
            StandardGate::SX => {
                let p = Complex64::new(0.5, 0.5);
                let m = Complex64::new(0.5, -0.5);
                self.apply_1q(qubits[0], [[p, m], [m, p]]);
            }
            StandardGate::Rx(theta) => {
                let (c, s) = half_angle(theta);
                let n = Complex64::new(0.0, -s);
                self.apply_1q(qubits[0], [[c.into(), n], [n, c.into()]]);
            }
            StandardGate::Ry(theta) => {
                let (c, s) = half_angle(theta);
                self.apply_1q(qubits[0], [[c.into(), (-s).into()], [s.into(), c.into()]]);
            }
            StandardGate::Rz(theta) => self.apply_1q(
                qubits[0],
                [
                    [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
                    [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
                ],
            ),
            StandardGate::P(lambda) => self.apply_1q(qubits[0], phase_matrix(lambda)),
            StandardGate::U(theta, phi, lambda) => {
                let (c, s) = half_angle(theta);
                self.apply_1q(
                    qubits[0],
                    [
                        [c.into(), -Complex64::from_polar(s, lambda)],
                        [
                            Complex64::from_polar(s, phi),
                            Complex64::from_polar(c, phi + lambda),
                        ],
                    ],
                );
            }
            StandardGate::CX => self.apply_controlled(&qubits[..1], qubits[1], x_matrix()),
            StandardGate::CY => {
                self.apply_controlled(&qubits[..1], qubits[1], [[ZERO, -I], [I, ZERO]]);
            }
            StandardGate::CZ => self.apply_controlled(&qubits[..1], qubits[1], phase_matrix(PI)),
            StandardGate::CH => self.apply_controlled(&qubits[..1], qubits[1], h_matrix()),
            StandardGate::CP(lambda) => {
                self.apply_controlled(&qubits[..1], qubits[1], phase_matrix(lambda));
            }
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::CCX => self.apply_controlled(&qubits[..2], qubits[2], x_matrix()),
        }
    }

    fn apply_1q(&mut self, qubit: usize, matrix: Matrix2) {
        self.apply_controlled(&[], qubit, matrix);
    }

    /// Apply `matrix` to `target` on the subspace where every control is |1⟩.
    fn apply_controlled(&mut self, controls: &[usize], target: usize, matrix: Matrix2) {
        let ctrl_mask = controls.iter().fold(0usize, |m, &c| m | (1 << c));
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & tgt_mask != 0 || i & ctrl_mask != ctrl_mask {
                continue;
            }
            let j = i | tgt_mask;
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = matrix[0][0] * a + matrix[0][1] * b;
            self.amplitudes[j] = matrix[1][0] * a + matrix[1][1] * b;
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if i & mask1 != 0 && i & mask2 == 0 {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    /// Probability that `qubit` reads |1⟩.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure `qubit` in the computational basis and collapse the state.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p1 = self.probability_one(qubit);
        let outcome = rng.gen_bool(p1.clamp(0.0, 1.0));
        self.project(qubit, outcome);
        outcome
    }

    /// Keep only the branch where `qubit` equals `value`, then renormalize.
    fn project(&mut self, qubit: usize, value: bool) {
        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) != value {
                *amp = ZERO;
            }
        }
        self.renormalize();
    }

    /// Reset `qubit` to |0⟩.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) {
            self.apply_1q(qubit, x_matrix());
        }
    }

    /// Reset `qubit` and prepare `alpha|0⟩ + beta|1⟩` on it.
    pub fn initialize<R: Rng + ?Sized>(&mut self, qubit: usize, state: [Complex64; 2], rng: &mut R) {
        self.reset(qubit, rng);
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let a = self.amplitudes[i];
                self.amplitudes[i] = state[0] * a;
                self.amplitudes[i | mask] = state[1] * a;
            }
        }
    }

    /// Apply one trajectory of a thermal relaxation channel to `qubit`.
    ///
    /// Amplitude damping jumps to |0⟩ with probability `γ·P(1)`; otherwise the
    /// |1⟩ branch is damped by `sqrt(1-γ)`. A phase flip follows with the
    /// channel's dephasing probability.
    pub fn relax<R: Rng + ?Sized>(&mut self, qubit: usize, channel: &ThermalRelaxation, rng: &mut R) {
        if channel.is_identity() {
            return;
        }
        let gamma = channel.damping();
        let mask = 1 << qubit;

        if gamma > 0.0 {
            let p_jump = (gamma * self.probability_one(qubit)).clamp(0.0, 1.0);
            if rng.gen_bool(p_jump) {
                for i in 0..self.amplitudes.len() {
                    if i & mask != 0 {
                        self.amplitudes[i & !mask] = self.amplitudes[i];
                        self.amplitudes[i] = ZERO;
                    }
                }
            } else {
                let keep = (1.0 - gamma).sqrt();
                for (i, amp) in self.amplitudes.iter_mut().enumerate() {
                    if i & mask != 0 {
                        *amp *= keep;
                    }
                }
            }
            self.renormalize();
        }

        let lambda = channel.dephasing();
        if lambda > 0.0 && rng.gen_bool(lambda.clamp(0.0, 1.0)) {
            self.apply_1q(qubit, phase_matrix(PI));
        }
    }

    fn renormalize(&mut self) {
        let norm = self.norm_sqr().sqrt();
        if norm > 0.0 {
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
    }

    /// Total probability mass (1 for a valid state).
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Sample a basis index without collapsing the state.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r: f64 = rng.r#gen();

        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }

        // Rounding can leave the cumulative sum just below 1.
        self.amplitudes
            .iter()
            .rposition(|a| a.norm_sqr() > 0.0)
            .unwrap_or(0)
    }
}

fn half_angle(theta: f64) -> (f64, f64) {
    ((theta / 2.0).cos(), (theta / 2.0).sin())
}

fn x_matrix() -> Matrix2 {
    [[ZERO, ONE], [ONE, ZERO]]
}

fn h_matrix() -> Matrix2 {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    [[h, h], [h, -h]]
}

fn phase_matrix(lambda: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, lambda)]]
}
