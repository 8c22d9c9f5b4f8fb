//! Shot execution.
//!
//! A circuit is split into independent blocks: qubits joined by a multi-qubit
//! gate, or by touching the same classical bit, share a block. Each block is
//! simulated on its own statevector, so a wide circuit of unentangled qubits
//! stays cheap.
//!
//! Blocks without noise, resets or conditionals whose gates all precede their
//! measurements are evolved once and then sampled. Every other block is
//! re-run per shot, collapsing on measurement and drawing noise trajectories.

use num_complex::Complex64;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use tracing::debug;

use qlab_hal::{Counts, HalError, HalResult};
use qlab_ir::{Circuit, Instruction, InstructionKind, NoiseProfile};

use crate::statevector::Statevector;

/// Disjoint-set over qubit indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Qubits simulated together plus the instructions acting on them.
#[derive(Debug)]
struct Block {
    /// Global qubit index → local statevector index.
    local: FxHashMap<usize, usize>,
    instructions: Vec<Instruction>,
    is_static: bool,
}

impl Block {
    fn width(&self) -> usize {
        self.local.len()
    }

    fn locals(&self, instruction: &Instruction) -> Vec<usize> {
        instruction
            .qubits
            .iter()
            .map(|q| self.local[&q.index()])
            .collect()
    }
}

/// A block ready to run: either a sampled final state or a per-shot program.
enum Prepared<'a> {
    Sampled {
        state: Statevector,
        /// (local qubit, clbit) pairs.
        measures: Vec<(usize, usize)>,
    },
    PerShot(&'a Block),
}

/// A circuit split into independently simulated blocks.
#[derive(Debug)]
pub struct ExecutionPlan {
    num_clbits: usize,
    blocks: Vec<Block>,
}

impl ExecutionPlan {
    /// Partition `circuit` into blocks of at most `max_block_qubits` qubits.
    pub fn new(circuit: &Circuit, noisy: bool, max_block_qubits: usize) -> HalResult<Self> {
        let num_qubits = circuit.num_qubits();
        let instructions = split_per_qubit(circuit.instructions());
        let mut sets = UnionFind::new(num_qubits);
        let mut clbit_owner: FxHashMap<usize, usize> = FxHashMap::default();

        for inst in &instructions {
            let first = inst.qubits[0].index();
            for q in &inst.qubits[1..] {
                sets.union(first, q.index());
            }
            let touched = inst
                .clbits
                .iter()
                .copied()
                .chain(inst.condition().map(|c| c.clbit));
            for clbit in touched {
                let owner = *clbit_owner.entry(clbit.index()).or_insert(first);
                sets.union(owner, first);
            }
        }

        let mut roots: Vec<usize> = vec![];
        let mut blocks: Vec<Block> = vec![];
        for inst in instructions {
            let root = sets.find(inst.qubits[0].index());
            let slot = match roots.iter().position(|r| *r == root) {
                Some(slot) => slot,
                None => {
                    roots.push(root);
                    blocks.push(Block {
                        local: FxHashMap::default(),
                        instructions: vec![],
                        is_static: false,
                    });
                    blocks.len() - 1
                }
            };
            blocks[slot].instructions.push(inst);
        }

        for (block, root) in blocks.iter_mut().zip(&roots) {
            let mut members: Vec<usize> = (0..num_qubits).filter(|&q| sets.find(q) == *root).collect();
            members.sort_unstable();
            block.local = members.iter().enumerate().map(|(l, &g)| (g, l)).collect();
            block.is_static = !noisy && is_static(&block.instructions);
            if block.width() > max_block_qubits {
                return Err(HalError::CircuitTooLarge(format!(
                    "{} entangled qubits exceed the simulator limit of {max_block_qubits}",
                    block.width()
                )));
            }
        }

        debug!(
            blocks = blocks.len(),
            widest = blocks.iter().map(Block::width).max().unwrap_or(0),
            "planned simulation"
        );

        Ok(Self {
            num_clbits: circuit.num_clbits(),
            blocks,
        })
    }

    /// Number of independent blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Widest block, in qubits.
    pub fn widest_block(&self) -> usize {
        self.blocks.iter().map(Block::width).max().unwrap_or(0)
    }

    /// Run `shots` shots and count the classical register outcomes.
    ///
    /// A circuit without classical bits produces empty counts.
    pub fn run<R: Rng + ?Sized>(
        &self,
        shots: u32,
        noise: Option<&NoiseProfile>,
        rng: &mut R,
    ) -> Counts {
        let mut counts = Counts::new();
        if self.num_clbits == 0 {
            return counts;
        }

        let prepared: Vec<Prepared<'_>> = self.blocks.iter().map(prepare).collect();
        let mut clbits = vec![false; self.num_clbits];

        for _ in 0..shots {
            clbits.fill(false);
            for block in &prepared {
                match block {
                    Prepared::Sampled { state, measures } => {
                        if measures.is_empty() {
                            continue;
                        }
                        let outcome = state.sample(rng);
                        for &(local, clbit) in measures {
                            clbits[clbit] = outcome >> local & 1 == 1;
                        }
                    }
                    Prepared::PerShot(block) => {
                        run_shot(block, noise, &mut clbits, rng);
                    }
                }
            }
            counts.record(bitstring(&clbits));
        }
        counts
    }
}

/// Drop barriers and give every measurement, reset and initialisation a
/// single qubit, so only gates can join qubits into one block.
fn split_per_qubit(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(instructions.len());
    for inst in instructions {
        match &inst.kind {
            InstructionKind::Barrier => {}
            InstructionKind::Gate(_) if !inst.qubits.is_empty() => out.push(inst.clone()),
            InstructionKind::Gate(_) => {}
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    out.push(Instruction::measure(*q, *c));
                }
            }
            InstructionKind::Reset | InstructionKind::Initialize { .. } => {
                for q in &inst.qubits {
                    out.push(Instruction {
                        kind: inst.kind.clone(),
                        qubits: vec![*q],
                        clbits: vec![],
                    });
                }
            }
        }
    }
    out
}

/// Gates precede all measurements and nothing depends on outcomes.
fn is_static(instructions: &[Instruction]) -> bool {
    let mut measured = false;
    for inst in instructions {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                if measured || gate.condition.is_some() {
                    return false;
                }
            }
            InstructionKind::Measure => measured = true,
            InstructionKind::Barrier => {}
            InstructionKind::Reset | InstructionKind::Initialize { .. } => return false,
        }
    }
    true
}

fn prepare(block: &Block) -> Prepared<'_> {
    if !block.is_static {
        return Prepared::PerShot(block);
    }
    let mut state = Statevector::new(block.width());
    let mut measures = vec![];
    for inst in &block.instructions {
        match &inst.kind {
            InstructionKind::Gate(gate) => state.apply_gate(&gate.standard, &block.locals(inst)),
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    measures.push((block.local[&q.index()], c.index()));
                }
            }
            _ => {}
        }
    }
    Prepared::Sampled { state, measures }
}

fn relax_all<R: Rng + ?Sized>(
    state: &mut Statevector,
    block: &Block,
    inst: &Instruction,
    noise: Option<&NoiseProfile>,
    rng: &mut R,
) {
    let Some(noise) = noise else { return };
    for q in &inst.qubits {
        if let Some(channel) = noise.relaxation(q.index(), inst) {
            state.relax(block.local[&q.index()], &channel, rng);
        }
    }
}

fn run_shot<R: Rng + ?Sized>(
    block: &Block,
    noise: Option<&NoiseProfile>,
    clbits: &mut [bool],
    rng: &mut R,
) {
    let mut state = Statevector::new(block.width());
    for inst in &block.instructions {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                if let Some(cond) = &gate.condition {
                    if clbits[cond.clbit.index()] != cond.value {
                        continue;
                    }
                }
                state.apply_gate(&gate.standard, &block.locals(inst));
                relax_all(&mut state, block, inst, noise, rng);
            }
            InstructionKind::Measure => {
                relax_all(&mut state, block, inst, noise, rng);
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    clbits[c.index()] = state.measure(block.local[&q.index()], rng);
                }
            }
            InstructionKind::Reset => {
                for q in &inst.qubits {
                    state.reset(block.local[&q.index()], rng);
                }
                relax_all(&mut state, block, inst, noise, rng);
            }
            InstructionKind::Initialize { amplitudes } => {
                for q in &inst.qubits {
                    state.initialize(block.local[&q.index()], *amplitudes, rng);
                }
                relax_all(&mut state, block, inst, noise, rng);
            }
            InstructionKind::Barrier => {}
        }
    }
}

/// Classical register as a bitstring, highest clbit first.
pub fn bitstring(clbits: &[bool]) -> String {
    clbits
        .iter()
        .rev()
        .map(|&b| if b { '1' } else { '0' })
        .collect()
}

/// Final state of a measurement-free circuit over all of its qubits.
///
/// Amplitudes are little-endian: qubit 0 is the lowest bit of the index.
pub fn final_statevector(circuit: &Circuit, max_qubits: usize) -> HalResult<Vec<Complex64>> {
    if circuit.num_qubits() > max_qubits {
        return Err(HalError::CircuitTooLarge(format!(
            "statevector of {} qubits exceeds the simulator limit of {max_qubits}",
            circuit.num_qubits()
        )));
    }
    // Initialize only ever resets a qubit that is still |0⟩ here, so the
    // generator is never consulted for a random outcome.
    let mut rng = StdRng::seed_from_u64(0);
    let mut state = Statevector::new(circuit.num_qubits());
    for inst in circuit.instructions() {
        let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
        match &inst.kind {
            InstructionKind::Gate(gate) if gate.condition.is_none() => {
                state.apply_gate(&gate.standard, &qubits);
            }
            InstructionKind::Initialize { amplitudes } => {
                for &q in &qubits {
                    if state.probability_one(q) > 0.0 {
                        return Err(HalError::Unsupported(
                            "initialize on a qubit that is not in |0>".into(),
                        ));
                    }
                    state.initialize(q, *amplitudes, &mut rng);
                }
            }
            InstructionKind::Barrier => {}
            _ => {
                return Err(HalError::Unsupported(format!(
                    "statevector snapshot of a circuit containing '{}'",
                    inst.name()
                )));
            }
        }
    }
    Ok(state.into_amplitudes())
}
