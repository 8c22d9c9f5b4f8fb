//! Property tests for circuit construction.

use proptest::prelude::*;
use qlab_ir::{Circuit, ClbitId, QubitId};

#[derive(Debug, Clone)]
enum Op {
    H(u32),
    Cx(u32, u32),
    Measure(u32),
    Barrier,
}

fn op_strategy(n: u32) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..n).prop_map(Op::H),
        (0..n, 0..n).prop_map(|(a, b)| Op::Cx(a, b)),
        (0..n).prop_map(Op::Measure),
        Just(Op::Barrier),
    ]
}

proptest! {
    #[test]
    fn depth_never_exceeds_size(ops in prop::collection::vec(op_strategy(4), 0..40)) {
        let mut circuit = Circuit::with_size("prop", 4, 4);
        for op in &ops {
            // invalid operands (cx on one qubit) are rejected and leave the circuit unchanged
            let _ = match *op {
                Op::H(q) => circuit.h(QubitId(q)).map(|_| ()),
                Op::Cx(a, b) => circuit.cx(QubitId(a), QubitId(b)).map(|_| ()),
                Op::Measure(q) => circuit.measure(QubitId(q), ClbitId(q)).map(|_| ()),
                Op::Barrier => circuit.barrier_all().map(|_| ()),
            };
        }
        prop_assert!(circuit.depth() <= circuit.size());
        prop_assert!(circuit.instructions().len() <= ops.len());
    }

    #[test]
    fn drawing_has_one_line_per_wire(n in 1u32..6) {
        let mut circuit = Circuit::with_size("prop", n, 0);
        for q in 0..n {
            circuit.h(QubitId(q)).unwrap();
        }
        circuit.measure_all().unwrap();
        let text = qlab_ir::draw::draw(&circuit);
        prop_assert_eq!(text.lines().count(), 2 * n as usize);
    }
}
