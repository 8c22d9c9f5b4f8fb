//! Property tests for outcome selection and radix conversion.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use qlab_demos::postprocess::{
    Enhancement, RadixReport, select_outcome, to_decimal, to_hex, to_octal,
};
use qlab_hal::Counts;

fn counts_strategy(bits: usize) -> impl Strategy<Value = Counts> {
    prop::collection::vec((prop::collection::vec(any::<bool>(), bits), 1u64..500), 1..20).prop_map(
        |rows| {
            let mut counts = Counts::new();
            for (outcome, n) in rows {
                let key: String = outcome.iter().map(|&b| if b { '1' } else { '0' }).collect();
                counts.insert(key, n);
            }
            counts
        },
    )
}

proptest! {
    #[test]
    fn radixes_agree(value in any::<u128>()) {
        prop_assert_eq!(to_decimal(&format!("{value:b}")).unwrap(), value);
        prop_assert_eq!(u128::from_str_radix(&to_hex(value), 16).unwrap(), value);
        prop_assert_eq!(u128::from_str_radix(&to_octal(value), 8).unwrap(), value);
    }

    #[test]
    fn padded_bitstrings_keep_their_value(value in any::<u64>(), pad in 0usize..64) {
        let bits = format!("{}{value:b}", "0".repeat(pad));
        let report = RadixReport::from_binary(&bits).unwrap();
        prop_assert_eq!(report.decimal, u128::from(value));
        prop_assert_eq!(report.binary, bits);
    }

    #[test]
    fn nth_selection_follows_observation_order(counts in counts_strategy(6), n in 1u128..40) {
        let mut rng = StdRng::seed_from_u64(0);
        let selection = select_outcome(&counts, Enhancement::NthCount(n), 6, &mut rng).unwrap();
        match counts.nth(n as usize - 1) {
            Some((outcome, _)) => {
                prop_assert_eq!(selection.bitstring, outcome);
                prop_assert!(selection.note.is_none());
            }
            None => {
                let (least, _) = counts.least_frequent().unwrap();
                prop_assert_eq!(selection.bitstring, least);
                prop_assert!(selection.note.is_some());
            }
        }
    }

    #[test]
    fn xor_selection_mixes_an_observed_outcome(
        counts in counts_strategy(8),
        value in 0u128..256,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let selection = select_outcome(&counts, Enhancement::Xor(value), 8, &mut rng).unwrap();
        prop_assert!(counts.get(&selection.source) > 0);
        prop_assert_eq!(selection.bitstring.len(), 8);
        prop_assert_eq!(
            to_decimal(&selection.bitstring).unwrap(),
            to_decimal(&selection.source).unwrap() ^ value
        );
    }

    #[test]
    fn plain_selection_is_an_observed_outcome(counts in counts_strategy(4), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let selection = select_outcome(&counts, Enhancement::None, 4, &mut rng).unwrap();
        prop_assert!(counts.get(&selection.bitstring) > 0);
        prop_assert_eq!(selection.source, selection.bitstring);
    }
}
