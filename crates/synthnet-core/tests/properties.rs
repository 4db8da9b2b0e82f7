use proptest::prelude::*;
use synthnet_core::{quantize_weight, BuildError, ParameterBlob, ParameterMap, RandomSource};

proptest! {
    #[test]
    fn prop_weight_stays_in_stored_range(
        seed in any::<u64>(),
        base in -5.0f64..5.0,
        range in 0.0f64..5.0,
        gaussian in any::<bool>()
    ) {
        let mut rng = RandomSource::seeded(seed);
        let w = rng.synthesize_weight(base, range, gaussian);
        prop_assert!((-127..=127).contains(&w));
    }

    #[test]
    fn prop_zero_range_is_deterministic(
        seed in any::<u64>(),
        base in -1.0f64..1.0,
        gaussian in any::<bool>(),
    ) {
        let mut rng = RandomSource::seeded(seed);
        prop_assert_eq!(rng.synthesize_weight(base, 0.0, gaussian), quantize_weight(base));
        prop_assert_eq!(quantize_weight(base), (base * 127.0).round() as i8);
    }

    #[test]
    fn prop_delay_within_bounds(seed in any::<u64>(), min in 0u32..=255, span in 0u32..=255) {
        let mut rng = RandomSource::seeded(seed);
        let max = (min + span).min(255);
        let d = rng.sample_delay(min, max).unwrap();
        prop_assert!(u32::from(d) >= min && u32::from(d) <= max);
        prop_assert_eq!(rng.sample_delay(min, min).unwrap(), min as u8);
    }

    #[test]
    fn prop_inverted_delay_bounds_fail(seed in any::<u64>(), max in 0u32..255, gap in 1u32..10) {
        let mut rng = RandomSource::seeded(seed);
        let result = rng.sample_delay(max + gap, max);
        let is_invalid_delay = matches!(result, Err(BuildError::InvalidDelay { .. }));
        prop_assert!(is_invalid_delay);
    }

    #[test]
    fn prop_blob_decodes_what_it_encodes(
        entries in proptest::collection::btree_map("[A-Za-z <>&\"']{1,16}", -1.0e6f64..1.0e6, 0..8),
        min_delay in 0u32..=255,
        max_delay in 0u32..=255
    ) {
        let blob = ParameterBlob {
            parameters: entries.into_iter().collect::<ParameterMap>(),
            min_delay,
            max_delay,
        };
        let decoded = ParameterBlob::decode(&blob.encode()).unwrap();
        prop_assert_eq!(decoded, blob);
    }
}
