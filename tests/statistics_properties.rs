//! Property-based tests for the statistics primitives using proptest

use loadcast::analysis::{
    degree_days, min_max_normalize, pearson_correlation, seasonal_decompose, variance,
};
use loadcast::domain::FeatureVector;
use loadcast::ml::{build_tree, DEFAULT_MAX_DEPTH};
use proptest::prelude::*;

/// Equal-length pairs of bounded series
fn paired_series() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..64).prop_flat_map(|n| {
        (
            prop::collection::vec(-1000.0f64..1000.0, n),
            prop::collection::vec(-1000.0f64..1000.0, n),
        )
    })
}

proptest! {
    #[test]
    fn pearson_stays_in_range((x, y) in paired_series()) {
        let r = pearson_correlation(&x, &y);
        prop_assert!((-1.0..=1.0).contains(&r));
    }

    #[test]
    fn pearson_self_correlation_is_one(x in prop::collection::vec(-1000.0f64..1000.0, 2..64)) {
        prop_assume!(variance(&x) > 1e-6);
        prop_assert!((pearson_correlation(&x, &x) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_mismatched_lengths_is_zero(
        x in prop::collection::vec(-100.0f64..100.0, 1..20),
        extra in 1usize..5,
    ) {
        let y: Vec<f64> =
            x.iter().copied().chain(std::iter::repeat(1.0).take(extra)).collect();
        prop_assert_eq!(pearson_correlation(&x, &y), 0.0);
    }

    #[test]
    fn degree_days_are_exclusive(
        max_temp in -40.0f64..50.0,
        min_temp in -40.0f64..50.0,
        base in 5.0f64..25.0,
    ) {
        let dd = degree_days(max_temp, min_temp, base);
        prop_assert!(dd.hdd >= 0.0);
        prop_assert!(dd.cdd >= 0.0);

        let avg = (max_temp + min_temp) / 2.0;
        if avg == base {
            prop_assert_eq!(dd.hdd, 0.0);
            prop_assert_eq!(dd.cdd, 0.0);
        } else {
            prop_assert!((dd.hdd > 0.0) != (dd.cdd > 0.0));
        }
    }

    #[test]
    fn normalized_values_are_unit_interval(x in prop::collection::vec(-1e4f64..1e4, 0..64)) {
        let scaled = min_max_normalize(&x);
        prop_assert_eq!(scaled.len(), x.len());
        prop_assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn decomposition_is_additive(
        data in prop::collection::vec(0.0f64..5000.0, 0..100),
        period in 0usize..30,
    ) {
        let d = seasonal_decompose(&data, period);
        for i in 0..data.len() {
            prop_assert!((d.trend[i] + d.seasonal[i] + d.residual[i] - data[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_targets_give_single_leaf(
        temps in prop::collection::vec(-20.0f64..40.0, 1..40),
        load in 0.0f64..10_000.0,
    ) {
        let features: Vec<FeatureVector> = temps
            .iter()
            .map(|&t| FeatureVector { temperature: t, ..Default::default() })
            .collect();
        let targets = vec![load; features.len()];
        let tree = build_tree(&features, &targets, DEFAULT_MAX_DEPTH);
        prop_assert!(tree.is_leaf());
        prop_assert_eq!(tree.predict(&features[0]), load);
    }
}
