//! Property tests for pass invariants

use printfix_gcode::processors::thermal_bonding::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use printfix_gcode::{bounded_temperature, BedModel, Preprocessor};
use printfix_settings::PreprocessorSettings;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_bounded_temperature_in_range(temperature in -1000.0f64..1000.0) {
        let bounded = bounded_temperature(temperature);
        prop_assert!((MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&bounded));
    }

    #[test]
    fn prop_bounded_temperature_idempotent(temperature in any::<f64>()) {
        let bounded = bounded_temperature(temperature);
        prop_assert_eq!(bounded_temperature(f64::from(bounded)), bounded);
    }

    #[test]
    fn prop_flat_bed_adds_only_offset(
        x in -50.0f64..160.0,
        y in -50.0f64..160.0,
        offset in -2.0f64..2.0,
    ) {
        let mut settings = PreprocessorSettings::default();
        settings.bed_height_offset = offset;
        let bed = BedModel::from_settings(&settings).unwrap();
        prop_assert!((bed.height_adjustment(x, y) - offset).abs() < 1e-9);
    }

    #[test]
    fn prop_backlash_memory_ignores_zero_moves(x in 1.0f64..100.0, y in 1.0f64..100.0) {
        let mut settings = PreprocessorSettings::default();
        settings.use_preparation_preprocessor = false;
        settings.use_thermal_bonding_preprocessor = false;
        settings.use_bed_compensation_preprocessor = false;
        settings.use_feed_rate_conversion_preprocessor = false;
        let mut preprocessor = Preprocessor::with_settings(settings);

        let first = format!("G1 X{:.3} Y{:.3}", x, y);
        preprocessor.process_line(&first, false).unwrap();
        // Same position again, then Z only: no reversal either way
        let out = preprocessor.process_line(&first, false).unwrap();
        prop_assert_eq!(out.len(), 1);
        let out = preprocessor.process_line("G1 Z1", false).unwrap();
        prop_assert_eq!(out.len(), 1);
        let further = format!("G1 X{:.3} Y{:.3}", x + 1.0, y + 1.0);
        let out = preprocessor.process_line(&further, false).unwrap();
        prop_assert_eq!(out.len(), 1);
    }
}
