//! Print information collection against build volumes

use printfix_gcode::{Preprocessor, PrintInformationCollector};
use printfix_settings::{BuildVolume, PreprocessorSettings};
use tempfile::TempDir;

/// Outline of a 200 x 150 mm part, one layer high
const WIDE_PART: &str = "G90\nG1 X0 Y0 Z0.2 F1200\nG1 X200 Y0 E5\nG1 X200 Y150 E10\nG1 X0 Y150 E15\nG1 X0 Y0 E20\n";

fn settings_with_volume(volume: BuildVolume) -> PreprocessorSettings {
    let mut settings = PreprocessorSettings::default();
    settings.build_volume = volume;
    settings
}

#[test]
fn test_part_larger_than_volume_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.gcode");
    std::fs::write(&path, WIDE_PART).unwrap();

    let settings = settings_with_volume(BuildVolume::uniform(180.0, 140.0, 100.0));
    let information = PrintInformationCollector::collect(&path, &settings).unwrap();

    assert!(!information.printable);
    assert_eq!(information.violations.len(), 2);
    assert_eq!((information.bounds.min_x, information.bounds.max_x), (0.0, 200.0));
    assert_eq!((information.bounds.min_y, information.bounds.max_y), (0.0, 150.0));
}

#[test]
fn test_ignore_flag_accepts_oversized_part() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.gcode");
    std::fs::write(&path, WIDE_PART).unwrap();

    let mut settings = settings_with_volume(BuildVolume::uniform(180.0, 140.0, 100.0));
    settings.ignore_print_dimension_limitations = true;
    let information = PrintInformationCollector::collect(&path, &settings).unwrap();

    assert!(information.printable);
    // Violations are still reported
    assert!(!information.violations.is_empty());
}

#[test]
fn test_part_inside_volume_accepted() {
    let settings = settings_with_volume(BuildVolume::uniform(250.0, 200.0, 100.0));
    let information = PrintInformationCollector::collect_str(WIDE_PART, &settings);
    assert!(information.printable);
    assert!(information.violations.is_empty());
}

#[test]
fn test_empty_and_missing_files() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.gcode");
    std::fs::write(&empty, "").unwrap();

    let mut preprocessor = Preprocessor::new();
    assert!(!preprocessor.collect_print_information(&empty).unwrap());
    assert!(!preprocessor.print_information().unwrap().bounds.valid);

    assert!(preprocessor
        .collect_print_information(dir.path().join("missing.gcode"))
        .is_err());
}

#[test]
fn test_collection_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.gcode");
    std::fs::write(&path, WIDE_PART).unwrap();

    let mut preprocessor =
        Preprocessor::with_settings(settings_with_volume(BuildVolume::uniform(180.0, 140.0, 100.0)));
    let first = preprocessor.collect_print_information(&path).unwrap();
    let first_information = preprocessor.print_information().cloned();
    let second = preprocessor.collect_print_information(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_information.as_ref(), preprocessor.print_information());
}

#[test]
fn test_centering_moves_part_onto_bed() {
    // A 40 x 40 part hanging off the low tier's right edge
    let text = "G1 X90 Y10 Z0.2\nG1 X130 Y10 E1\nG1 X130 Y50 E2\nG1 X90 Y50 E3\n";
    let mut settings = PreprocessorSettings::default();
    assert!(!PrintInformationCollector::collect_str(text, &settings).printable);

    settings.use_center_model_preprocessor = true;
    let information = PrintInformationCollector::collect_str(text, &settings);
    assert!(information.printable);

    let (dx, dy) = information.center_displacement(&settings.build_volume).unwrap();
    assert!((dx - (56.5 - 110.0)).abs() < 1e-9);
    assert!((dy - (53.5 - 30.0)).abs() < 1e-9);
}

#[test]
fn test_latin1_comment_does_not_stop_collection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.gcode");
    let mut bytes = b"; nozzle 215 \xB0C\n".to_vec();
    bytes.extend_from_slice(WIDE_PART.as_bytes());
    std::fs::write(&path, bytes).unwrap();

    let settings = settings_with_volume(BuildVolume::uniform(180.0, 140.0, 100.0));
    let information = PrintInformationCollector::collect(&path, &settings).unwrap();

    assert_eq!((information.bounds.min_x, information.bounds.max_x), (0.0, 200.0));
    assert_eq!((information.bounds.min_y, information.bounds.max_y), (0.0, 150.0));
    assert_eq!(information.violations.len(), 2);
}
