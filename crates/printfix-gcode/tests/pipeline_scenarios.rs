//! End-to-end scenarios through the full pass pipeline

use printfix_gcode::{GcodeParser, Preprocessor};
use printfix_settings::PreprocessorSettings;
use tempfile::TempDir;

/// Settings with every pass off except validation
fn bare_settings() -> PreprocessorSettings {
    let mut settings = PreprocessorSettings::default();
    settings.use_preparation_preprocessor = false;
    settings.use_wave_bonding_preprocessor = false;
    settings.use_thermal_bonding_preprocessor = false;
    settings.use_bed_compensation_preprocessor = false;
    settings.use_backlash_compensation_preprocessor = false;
    settings.use_feed_rate_conversion_preprocessor = false;
    settings.use_center_model_preprocessor = false;
    settings
}

fn process_all(preprocessor: &mut Preprocessor, lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| preprocessor.process_line(line, false).unwrap())
        .map(|command| command.to_string())
        .collect()
}

#[test]
fn test_backlash_corrective_move_length_and_speed() {
    let mut settings = bare_settings();
    settings.use_backlash_compensation_preprocessor = true;
    settings.backlash_x = 0.3;
    settings.backlash_speed = 1500.0;
    let mut preprocessor = Preprocessor::with_settings(settings);

    let out = process_all(
        &mut preprocessor,
        &["G1 X10 Y10 F3000", "G1 X20 Y10", "G1 X10 Y10"],
    );
    assert_eq!(out.len(), 4);

    let parser = GcodeParser::new();
    let corrective = parser.parse_line(&out[2]).unwrap();
    assert!(corrective.is_g(0));
    let length = (20.0 - corrective.x().unwrap()).abs();
    assert!((length - 0.3).abs() < 1e-9);
    assert_eq!(corrective.f(), Some(1500.0));

    // The original move resumes at its own feed rate
    let resumed = parser.parse_line(&out[3]).unwrap();
    assert_eq!(resumed.f(), Some(3000.0));
}

#[test]
fn test_backlash_without_reversal_adds_nothing() {
    let mut settings = bare_settings();
    settings.use_backlash_compensation_preprocessor = true;
    let mut preprocessor = Preprocessor::with_settings(settings);

    let out = process_all(
        &mut preprocessor,
        &["G1 X10 Y10", "G1 X20 Y15", "G1 X30 Y15", "G1 X40 Y40"],
    );
    assert_eq!(out, vec!["G1 X10 Y10", "G1 X20 Y15", "G1 X30 Y15", "G1 X40 Y40"]);
}

fn wave_output_for_turn(degrees: f64) -> Vec<String> {
    let mut settings = bare_settings();
    settings.use_wave_bonding_preprocessor = true;
    let mut preprocessor = Preprocessor::with_settings(settings);

    let angle = degrees.to_radians();
    let turn = format!(
        "G1 X{:.4} Y{:.4} E2",
        30.0 + 20.0 * angle.cos(),
        10.0 + 20.0 * angle.sin()
    );
    process_all(
        &mut preprocessor,
        &["G0 X10 Y10 Z0.2", "G1 X30 Y10 E1", turn.as_str()],
    )
}

#[test]
fn test_wave_bonding_tacks_sharp_turn() {
    let out = wave_output_for_turn(170.0);
    let tacks: Vec<&String> = out.iter().filter(|line| line.starts_with("G4")).collect();
    assert_eq!(tacks.len(), 1);
    assert_eq!(tacks[0], "G4 P20");
}

#[test]
fn test_wave_bonding_ignores_gentle_turn() {
    let out = wave_output_for_turn(10.0);
    assert!(out.iter().all(|line| !line.starts_with("G4")));
}

#[test]
fn test_full_pipeline_frames_job() {
    let mut preprocessor = Preprocessor::new();
    let mut out = process_all(&mut preprocessor, &["G1 X10 Y10 Z0.2 F1800", "G1 X20 E1"]);
    out.extend(
        preprocessor
            .process_line("G1 X30 E2", true)
            .unwrap()
            .iter()
            .map(|command| command.to_string()),
    );

    assert_eq!(out.first().map(String::as_str), Some("M106 S255"));
    assert_eq!(out.last().map(String::as_str), Some("M18"));
    // First layer runs hotter
    assert!(out.iter().any(|line| line == "M104 S225"));
    // Feed rates reach the firmware scale
    assert!(out.iter().any(|line| line.contains("F430.00067")));
}

#[test]
fn test_file_mode_matches_line_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("part.gcode");
    let output = dir.path().join("part.out.gcode");
    let lines = ["G90", "G1 X10 Y10 Z0.2 F1200", "G1 X20 Y10 E1", "G1 X10 Y10 E2"];
    std::fs::write(&input, lines.join("\n")).unwrap();

    let mut file_preprocessor = Preprocessor::new();
    file_preprocessor.process_file(&input, &output).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();

    let mut line_preprocessor = Preprocessor::new();
    let mut expected = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let last = index == lines.len() - 1;
        for command in line_preprocessor.process_line(line, last).unwrap() {
            expected.push(command.to_string());
        }
    }

    assert_eq!(written.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn test_malformed_line_forwarded() {
    let mut preprocessor = Preprocessor::with_settings(bare_settings());
    assert_eq!(
        process_all(&mut preprocessor, &["M117 Printing now"]),
        vec!["M117 Printing now"]
    );
}

#[test]
fn test_latin1_comment_in_file_job() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("latin1.gcode");
    let output = dir.path().join("latin1.out.gcode");
    std::fs::write(&input, b"G1 X10 Y10 Z0.2\n; nozzle 215 \xB0C\nG1 X20 Y20 E1\n").unwrap();

    let mut preprocessor = Preprocessor::with_settings(bare_settings());
    assert_eq!(preprocessor.process_file(&input, &output).unwrap(), 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "G1 X10 Y10 Z0.2\nG1 X20 Y20 E1\n"
    );
}

#[test]
fn test_in_place_job_leaves_input_intact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("part.gcode");
    std::fs::write(&path, "G1 X10 Y10 Z0.2\nG1 X20 Y20 E1\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    assert!(preprocessor.process_file(&path, &path).is_err());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "G1 X10 Y10 Z0.2\nG1 X20 Y20 E1\n"
    );
}

#[test]
fn test_consecutive_file_jobs_are_independent() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("part.gcode");
    std::fs::write(&input, "G1 X10 Y10 Z0.2 F1200\nG1 X20 Y20 E1\n").unwrap();

    let mut preprocessor = Preprocessor::new();
    let mut jobs = Vec::new();
    for name in ["first.gcode", "second.gcode"] {
        let output = dir.path().join(name);
        preprocessor.process_file(&input, &output).unwrap();
        jobs.push(std::fs::read_to_string(&output).unwrap());
    }

    let second: Vec<&str> = jobs[1].lines().collect();
    assert_eq!(second.first().copied(), Some("M106 S255"));
    assert_eq!(second.last().copied(), Some("M18"));
    assert!(second.contains(&"G28"));
    assert!(second.iter().any(|line| line.starts_with("M109")));
    // No direction memory carried over from the first job
    assert!(!second.iter().any(|line| line.starts_with("G0 X19.7")));
    assert_eq!(jobs[0], jobs[1]);
}
