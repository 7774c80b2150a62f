//! Flat preprocessing interface
//!
//! Plain functions over one process-wide [`Preprocessor`], for hosts that
//! drive the printer one setting and one command at a time. Callers are
//! serialised by a lock. Nothing here returns an error: failures are logged
//! and reported as `false`, an empty string or `0.0`.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use printfix_core::{PlaneEquation, Point3, Vector3};
use printfix_settings::{BuildVolume, PreprocessorSettings};

use crate::collector::PrintInformation;
use crate::preprocessor::Preprocessor;
use crate::processors::{bounded_temperature, create_tack_point as tack_point};

/// Global preprocessor instance
static PREPROCESSOR: Lazy<Mutex<Preprocessor>> = Lazy::new(|| Mutex::new(Preprocessor::new()));

fn update_settings(update: impl FnOnce(&mut PreprocessorSettings)) {
    update(PREPROCESSOR.lock().settings_mut());
}

/// Snapshot of the current settings
pub fn get_settings() -> PreprocessorSettings {
    PREPROCESSOR.lock().settings().clone()
}

pub fn set_backlash_x(value: f64) {
    update_settings(|settings| settings.backlash_x = value);
}

pub fn set_backlash_y(value: f64) {
    update_settings(|settings| settings.backlash_y = value);
}

pub fn set_backlash_speed(value: f64) {
    update_settings(|settings| settings.backlash_speed = value);
}

pub fn set_back_right_orientation(value: f64) {
    update_settings(|settings| settings.back_right_orientation = value);
}

pub fn set_back_left_orientation(value: f64) {
    update_settings(|settings| settings.back_left_orientation = value);
}

pub fn set_front_left_orientation(value: f64) {
    update_settings(|settings| settings.front_left_orientation = value);
}

pub fn set_front_right_orientation(value: f64) {
    update_settings(|settings| settings.front_right_orientation = value);
}

pub fn set_bed_height_offset(value: f64) {
    update_settings(|settings| settings.bed_height_offset = value);
}

pub fn set_back_right_offset(value: f64) {
    update_settings(|settings| settings.back_right_offset = value);
}

pub fn set_back_left_offset(value: f64) {
    update_settings(|settings| settings.back_left_offset = value);
}

pub fn set_front_left_offset(value: f64) {
    update_settings(|settings| settings.front_left_offset = value);
}

pub fn set_front_right_offset(value: f64) {
    update_settings(|settings| settings.front_right_offset = value);
}

/// Nozzle temperature in °C; clamped by the passes that use it
pub fn set_filament_temperature(value: u16) {
    update_settings(|settings| settings.filament_temperature = f64::from(value));
}

/// Set the filament type by name; returns false for unknown names
pub fn set_filament_type(name: &str) -> bool {
    let mut preprocessor = PREPROCESSOR.lock();
    match preprocessor.settings_mut().set_filament_type(name) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to set filament type: {}", e);
            false
        }
    }
}

pub fn set_use_validation_preprocessor(value: bool) {
    update_settings(|settings| settings.use_validation_preprocessor = value);
}

pub fn set_use_preparation_preprocessor(value: bool) {
    update_settings(|settings| settings.use_preparation_preprocessor = value);
}

pub fn set_use_wave_bonding_preprocessor(value: bool) {
    update_settings(|settings| settings.use_wave_bonding_preprocessor = value);
}

pub fn set_use_thermal_bonding_preprocessor(value: bool) {
    update_settings(|settings| settings.use_thermal_bonding_preprocessor = value);
}

pub fn set_use_bed_compensation_preprocessor(value: bool) {
    update_settings(|settings| settings.use_bed_compensation_preprocessor = value);
}

pub fn set_use_backlash_compensation_preprocessor(value: bool) {
    update_settings(|settings| settings.use_backlash_compensation_preprocessor = value);
}

pub fn set_use_feed_rate_conversion_preprocessor(value: bool) {
    update_settings(|settings| settings.use_feed_rate_conversion_preprocessor = value);
}

pub fn set_use_center_model_preprocessor(value: bool) {
    update_settings(|settings| settings.use_center_model_preprocessor = value);
}

pub fn set_ignore_print_dimension_limitations(value: bool) {
    update_settings(|settings| settings.ignore_print_dimension_limitations = value);
}

pub fn set_using_micro_pass(value: bool) {
    update_settings(|settings| settings.using_micro_pass = value);
}

pub fn set_printing_test_border(value: bool) {
    update_settings(|settings| settings.printing_test_border = value);
}

pub fn set_printing_backlash_calibration_cylinder(value: bool) {
    update_settings(|settings| settings.printing_backlash_calibration_cylinder = value);
}

/// Replace the printable volume checked by the collector
pub fn set_build_volume(volume: BuildVolume) {
    update_settings(|settings| settings.build_volume = volume);
}

/// Restore every setting to its default and forget the current job
pub fn reset_preprocessor_settings() {
    PREPROCESSOR.lock().reset_settings();
    tracing::debug!("Preprocessor settings reset to defaults");
}

/// Scan a file and report whether it can be printed with the current settings
pub fn collect_print_information(path: &str) -> bool {
    match PREPROCESSOR.lock().collect_print_information(path) {
        Ok(printable) => printable,
        Err(e) => {
            tracing::error!("Failed to collect print information from {}: {:#}", path, e);
            false
        }
    }
}

/// Bounds and verdict from the last successful collection
pub fn get_print_information() -> Option<PrintInformation> {
    PREPROCESSOR.lock().print_information().cloned()
}

/// Preprocess a single command, or a whole file
///
/// With no `output`, `input` is one line of G-code and the processed
/// commands are returned, newline separated. With an `output` path, `input`
/// is a file path, the processed file is written to `output` and the
/// returned text is empty.
pub fn preprocess(input: &str, output: Option<&str>, last_command: bool) -> String {
    let mut preprocessor = PREPROCESSOR.lock();

    match output {
        None => preprocessor
            .process_text(input, last_command)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to preprocess '{}': {}", input, e);
                String::new()
            }),
        Some(output) => {
            if let Err(e) = preprocessor.process_file(input, output) {
                tracing::error!("Failed to preprocess {} into {}: {:#}", input, output, e);
            }
            String::new()
        }
    }
}

pub fn min(first: f64, second: f64) -> f64 {
    printfix_core::min(first, second)
}

pub fn max(first: f64, second: f64) -> f64 {
    printfix_core::max(first, second)
}

/// Clamp a temperature into the printer's safe range
pub fn get_bounded_temperature(temperature: u16) -> u16 {
    bounded_temperature(f64::from(temperature))
}

pub fn get_distance(first: &Point3<f64>, second: &Point3<f64>) -> f64 {
    printfix_core::distance(first, second)
}

pub fn is_sharp_corner(current: &Vector3<f64>, previous: &Vector3<f64>) -> bool {
    printfix_core::is_sharp_corner(current, previous)
}

/// Dwell command for a corner, or an empty string when none is needed
pub fn create_tack_point(point: &Point3<f64>, reference: &Point3<f64>) -> String {
    tack_point(point, reference)
        .map(|command| command.to_string())
        .unwrap_or_default()
}

/// Wave bonding offset currently applied to Z
pub fn get_current_adjustment_z() -> f64 {
    PREPROCESSOR.lock().current_adjustment_z()
}

/// Bed compensation required at `(x, y)` with the current calibration
pub fn get_height_adjustment_required(x: f64, y: f64) -> f64 {
    match PREPROCESSOR.lock().height_adjustment(x, y) {
        Ok(adjustment) => adjustment,
        Err(e) => {
            tracing::error!("Failed to compute height adjustment: {}", e);
            0.0
        }
    }
}

pub fn get_z_from_xy_and_plane(point: &Point3<f64>, plane: &PlaneEquation) -> f64 {
    printfix_core::z_from_xy_and_plane(point, plane)
}

pub fn is_point_in_triangle(
    point: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    v3: &Point3<f64>,
) -> bool {
    printfix_core::is_point_in_triangle(point, v1, v2, v3)
}

pub fn sign(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    printfix_core::sign(p1, p2, p3)
}
