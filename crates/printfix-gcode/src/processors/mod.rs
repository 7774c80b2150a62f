//! Preprocessing pass implementations
//!
//! Passes run in this order:
//! validation, preparation, wave bonding, thermal bonding, bed compensation,
//! backlash compensation, feed-rate conversion, center-model.

pub mod backlash;
pub mod bed_compensation;
pub mod center_model;
pub mod feed_rate;
pub mod preparation;
pub mod thermal_bonding;
pub mod validation;
pub mod wave_bonding;

pub use backlash::{BacklashCompensationPass, BacklashState};
pub use bed_compensation::{BedCompensationPass, BedCompensationState};
pub use center_model::{CenterModelPass, CenterModelState};
pub use feed_rate::FeedRateConversionPass;
pub use preparation::{PreparationPass, PreparationState};
pub use thermal_bonding::{bounded_temperature, ThermalBondingPass, ThermalBondingState};
pub use validation::ValidationPass;
pub use wave_bonding::{create_tack_point, WaveBondingPass, WaveBondingState};

use printfix_core::{GcodeError, Result};

use crate::command::GcodeCommand;

/// Reject commands carrying NaN or infinite values
pub(crate) fn ensure_finite(command: &GcodeCommand) -> Result<()> {
    match command
        .parameters()
        .iter()
        .find(|word| word.value.is_some_and(|value| !value.is_finite()))
    {
        Some(word) => Err(GcodeError::NonFiniteValue {
            parameter: word.letter,
        }
        .into()),
        None => Ok(()),
    }
}
