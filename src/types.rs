//! Core types for program construction and sequencer timing.

use crate::encoder::{COLOR_DWELL_MS, SETTLE_DELAY_MS};
use crate::time::TimeDuration;

/// Timing knobs of a [`Sequencer`](crate::Sequencer).
///
/// Defaults match the hub's observed behavior; change them only for testing or
/// for hardware with different settle characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerConfig<D: TimeDuration> {
    /// Pause after the stop that separates a motion command from a color command.
    pub settle_delay: D,

    /// Hold after every color write.
    pub color_dwell: D,
}

impl<D: TimeDuration> Default for SequencerConfig<D> {
    fn default() -> Self {
        Self {
            settle_delay: D::from_millis(SETTLE_DELAY_MS),
            color_dwell: D::from_millis(COLOR_DWELL_MS),
        }
    }
}

/// Program validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramError {
    /// Program capacity exceeded.
    CapacityExceeded,

    /// Color name at `index` is not in the color table.
    UnknownColor { index: usize },

    /// Value at `index` has the wrong type for its command, or does not fit.
    InvalidValue { index: usize },
}

impl core::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProgramError::CapacityExceeded => {
                write!(f, "program capacity exceeded")
            }
            ProgramError::UnknownColor { index } => {
                write!(f, "command {} names an unknown color", index)
            }
            ProgramError::InvalidValue { index } => {
                write!(f, "command {} has a value of the wrong type", index)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProgramError {}
