//! Device commands and their kinds.

use crate::colors::Color;
use crate::encoder::{self, ColorPayload, Payload};
use crate::time::TimeDuration;

/// One instruction for the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Turn the motor for `units` rotations; the sign selects the direction.
    Rotate(i32),
    /// Switch the LED to a color.
    SetColor(Color),
}

/// What a command actuates.
///
/// The sequencer inserts a stop and settle pause whenever this changes between
/// consecutive commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    Motion,
    Color,
}

impl Command {
    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            Command::Rotate(_) => Kind::Motion,
            Command::SetColor(_) => Kind::Color,
        }
    }

    /// The payload that starts this command.
    pub fn payload(&self) -> Payload {
        match *self {
            Command::Rotate(units) => Payload::Motor(encoder::encode_rotation(units)),
            Command::SetColor(color) => Payload::Color(ColorPayload::new(color)),
        }
    }

    /// How long the command holds after its payload is written.
    pub fn hold<D: TimeDuration>(&self, color_dwell: D) -> D {
        match *self {
            Command::Rotate(units) => encoder::duration_for_rotation(units),
            Command::SetColor(_) => color_dwell,
        }
    }
}

impl From<Color> for Command {
    fn from(color: Color) -> Self {
        Command::SetColor(color)
    }
}
