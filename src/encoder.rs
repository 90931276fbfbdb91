//! Pure translation from commands to wire payloads and timing estimates.

use crate::colors::{Color, UnknownColor};
use crate::device::Characteristic;
use crate::time::TimeDuration;

/// Command-class prefix of every motor payload.
pub const MOTOR_PREFIX: [u8; 3] = [0x01, 0x01, 0x01];

/// Command-class prefix of every color payload.
pub const COLOR_PREFIX: [u8; 3] = [0x06, 0x04, 0x01];

/// Largest speed magnitude the hub accepts.
pub const MAX_SPEED: i8 = 100;

/// Speed magnitude used for every rotation. Rotation count only scales duration.
pub const ROTATION_SPEED: i8 = 33;

/// Time the motor takes for [`ROTATIONS_PER_PERIOD`] rotations at [`ROTATION_SPEED`].
pub const ROTATION_PERIOD_MS: u64 = 3_500;

pub const ROTATIONS_PER_PERIOD: u64 = 3;

/// Pause after a stop when consecutive commands differ in kind.
pub const SETTLE_DELAY_MS: u64 = 1_000;

/// Hold time after every color write.
pub const COLOR_DWELL_MS: u64 = 2_000;

/// Motor speed out of `[-MAX_SPEED, MAX_SPEED]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    SpeedOutOfRange(i8),
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EncodeError::SpeedOutOfRange(speed) => {
                write!(f, "motor speed {} outside -{}..={}", speed, MAX_SPEED, MAX_SPEED)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// 4-byte motor speed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorPayload([u8; 4]);

impl MotorPayload {
    /// Payload that stops the motor.
    pub const STOP: MotorPayload = MotorPayload([MOTOR_PREFIX[0], MOTOR_PREFIX[1], MOTOR_PREFIX[2], 0]);

    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Signed speed encoded in this payload.
    pub const fn speed(&self) -> i8 {
        self.0[3] as i8
    }
}

/// 4-byte LED color payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorPayload([u8; 4]);

impl ColorPayload {
    pub const fn new(color: Color) -> Self {
        ColorPayload([COLOR_PREFIX[0], COLOR_PREFIX[1], COLOR_PREFIX[2], color.code()])
    }

    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    pub fn color(&self) -> Option<Color> {
        Color::from_code(self.0[3])
    }
}

/// A payload together with the characteristic it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    Motor(MotorPayload),
    Color(ColorPayload),
}

impl Payload {
    pub const fn characteristic(&self) -> Characteristic {
        match self {
            Payload::Motor(_) => Characteristic::Motor,
            Payload::Color(_) => Characteristic::Color,
        }
    }

    pub const fn bytes(&self) -> [u8; 4] {
        match self {
            Payload::Motor(p) => p.bytes(),
            Payload::Color(p) => p.bytes(),
        }
    }
}

impl From<MotorPayload> for Payload {
    fn from(payload: MotorPayload) -> Self {
        Payload::Motor(payload)
    }
}

impl From<ColorPayload> for Payload {
    fn from(payload: ColorPayload) -> Self {
        Payload::Color(payload)
    }
}

/// Encodes a signed speed as `[0x01, 0x01, 0x01, (256 + speed) mod 256]`.
pub fn encode_motor(speed: i8) -> Result<MotorPayload, EncodeError> {
    if !(-MAX_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(EncodeError::SpeedOutOfRange(speed));
    }

    Ok(pack_speed(speed))
}

/// Motor payload for a rotation request.
///
/// Infallible: [`speed_for_rotation`] never leaves `[-MAX_SPEED, MAX_SPEED]`.
pub fn encode_rotation(units: i32) -> MotorPayload {
    pack_speed(speed_for_rotation(units))
}

fn pack_speed(speed: i8) -> MotorPayload {
    let speed_byte = (256 + i16::from(speed)).rem_euclid(256) as u8;
    MotorPayload([MOTOR_PREFIX[0], MOTOR_PREFIX[1], MOTOR_PREFIX[2], speed_byte])
}

/// The speed-0 motor payload.
#[inline]
pub const fn stop_payload() -> MotorPayload {
    MotorPayload::STOP
}

/// Resolves `name` and encodes it as a color payload.
pub fn encode_color(name: &str) -> Result<ColorPayload, UnknownColor> {
    Color::from_name(name).map(ColorPayload::new)
}

/// Speed for a rotation request: fixed magnitude, signed like `units`.
#[inline]
pub fn speed_for_rotation(units: i32) -> i8 {
    match units.signum() {
        1 => ROTATION_SPEED,
        -1 => -ROTATION_SPEED,
        _ => 0,
    }
}

/// Run time for a rotation request, proportional to `|units|`.
///
/// Rounded to the nearest millisecond: one unit is 1167 ms.
pub fn duration_for_rotation<D: TimeDuration>(units: i32) -> D {
    let magnitude = u64::from(units.unsigned_abs());
    let millis = (magnitude * ROTATION_PERIOD_MS * 2 + ROTATIONS_PER_PERIOD) / (ROTATIONS_PER_PERIOD * 2);
    D::from_millis(millis)
}
