//! Boundary to the BLE transport.
//!
//! Discovery, connection and disconnection live outside this crate. A connected
//! hub is handed to a [`Sequencer`](crate::Sequencer) as a [`DeviceHandle`].

/// GATT characteristic of the hub's combined output port.
///
/// The observed hub exposes motor and LED control through the same
/// characteristic, but [`DeviceHandle`] treats them as separately addressable.
pub const OUTPUT_CHARACTERISTIC_UUID: &str = "00001565-1212-efde-1523-785feabcd123";

/// Logical write target on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    /// Motor speed payloads.
    Motor,
    /// LED color payloads.
    Color,
}

impl Characteristic {
    /// GATT UUID this characteristic is written through.
    pub const fn uuid(self) -> &'static str {
        match self {
            Characteristic::Motor => OUTPUT_CHARACTERISTIC_UUID,
            Characteristic::Color => OUTPUT_CHARACTERISTIC_UUID,
        }
    }
}

/// Failure to deliver a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// The connection is gone.
    NotLive,
    /// The transport reported an I/O failure.
    Transport,
}

impl core::fmt::Display for WriteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WriteError::NotLive => write!(f, "device handle is no longer connected"),
            WriteError::Transport => write!(f, "transport failed to deliver payload"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WriteError {}

/// Trait for abstracting a connected hub.
///
/// Implement this over your BLE stack. Write timeouts are the implementation's
/// responsibility; the sequencer treats any error as fatal for the run.
pub trait DeviceHandle {
    /// Returns true while the connection is usable.
    fn is_live(&self) -> bool;

    /// Writes `payload` to `characteristic` and waits for the transport to accept it.
    fn write(&mut self, characteristic: Characteristic, payload: &[u8]) -> Result<(), WriteError>;
}

impl<H: DeviceHandle + ?Sized> DeviceHandle for &mut H {
    fn is_live(&self) -> bool {
        (**self).is_live()
    }

    fn write(&mut self, characteristic: Characteristic, payload: &[u8]) -> Result<(), WriteError> {
        (**self).write(characteristic, payload)
    }
}
