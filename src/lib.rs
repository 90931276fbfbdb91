#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Command`**: One hub instruction, `Rotate(units)` or `SetColor(color)`
//! - **`Kind`**: Whether a command is `Motion` or `Color`; a change costs a stop and settle pause
//! - **`Color`**: The hub's fixed 11-entry LED table with its wire codes
//! - **`CommandProgram`**: A validated, ordered list of commands, built with `ProgramBuilder`
//!   or parsed from client `RawCommand`s
//! - **`Sequencer`**: Drives a single hub through a program with correct pauses and a final stop
//! - **`DeviceHandle`**: Trait to implement over your BLE transport
//! - **`TimeSource`** / **`Delay`**: Traits to implement for your timing system
//! - **`SequencerCollection`**: Independent sequencers for several hubs
//! - **`SequencerAction`**: Actions that can be routed to sequencers
//!
//! Payload encoding lives in [`encoder`]. It is pure and can be used without a sequencer.

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

#[macro_use]
mod fmt;

pub mod action;
pub mod collection;
pub mod colors;
pub mod command;
pub mod device;
pub mod encoder;
pub mod program;
pub mod sequencer;
pub mod time;
pub mod types;

pub use action::{SequencerAction, SequencerCommand};
pub use collection::{CollectionError, DeviceId, SequencerCollection};
pub use colors::{Color, UnknownColor};
pub use command::{Command, Kind};
pub use device::{Characteristic, DeviceHandle, OUTPUT_CHARACTERISTIC_UUID, WriteError};
pub use encoder::{
    ColorPayload, EncodeError, MotorPayload, Payload, duration_for_rotation, encode_color,
    encode_motor, encode_rotation, speed_for_rotation, stop_payload,
};
pub use program::{
    CommandProgram, ProgramBuilder, RAW_TEXT_CAPACITY, RawCommand, RawText, RawValue, raw_text,
};
pub use sequencer::{Sequencer, SequencerError, SequencerState, ServiceTiming};
pub use time::{Delay, Interrupted, TimeDuration, TimeInstant, TimeSource};
#[cfg(feature = "std")]
pub use time::{CancelToken, StdTimeSource, ThreadDelay};
pub use types::{ProgramError, SequencerConfig};

/// Program capacity used by the type aliases below.
pub const DEFAULT_PROGRAM_CAPACITY: usize = 32;

/// Program with [`DEFAULT_PROGRAM_CAPACITY`] slots.
pub type CommandProgram32 = CommandProgram<DEFAULT_PROGRAM_CAPACITY>;

/// Sequencer accepting [`CommandProgram32`] programs.
pub type Sequencer32<'t, I, H, T> = Sequencer<'t, I, H, T, DEFAULT_PROGRAM_CAPACITY>;
