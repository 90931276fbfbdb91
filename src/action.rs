//! Command-based control for sequencers.

use crate::program::CommandProgram;

/// Actions for controlling sequencers.
#[derive(Debug, Clone)]
pub enum SequencerAction<const N: usize> {
    /// Load program.
    Load(CommandProgram<N>),
    /// Start the loaded program.
    Start,
    /// Cancel the running program and stop the motor.
    Cancel,
    /// Drop any program and return to idle.
    Clear,
}

/// Action targeting a specific device.
#[derive(Debug, Clone)]
pub struct SequencerCommand<Id, const N: usize> {
    pub device_id: Id,
    pub action: SequencerAction<N>,
}

impl<Id, const N: usize> SequencerCommand<Id, N> {
    /// Creates command.
    pub fn new(device_id: Id, action: SequencerAction<N>) -> Self {
        Self { device_id, action }
    }
}
