//! Hub command sequencer with state management and timing control.
//!
//! Provides [`Sequencer`], which drives a single hub through a
//! [`CommandProgram`]. It inserts stop and settle pauses between commands of
//! different kinds, waits out every command's hold time, and always finishes
//! a successful run with a motor stop.

use crate::action::SequencerAction;
use crate::command::{Command, Kind};
use crate::device::{DeviceHandle, WriteError};
use crate::encoder::{MotorPayload, Payload};
use crate::program::CommandProgram;
use crate::time::{Delay, Interrupted, TimeDuration, TimeInstant, TimeSource};
use crate::types::SequencerConfig;

/// The current state of a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// No program loaded.
    Idle,
    /// Program loaded and ready to start. Nothing written yet.
    Loaded,
    /// Program executing.
    Running,
    /// Program finished and the final stop was written.
    Complete,
    /// A write failed. The device holds whatever was last written.
    Failed,
    /// Run cancelled and the motor stopped.
    Cancelled,
}

/// Timing information returned by service operations.
///
/// Indicates when the sequencer needs to be serviced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceTiming<D> {
    /// The run is suspended. Service again after the specified delay.
    Delay(D),

    /// The run has completed. No further servicing is needed until a new
    /// program is loaded and started.
    Complete,
}

/// Errors that can occur during sequencer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerError {
    /// Operation called from an invalid state.
    InvalidState {
        /// Human-readable description of expected state(s)
        expected: &'static str,
        /// The actual current state
        actual: SequencerState,
    },
    /// No program is loaded.
    NoProgramLoaded,
    /// The device handle was not live when the run was requested.
    NoDeviceAvailable,
    /// A write failed and the run was aborted.
    Write {
        error: WriteError,
        /// Commands fully executed before the failure.
        completed: usize,
    },
    /// A suspension was cut short and the run cancelled.
    Interrupted(Interrupted),
}

impl core::fmt::Display for SequencerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequencerError::InvalidState { expected, actual } => {
                write!(
                    f,
                    "invalid state: expected {}, but sequencer is in {:?}",
                    expected, actual
                )
            }
            SequencerError::NoProgramLoaded => {
                write!(f, "no program loaded")
            }
            SequencerError::NoDeviceAvailable => {
                write!(f, "no live device handle")
            }
            SequencerError::Write { error, completed } => {
                write!(f, "{} after {} completed commands", error, completed)
            }
            SequencerError::Interrupted(reason) => {
                write!(f, "{}", reason)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequencerError {}

impl From<Interrupted> for SequencerError {
    fn from(reason: Interrupted) -> Self {
        SequencerError::Interrupted(reason)
    }
}

/// Where the run stands relative to the command at the given index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the command: decide whether a settle pause is needed.
    Next(usize),
    /// Write the command's payload.
    Issue(usize),
    /// Rotation time elapsed: stop the motor.
    Halt(usize),
    /// All commands done: write the final stop.
    Finish,
}

/// Drives a single hub through a command program.
///
/// The sequencer owns its device handle, so writes to one hub are always
/// serialized. Several hubs are driven by several independent sequencers (see
/// [`SequencerCollection`](crate::SequencerCollection)).
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `H` - Device handle type
/// * `T` - Time source implementation type
/// * `N` - Maximum number of commands in programs
pub struct Sequencer<'t, I: TimeInstant, H: DeviceHandle, T: TimeSource<I>, const N: usize> {
    handle: H,
    time_source: &'t T,
    config: SequencerConfig<I::Duration>,
    state: SequencerState,
    program: Option<CommandProgram<N>>,
    phase: Phase,
    previous_kind: Option<Kind>,
    completed: usize,
    suspended_at: Option<I>,
    pending: I::Duration,
    last_error: Option<SequencerError>,
}

impl<'t, I: TimeInstant, H: DeviceHandle, T: TimeSource<I>, const N: usize>
    Sequencer<'t, I, H, T, N>
{
    /// Creates a new idle sequencer with default timing.
    pub fn new(handle: H, time_source: &'t T) -> Self {
        Self::with_config(handle, time_source, SequencerConfig::default())
    }

    /// Creates a new idle sequencer with custom timing.
    pub fn with_config(
        handle: H,
        time_source: &'t T,
        config: SequencerConfig<I::Duration>,
    ) -> Self {
        Self {
            handle,
            time_source,
            config,
            state: SequencerState::Idle,
            program: None,
            phase: Phase::Next(0),
            previous_kind: None,
            completed: 0,
            suspended_at: None,
            pending: I::Duration::ZERO,
            last_error: None,
        }
    }

    /// Handles a sequencer action by dispatching to the appropriate method.
    ///
    /// # Returns
    /// * `Ok(ServiceTiming)` - Timing for `Start`
    /// * `Ok(ServiceTiming::Complete)` - For actions that don't require servicing
    /// * `Err` - Operation failed
    pub fn handle_action(
        &mut self,
        action: SequencerAction<N>,
    ) -> Result<ServiceTiming<I::Duration>, SequencerError> {
        match action {
            SequencerAction::Load(program) => {
                self.load(program)?;
                Ok(ServiceTiming::Complete)
            }
            SequencerAction::Start => self.start(),
            SequencerAction::Cancel => {
                self.cancel()?;
                Ok(ServiceTiming::Complete)
            }
            SequencerAction::Clear => {
                self.clear();
                Ok(ServiceTiming::Complete)
            }
        }
    }

    /// Loads a program, replacing any finished one.
    ///
    /// Rejected while a run is in progress; cancel it first.
    pub fn load(&mut self, program: CommandProgram<N>) -> Result<(), SequencerError> {
        if self.state == SequencerState::Running {
            return Err(SequencerError::InvalidState {
                expected: "Idle, Loaded, Complete, Failed, or Cancelled",
                actual: self.state,
            });
        }

        self.program = Some(program);
        self.reset_run();
        self.last_error = None;
        self.state = SequencerState::Loaded;
        Ok(())
    }

    /// Starts the loaded program and performs the writes up to its first suspension.
    ///
    /// Must be called from `Loaded` state with a live handle.
    ///
    /// # Returns
    /// * `Ok(ServiceTiming)` - When to service next
    /// * `Err` - Invalid state, no program, no live device, or the first write failed
    pub fn start(&mut self) -> Result<ServiceTiming<I::Duration>, SequencerError> {
        if self.state != SequencerState::Loaded {
            return Err(SequencerError::InvalidState {
                expected: "Loaded",
                actual: self.state,
            });
        }

        let Some(program) = self.program.as_ref() else {
            return Err(SequencerError::NoProgramLoaded);
        };

        if !self.handle.is_live() {
            return Err(SequencerError::NoDeviceAvailable);
        }

        debug!("starting program of {} commands", program.len());
        self.reset_run();
        self.state = SequencerState::Running;
        self.service()
    }

    /// Services the sequencer, writing to the device if a suspension has elapsed.
    ///
    /// Must be called from `Running` state. Calling it early is harmless: no
    /// write happens and the remaining delay is returned.
    ///
    /// # Returns
    /// - `Ok(ServiceTiming::Delay(duration))` - Suspended, service after this delay
    /// - `Ok(ServiceTiming::Complete)` - Final stop written, transitions to `Complete`
    /// - `Err` - Invalid state, or a write failed (transitions to `Failed`)
    pub fn service(&mut self) -> Result<ServiceTiming<I::Duration>, SequencerError> {
        if self.state != SequencerState::Running {
            return Err(SequencerError::InvalidState {
                expected: "Running",
                actual: self.state,
            });
        }

        if let Some(since) = self.suspended_at {
            let waited = self.time_source.now().duration_since(since);
            let remaining = self.pending.saturating_sub(waited);
            if remaining != I::Duration::ZERO {
                return Ok(ServiceTiming::Delay(remaining));
            }
            self.suspended_at = None;
        }

        loop {
            match self.phase {
                Phase::Next(index) => {
                    let Some(command) = self.command_at(index)? else {
                        self.phase = Phase::Finish;
                        continue;
                    };

                    let kind = command.kind();
                    self.phase = Phase::Issue(index);
                    if let Some(previous) = self.previous_kind.filter(|previous| *previous != kind) {
                        trace!("kind change {:?} -> {:?}, settling", previous, kind);
                        self.write(Payload::Motor(MotorPayload::STOP))?;
                        return Ok(self.suspend(self.config.settle_delay));
                    }
                }
                Phase::Issue(index) => {
                    let command = self.command_at(index)?.ok_or(SequencerError::NoProgramLoaded)?;
                    self.previous_kind = Some(command.kind());
                    self.write(command.payload())?;

                    self.phase = match command {
                        Command::Rotate(_) => Phase::Halt(index),
                        Command::SetColor(_) => {
                            self.completed += 1;
                            Phase::Next(index + 1)
                        }
                    };

                    let hold = command.hold(self.config.color_dwell);
                    if hold != I::Duration::ZERO {
                        return Ok(self.suspend(hold));
                    }
                }
                Phase::Halt(index) => {
                    self.write(Payload::Motor(MotorPayload::STOP))?;
                    self.completed += 1;
                    self.phase = Phase::Next(index + 1);
                }
                Phase::Finish => {
                    self.write(Payload::Motor(MotorPayload::STOP))?;
                    self.program = None;
                    self.state = SequencerState::Complete;
                    debug!("program complete after {} commands", self.completed);
                    return Ok(ServiceTiming::Complete);
                }
            }
        }
    }

    /// Cancels the running program and stops the motor.
    ///
    /// Must be called from `Running` state. Transitions to `Cancelled`, or to
    /// `Failed` if the stop cannot be written.
    pub fn cancel(&mut self) -> Result<(), SequencerError> {
        if self.state != SequencerState::Running {
            return Err(SequencerError::InvalidState {
                expected: "Running",
                actual: self.state,
            });
        }

        self.write(Payload::Motor(MotorPayload::STOP))?;
        self.program = None;
        self.suspended_at = None;
        self.state = SequencerState::Cancelled;
        debug!("cancelled after {} commands", self.completed);
        Ok(())
    }

    /// Drops any program and returns to `Idle`. Writes nothing.
    pub fn clear(&mut self) {
        self.program = None;
        self.reset_run();
        self.last_error = None;
        self.state = SequencerState::Idle;
    }

    /// Runs the loaded program to completion, blocking in `delay` at every suspension.
    ///
    /// If `delay` reports an interruption the run is cancelled (motor stopped)
    /// and the interruption is returned.
    ///
    /// # Returns
    /// The number of commands executed.
    pub fn run<S: Delay<I::Duration>>(&mut self, delay: &mut S) -> Result<usize, SequencerError> {
        let mut timing = self.start()?;

        loop {
            match timing {
                ServiceTiming::Complete => return Ok(self.completed),
                ServiceTiming::Delay(duration) => {
                    if let Err(reason) = delay.delay(duration) {
                        warn!("run interrupted: {:?}", reason);
                        self.cancel()?;
                        self.last_error = Some(SequencerError::Interrupted(reason));
                        return Err(SequencerError::Interrupted(reason));
                    }
                    timing = self.service()?;
                }
            }
        }
    }

    /// Returns the current state of the sequencer.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Returns true if the sequencer is currently running.
    pub fn is_running(&self) -> bool {
        self.state == SequencerState::Running
    }

    /// Kind of the last command whose payload was written in this run.
    pub fn previous_kind(&self) -> Option<Kind> {
        self.previous_kind
    }

    /// Commands fully executed in the current or last run.
    pub fn completed_commands(&self) -> usize {
        self.completed
    }

    /// The error that ended the last run, if it did not complete.
    pub fn last_error(&self) -> Option<SequencerError> {
        self.last_error
    }

    pub fn config(&self) -> &SequencerConfig<I::Duration> {
        &self.config
    }

    /// Returns a reference to the loaded program, if any.
    pub fn current_program(&self) -> Option<&CommandProgram<N>> {
        self.program.as_ref()
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Releases the device handle, e.g. to disconnect it.
    pub fn into_handle(self) -> H {
        self.handle
    }

    fn command_at(&self, index: usize) -> Result<Option<Command>, SequencerError> {
        self.program
            .as_ref()
            .map(|program| program.get(index))
            .ok_or(SequencerError::NoProgramLoaded)
    }

    fn suspend(&mut self, duration: I::Duration) -> ServiceTiming<I::Duration> {
        trace!("suspending for {} ms", duration.as_millis());
        self.suspended_at = Some(self.time_source.now());
        self.pending = duration;
        ServiceTiming::Delay(duration)
    }

    fn write(&mut self, payload: Payload) -> Result<(), SequencerError> {
        let bytes = payload.bytes();
        trace!("write {:?} {:?}", payload.characteristic(), bytes);

        match self.handle.write(payload.characteristic(), &bytes) {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!("write failed after {} commands: {:?}", self.completed, error);
                let completed = self.completed;
                Err(self.fail(SequencerError::Write { error, completed }))
            }
        }
    }

    fn fail(&mut self, error: SequencerError) -> SequencerError {
        self.program = None;
        self.suspended_at = None;
        self.last_error = Some(error);
        self.state = SequencerState::Failed;
        error
    }

    fn reset_run(&mut self) {
        self.phase = Phase::Next(0);
        self.previous_kind = None;
        self.completed = 0;
        self.suspended_at = None;
        self.pending = I::Duration::ZERO;
    }
}
