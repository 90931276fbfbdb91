use crate::action::{SequencerAction, SequencerCommand};
use crate::device::DeviceHandle;
use crate::program::CommandProgram;
use crate::sequencer::{Sequencer, SequencerError, SequencerState, ServiceTiming};
use crate::time::{TimeDuration, TimeInstant, TimeSource};

/// An identifier for a device within a sequencer collection.
///
/// Users pick the ID when adding a device and use it to target that device
/// with actions. IDs double as slot indices, so they must be below the
/// collection's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub usize);

impl From<usize> for DeviceId {
    fn from(id: usize) -> Self {
        DeviceId(id)
    }
}

impl From<DeviceId> for usize {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Errors that can occur during collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CollectionError {
    /// The specified device ID does not exist in the collection.
    InvalidDeviceId(DeviceId),

    /// Attempted to add a device with an ID that already exists.
    DuplicateDeviceId(DeviceId),

    /// The collection is full and cannot accept more devices.
    CollectionFull,

    /// The device ID exceeds the collection's capacity.
    DeviceIdOutOfBounds { id: DeviceId, capacity: usize },

    /// No device in the collection could start a run.
    NoDeviceAvailable,

    /// A sequencer operation failed.
    SequencerError(SequencerError),
}

impl core::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CollectionError::InvalidDeviceId(id) => {
                write!(f, "device ID {} does not exist in collection", id.0)
            }
            CollectionError::DuplicateDeviceId(id) => {
                write!(f, "device ID {} already exists in collection", id.0)
            }
            CollectionError::CollectionFull => {
                write!(f, "collection is full, cannot add more devices")
            }
            CollectionError::DeviceIdOutOfBounds { id, capacity } => {
                write!(
                    f,
                    "device ID {} exceeds collection capacity of {}",
                    id.0, capacity
                )
            }
            CollectionError::NoDeviceAvailable => {
                write!(f, "no devices connected")
            }
            CollectionError::SequencerError(err) => {
                write!(f, "sequencer error: {}", err)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CollectionError {}

impl From<SequencerError> for CollectionError {
    fn from(err: SequencerError) -> Self {
        CollectionError::SequencerError(err)
    }
}

/// Drives several hubs, one independent sequencer per device.
///
/// Runs on different devices share nothing: a failed write on one hub moves
/// only that sequencer to `Failed`, the others keep going. Servicing all of
/// them from a single loop never issues two writes to the same hub at once.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `H` - Device handle type (must be same for all devices in collection)
/// * `T` - Time source implementation type
/// * `N` - Maximum number of commands in programs
/// * `MAX_DEVICES` - Maximum number of devices this collection can hold
pub struct SequencerCollection<
    't,
    I: TimeInstant,
    H: DeviceHandle,
    T: TimeSource<I>,
    const N: usize,
    const MAX_DEVICES: usize,
> {
    sequencers: [Option<Sequencer<'t, I, H, T, N>>; MAX_DEVICES],
    time_source: &'t T,
}

impl<'t, I, H, T, const N: usize, const MAX_DEVICES: usize>
    SequencerCollection<'t, I, H, T, N, MAX_DEVICES>
where
    I: TimeInstant,
    H: DeviceHandle,
    T: TimeSource<I>,
{
    /// Creates a new empty collection.
    ///
    /// # Arguments
    /// * `time_source` - Reference to the time source used by all sequencers
    pub fn new(time_source: &'t T) -> Self {
        Self {
            sequencers: core::array::from_fn(|_| None),
            time_source,
        }
    }

    /// Adds a connected device under the given ID.
    ///
    /// # Errors
    /// * `DuplicateDeviceId` - A device with this ID already exists
    /// * `DeviceIdOutOfBounds` - The ID exceeds the collection's capacity
    pub fn add_device(&mut self, id: DeviceId, handle: H) -> Result<(), CollectionError> {
        let idx = id.0;

        if idx >= MAX_DEVICES {
            return Err(CollectionError::DeviceIdOutOfBounds {
                id,
                capacity: MAX_DEVICES,
            });
        }

        if self.sequencers[idx].is_some() {
            return Err(CollectionError::DuplicateDeviceId(id));
        }

        self.sequencers[idx] = Some(Sequencer::new(handle, self.time_source));
        Ok(())
    }

    /// Adds a device under the lowest free ID.
    ///
    /// # Errors
    /// Returns `CollectionFull` if every slot is taken.
    pub fn push_device(&mut self, handle: H) -> Result<DeviceId, CollectionError> {
        let idx = self
            .sequencers
            .iter()
            .position(Option::is_none)
            .ok_or(CollectionError::CollectionFull)?;

        self.sequencers[idx] = Some(Sequencer::new(handle, self.time_source));
        Ok(DeviceId(idx))
    }

    /// Removes a device and hands its handle back, e.g. for disconnection.
    ///
    /// # Errors
    /// Returns `InvalidDeviceId` if the device does not exist in the collection.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<H, CollectionError> {
        self.sequencers
            .get_mut(id.0)
            .and_then(Option::take)
            .map(Sequencer::into_handle)
            .ok_or(CollectionError::InvalidDeviceId(id))
    }

    /// Routes an action to the specified device's sequencer.
    ///
    /// # Returns
    /// * `Ok(Some(duration))` - Time until the sequencer needs service
    /// * `Ok(None)` - Action complete, no timing information
    /// * `Err` - Invalid device ID or sequencer operation failed
    pub fn handle_command(
        &mut self,
        id: DeviceId,
        action: SequencerAction<N>,
    ) -> Result<Option<I::Duration>, CollectionError> {
        let sequencer = self.sequencer_mut(id)?;

        match sequencer.handle_action(action)? {
            ServiceTiming::Delay(duration) => Ok(Some(duration)),
            ServiceTiming::Complete => Ok(None),
        }
    }

    /// Routes a command received from another task, e.g. over a channel.
    pub fn dispatch(
        &mut self,
        command: SequencerCommand<DeviceId, N>,
    ) -> Result<Option<I::Duration>, CollectionError> {
        self.handle_command(command.device_id, command.action)
    }

    /// Loads `program` on every device and starts it.
    ///
    /// Devices that are not live or still running a program are skipped. A
    /// device whose first write fails is left `Failed` while the rest start.
    ///
    /// # Returns
    /// The number of devices that started.
    ///
    /// # Errors
    /// Returns `NoDeviceAvailable` if no device started.
    pub fn broadcast(&mut self, program: &CommandProgram<N>) -> Result<usize, CollectionError> {
        let mut started = 0;

        for (idx, slot) in self.sequencers.iter_mut().enumerate() {
            let Some(sequencer) = slot else {
                continue;
            };

            if sequencer.is_running() {
                warn!("device {} busy, skipping broadcast", idx);
                continue;
            }

            // A skipped device keeps its previous state and never holds this program
            if !sequencer.handle().is_live() {
                warn!("device {} not connected, skipping broadcast", idx);
                continue;
            }

            sequencer.load(program.clone())?;
            match sequencer.start() {
                Ok(_) => started += 1,
                Err(err @ SequencerError::Write { .. }) => {
                    warn!("device {} failed on first write: {:?}", idx, err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if started == 0 {
            return Err(CollectionError::NoDeviceAvailable);
        }
        Ok(started)
    }

    /// Services all running sequencers and returns the shortest pending delay.
    ///
    /// A write failure moves that device's sequencer to `Failed` (see
    /// [`last_error`](Self::last_error)) without affecting the others.
    ///
    /// # Returns
    /// * `Some(duration)` - Sleep for this duration before the next service call
    /// * `None` - No device is running. No further servicing is needed until a
    ///   new program is started.
    pub fn service_all(&mut self) -> Option<I::Duration> {
        let mut min_duration: Option<I::Duration> = None;

        for (idx, slot) in self.sequencers.iter_mut().enumerate() {
            let Some(sequencer) = slot else {
                continue;
            };
            if sequencer.state() != SequencerState::Running {
                continue;
            }

            match sequencer.service() {
                Ok(ServiceTiming::Delay(duration)) => {
                    min_duration = match min_duration {
                        Some(current_min) if current_min.as_millis() <= duration.as_millis() => {
                            Some(current_min)
                        }
                        _ => Some(duration),
                    };
                }
                Ok(ServiceTiming::Complete) => {}
                Err(err) => {
                    warn!("device {} aborted: {:?}", idx, err);
                }
            }
        }

        min_duration
    }

    /// Returns the current state of the specified device's sequencer.
    ///
    /// # Errors
    /// Returns `InvalidDeviceId` if the device does not exist in the collection.
    pub fn state(&self, id: DeviceId) -> Result<SequencerState, CollectionError> {
        Ok(self.sequencer(id)?.state())
    }

    /// Returns the error that ended the device's last run, if any.
    ///
    /// # Errors
    /// Returns `InvalidDeviceId` if the device does not exist in the collection.
    pub fn last_error(&self, id: DeviceId) -> Result<Option<SequencerError>, CollectionError> {
        Ok(self.sequencer(id)?.last_error())
    }

    /// Returns the specified device's sequencer.
    pub fn sequencer(&self, id: DeviceId) -> Result<&Sequencer<'t, I, H, T, N>, CollectionError> {
        self.sequencers
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(CollectionError::InvalidDeviceId(id))
    }

    fn sequencer_mut(
        &mut self,
        id: DeviceId,
    ) -> Result<&mut Sequencer<'t, I, H, T, N>, CollectionError> {
        self.sequencers
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CollectionError::InvalidDeviceId(id))
    }

    /// Returns true if any device is running a program.
    pub fn is_busy(&self) -> bool {
        self.sequencers.iter().flatten().any(Sequencer::is_running)
    }

    /// Returns the number of devices currently in the collection.
    pub fn len(&self) -> usize {
        self.sequencers.iter().filter(|s| s.is_some()).count()
    }

    /// Returns true if the collection contains no devices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the collection contains a device with the given ID.
    pub fn contains(&self, id: DeviceId) -> bool {
        let idx = id.0;
        idx < MAX_DEVICES && self.sequencers[idx].is_some()
    }
}
