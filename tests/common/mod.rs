//! Shared test infrastructure for wedo-sequencer integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wedo_sequencer::{
    Characteristic, Delay, DeviceHandle, Interrupted, TimeDuration, TimeInstant, TimeSource,
    WriteError,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        TestDuration(self.0.saturating_sub(other.0))
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }

    fn checked_add(self, duration: Self::Duration) -> Option<Self> {
        Some(TestInstant(self.0 + duration.0))
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: TestDuration) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + duration.0));
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Timeline
// ============================================================================

/// One observable step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write(Characteristic, [u8; 4]),
    Sleep(u64),
}

pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

pub const STOP: Event = Event::Write(Characteristic::Motor, [0x01, 0x01, 0x01, 0x00]);

pub fn motor(speed_byte: u8) -> Event {
    Event::Write(Characteristic::Motor, [0x01, 0x01, 0x01, speed_byte])
}

pub fn color(code: u8) -> Event {
    Event::Write(Characteristic::Color, [0x06, 0x04, 0x01, code])
}

// ============================================================================
// Mock Hub
// ============================================================================

/// Mock hub that records every write into a shared timeline
pub struct MockHub {
    timeline: Timeline,
    live: bool,
    writes: usize,
    fail_at: Option<usize>,
}

impl MockHub {
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            timeline: Rc::clone(timeline),
            live: true,
            writes: 0,
            fail_at: None,
        }
    }

    /// Fails the write with this zero-based ordinal and every later one.
    pub fn failing_at(mut self, ordinal: usize) -> Self {
        self.fail_at = Some(ordinal);
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.live = false;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl DeviceHandle for MockHub {
    fn is_live(&self) -> bool {
        self.live
    }

    fn write(&mut self, characteristic: Characteristic, payload: &[u8]) -> Result<(), WriteError> {
        if !self.live {
            return Err(WriteError::NotLive);
        }
        if self.fail_at.is_some_and(|ordinal| self.writes >= ordinal) {
            return Err(WriteError::Transport);
        }

        let bytes: [u8; 4] = payload.try_into().map_err(|_| WriteError::Transport)?;
        self.timeline.borrow_mut().push(Event::Write(characteristic, bytes));
        self.writes += 1;
        Ok(())
    }
}

// ============================================================================
// Recording Delay
// ============================================================================

/// Delay that advances the mock clock instead of sleeping
pub struct RecordingDelay<'a> {
    timer: &'a MockTimeSource,
    timeline: Timeline,
    interrupt_at: Option<(usize, Interrupted)>,
    calls: usize,
}

impl<'a> RecordingDelay<'a> {
    pub fn new(timer: &'a MockTimeSource, timeline: &Timeline) -> Self {
        Self {
            timer,
            timeline: Rc::clone(timeline),
            interrupt_at: None,
            calls: 0,
        }
    }

    /// Interrupts the delay call with this zero-based ordinal.
    pub fn interrupting_at(mut self, ordinal: usize, reason: Interrupted) -> Self {
        self.interrupt_at = Some((ordinal, reason));
        self
    }
}

impl Delay<TestDuration> for RecordingDelay<'_> {
    fn delay(&mut self, duration: TestDuration) -> Result<(), Interrupted> {
        let call = self.calls;
        self.calls += 1;

        if let Some((ordinal, reason)) = self.interrupt_at {
            if ordinal == call {
                return Err(reason);
            }
        }

        self.timeline.borrow_mut().push(Event::Sleep(duration.0));
        self.timer.advance(duration);
        Ok(())
    }
}
