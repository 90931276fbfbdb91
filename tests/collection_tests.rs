//! Integration tests for SequencerCollection

mod common;
use common::*;

use wedo_sequencer::{
    Color, CollectionError, CommandProgram, DeviceId, SequencerAction, SequencerCollection,
    SequencerCommand, SequencerError, SequencerState, WriteError,
};

type TestCollection<'t> = SequencerCollection<'t, TestInstant, MockHub, MockTimeSource, 8, 4>;

fn rotate_then_red() -> CommandProgram<8> {
    CommandProgram::builder()
        .rotate(1)
        .unwrap()
        .color(Color::Red)
        .unwrap()
        .build()
}

/// Services the collection until every device is idle, advancing the mock clock.
fn drain(collection: &mut TestCollection<'_>, timer: &MockTimeSource) {
    while let Some(delay) = collection.service_all() {
        timer.advance(delay);
    }
}

#[test]
fn add_device_validates_ids() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();

    assert_eq!(
        collection.add_device(DeviceId(0), MockHub::new(&log)),
        Err(CollectionError::DuplicateDeviceId(DeviceId(0)))
    );
    assert_eq!(
        collection.add_device(DeviceId(4), MockHub::new(&log)),
        Err(CollectionError::DeviceIdOutOfBounds {
            id: DeviceId(4),
            capacity: 4,
        })
    );
    assert_eq!(collection.len(), 1);
    assert!(collection.contains(DeviceId(0)));
    assert!(!collection.contains(DeviceId(1)));
}

#[test]
fn push_device_fills_lowest_free_slot() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();
    collection.add_device(DeviceId(2), MockHub::new(&log)).unwrap();

    assert_eq!(collection.push_device(MockHub::new(&log)), Ok(DeviceId(1)));
    assert_eq!(collection.push_device(MockHub::new(&log)), Ok(DeviceId(3)));
    assert_eq!(
        collection.push_device(MockHub::new(&log)),
        Err(CollectionError::CollectionFull)
    );
}

#[test]
fn remove_device_returns_handle() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(1), MockHub::new(&log)).unwrap();

    let hub = collection.remove_device(DeviceId(1)).unwrap();
    assert_eq!(hub.write_count(), 0);
    assert!(collection.is_empty());
    assert!(matches!(
        collection.remove_device(DeviceId(1)),
        Err(CollectionError::InvalidDeviceId(DeviceId(1)))
    ));
}

#[test]
fn broadcast_without_devices_fails() {
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    assert_eq!(
        collection.broadcast(&rotate_then_red()),
        Err(CollectionError::NoDeviceAvailable)
    );
}

#[test]
fn broadcast_runs_every_device_independently() {
    let first = timeline();
    let second = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&first)).unwrap();
    collection.add_device(DeviceId(1), MockHub::new(&second)).unwrap();

    assert_eq!(collection.broadcast(&rotate_then_red()), Ok(2));
    assert!(collection.is_busy());

    drain(&mut collection, &timer);

    let expected = vec![motor(33), STOP, STOP, color(0x09), STOP];
    assert_eq!(*first.borrow(), expected);
    assert_eq!(*second.borrow(), expected);
    assert_eq!(collection.state(DeviceId(0)), Ok(SequencerState::Complete));
    assert_eq!(collection.state(DeviceId(1)), Ok(SequencerState::Complete));
    assert!(!collection.is_busy());
}

#[test]
fn broadcast_skips_disconnected_devices() {
    let live = timeline();
    let dead = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&dead).disconnected()).unwrap();
    collection.add_device(DeviceId(3), MockHub::new(&live)).unwrap();

    assert_eq!(collection.broadcast(&rotate_then_red()), Ok(1));
    assert_eq!(collection.state(DeviceId(0)), Ok(SequencerState::Idle));
    assert!(collection.sequencer(DeviceId(0)).unwrap().current_program().is_none());
    assert_eq!(collection.state(DeviceId(3)), Ok(SequencerState::Running));
    assert!(dead.borrow().is_empty());
}

#[test]
fn skipped_device_does_not_replay_broadcast_later() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();
    collection.add_device(DeviceId(1), MockHub::new(&log).disconnected()).unwrap();

    let rotation = CommandProgram::builder().rotate(1).unwrap().build();
    assert_eq!(collection.broadcast(&rotation), Ok(1));

    // Nothing was loaded on the skipped device, so starting it is rejected
    assert!(matches!(
        collection.handle_command(DeviceId(1), SequencerAction::Start),
        Err(CollectionError::SequencerError(SequencerError::InvalidState {
            actual: SequencerState::Idle,
            ..
        }))
    ));
}

#[test]
fn failure_on_one_device_leaves_others_running() {
    let healthy = timeline();
    let flaky = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&flaky).failing_at(1)).unwrap();
    collection.add_device(DeviceId(1), MockHub::new(&healthy)).unwrap();

    collection.broadcast(&rotate_then_red()).unwrap();
    drain(&mut collection, &timer);

    assert_eq!(collection.state(DeviceId(0)), Ok(SequencerState::Failed));
    assert_eq!(
        collection.last_error(DeviceId(0)),
        Ok(Some(SequencerError::Write {
            error: WriteError::Transport,
            completed: 0,
        }))
    );
    assert_eq!(*flaky.borrow(), vec![motor(33)]);

    assert_eq!(collection.state(DeviceId(1)), Ok(SequencerState::Complete));
    assert_eq!(collection.last_error(DeviceId(1)), Ok(None));
    assert_eq!(healthy.borrow().len(), 5);
}

#[test]
fn service_all_returns_shortest_pending_delay() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();
    collection.add_device(DeviceId(1), MockHub::new(&log)).unwrap();

    let rotation = CommandProgram::builder().rotate(3).unwrap().build();
    let color = CommandProgram::builder().color(Color::Blue).unwrap().build();

    collection
        .handle_command(DeviceId(0), SequencerAction::Load(rotation))
        .unwrap();
    collection
        .handle_command(DeviceId(1), SequencerAction::Load(color))
        .unwrap();

    assert_eq!(
        collection.handle_command(DeviceId(0), SequencerAction::Start),
        Ok(Some(TestDuration(3500)))
    );
    assert_eq!(
        collection.handle_command(DeviceId(1), SequencerAction::Start),
        Ok(Some(TestDuration(2000)))
    );

    assert_eq!(collection.service_all(), Some(TestDuration(2000)));
    timer.advance(TestDuration(2000));
    // Device 1 completes; device 0 still has 1500 ms to go.
    assert_eq!(collection.service_all(), Some(TestDuration(1500)));
    timer.advance(TestDuration(1500));
    assert_eq!(collection.service_all(), None);
}

#[test]
fn busy_device_is_skipped_by_broadcast() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();
    collection.broadcast(&rotate_then_red()).unwrap();

    assert_eq!(
        collection.broadcast(&rotate_then_red()),
        Err(CollectionError::NoDeviceAvailable)
    );
    assert_eq!(collection.state(DeviceId(0)), Ok(SequencerState::Running));
}

#[test]
fn commands_to_unknown_devices_are_rejected() {
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    assert_eq!(
        collection.handle_command(DeviceId(2), SequencerAction::Start),
        Err(CollectionError::InvalidDeviceId(DeviceId(2)))
    );
    assert_eq!(
        collection.state(DeviceId(9)),
        Err(CollectionError::InvalidDeviceId(DeviceId(9)))
    );
}

#[test]
fn sequencer_errors_are_wrapped() {
    let log = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&log)).unwrap();

    assert!(matches!(
        collection.handle_command(DeviceId(0), SequencerAction::Cancel),
        Err(CollectionError::SequencerError(SequencerError::InvalidState { .. }))
    ));
}

#[test]
fn queued_commands_are_dispatched_by_id() {
    let first = timeline();
    let second = timeline();
    let timer = MockTimeSource::new();
    let mut collection = TestCollection::new(&timer);

    collection.add_device(DeviceId(0), MockHub::new(&first)).unwrap();
    collection.add_device(DeviceId(1), MockHub::new(&second)).unwrap();

    let queue = [
        SequencerCommand::new(DeviceId(1), SequencerAction::Load(rotate_then_red())),
        SequencerCommand::new(DeviceId(1), SequencerAction::Start),
        SequencerCommand::new(DeviceId(1), SequencerAction::Cancel),
    ];
    for command in queue {
        collection.dispatch(command).unwrap();
    }

    assert!(first.borrow().is_empty());
    assert_eq!(*second.borrow(), vec![motor(33), STOP]);
    assert_eq!(collection.state(DeviceId(0)), Ok(SequencerState::Idle));
    assert_eq!(collection.state(DeviceId(1)), Ok(SequencerState::Cancelled));
}
