//! Runs a program against a console hub that prints every write.
//!
//! `cargo run --example dry_run --features std`

use std::time::{Duration, Instant};

use wedo_sequencer::{
    Characteristic, CommandProgram, DeviceHandle, Sequencer, SequencerConfig, SequencerError,
    StdTimeSource, ThreadDelay, WriteError,
};

/// Stand-in for a connected hub.
struct ConsoleHub {
    started: Instant,
}

impl DeviceHandle for ConsoleHub {
    fn is_live(&self) -> bool {
        true
    }

    fn write(&mut self, characteristic: Characteristic, payload: &[u8]) -> Result<(), WriteError> {
        println!(
            "{:>6} ms  {:?} {} <- {:02x?}",
            self.started.elapsed().as_millis(),
            characteristic,
            characteristic.uuid(),
            payload
        );
        Ok(())
    }
}

fn main() -> Result<(), SequencerError> {
    let time_source = StdTimeSource;
    let hub = ConsoleHub {
        started: Instant::now(),
    };

    // Shorter pauses than the real hub needs, rotations keep their timing
    let config = SequencerConfig {
        settle_delay: Duration::from_millis(250),
        color_dwell: Duration::from_millis(500),
    };
    let mut sequencer: Sequencer<'_, Instant, ConsoleHub, StdTimeSource, 16> =
        Sequencer::with_config(hub, &time_source, config);

    let program = CommandProgram::builder()
        .rotate(1)
        .and_then(|b| b.color_named("red"))
        .and_then(|b| b.color_named("light_blue"))
        .and_then(|b| b.rotate(-2))
        .map_err(|err| {
            eprintln!("bad program: {err}");
            SequencerError::NoProgramLoaded
        })?
        .build();

    println!(
        "running {} commands, about {} ms",
        program.len(),
        program.estimated_duration(&config).as_millis()
    );

    sequencer.load(program)?;
    let completed = sequencer.run(&mut ThreadDelay::new())?;
    println!("done, {completed} commands executed");

    // A long rotation, cut short by a deadline
    let program = CommandProgram::builder()
        .rotate(3)
        .map_err(|_| SequencerError::NoProgramLoaded)?
        .build();
    sequencer.load(program)?;

    let mut delay = ThreadDelay::new().with_timeout(Duration::from_millis(800));
    match sequencer.run(&mut delay) {
        Err(err) => println!("stopped early: {err} ({:?})", sequencer.state()),
        Ok(completed) => println!("finished {completed} commands before the deadline"),
    }

    Ok(())
}
