//! Mock GPIO pins for testing.
//!
//! Handles are cheap clones sharing the same backing state, so a test can
//! keep one handle for assertions while the component under test owns the
//! other. Supports scripted input levels and injected write failures. All
//! tests use these instead of real pins so the suite runs in CI on any
//! platform.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{GpioError, GpioResult};
use crate::interface::{InputPin, Level, OutputPin};

struct OutputState {
    writes: Vec<Level>,
    fail_writes: bool,
}

/// Mock output pin recording every write.
#[derive(Clone)]
pub struct MockOutputPin {
    number: u8,
    state: Arc<Mutex<OutputState>>,
}

impl MockOutputPin {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            state: Arc::new(Mutex::new(OutputState {
                writes: Vec::new(),
                fail_writes: false,
            })),
        }
    }

    /// Level currently driven (last successful write), default `Low`.
    pub fn level(&self) -> Level {
        self.state
            .lock()
            .unwrap()
            .writes
            .last()
            .copied()
            .unwrap_or(Level::Low)
    }

    /// All recorded writes, oldest first.
    pub fn writes(&self) -> Vec<Level> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Inject hardware faults: make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

impl OutputPin for MockOutputPin {
    fn write(&mut self, level: Level) -> GpioResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(GpioError::Write {
                pin: self.number,
                reason: "injected failure".into(),
            });
        }
        state.writes.push(level);
        Ok(())
    }

    fn pin(&self) -> u8 {
        self.number
    }
}

struct InputState {
    script: VecDeque<Level>,
    level: Level,
    fail_reads: bool,
}

/// Mock input pin with a scripted level sequence.
///
/// `read` consumes scripted levels in FIFO order; once the script is
/// exhausted it keeps returning the last level (initially `High`, the
/// idle level of a pulled-up button).
#[derive(Clone)]
pub struct MockInputPin {
    number: u8,
    state: Arc<Mutex<InputState>>,
}

impl MockInputPin {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            state: Arc::new(Mutex::new(InputState {
                script: VecDeque::new(),
                level: Level::High,
                fail_reads: false,
            })),
        }
    }

    /// Set the level returned by subsequent reads (clears nothing queued).
    pub fn set_level(&self, level: Level) {
        self.state.lock().unwrap().level = level;
    }

    /// Queue a sequence of levels to be returned by the next reads.
    pub fn push_script(&self, levels: &[Level]) {
        self.state.lock().unwrap().script.extend(levels.iter().copied());
    }

    /// Inject hardware faults: make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }
}

impl InputPin for MockInputPin {
    fn read(&self) -> GpioResult<Level> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(GpioError::Read {
                pin: self.number,
                reason: "injected failure".into(),
            });
        }
        if let Some(next) = state.script.pop_front() {
            state.level = next;
        }
        Ok(state.level)
    }

    fn pin(&self) -> u8 {
        self.number
    }
}
