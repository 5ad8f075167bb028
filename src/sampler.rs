use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::Batch;
use crate::device::{Driver, Session};

/// Delay between poll cycles. A throttle to keep empty polls from spinning
/// the CPU, not a correctness requirement.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Signals crossing from the producer thread to the consumer. `Finished` is
/// terminal and is sent exactly once, on every exit path.
#[derive(Debug)]
pub enum Event {
    Batch(Batch),
    Error(String),
    Finished,
}

/// The producer half of the pipeline: polls the device session on its own
/// thread and emits events into the consumer's channel until asked to stop
/// or until the device fails.
pub struct Sampler<D: Driver> {
    session: Session<D>,
    stop: Arc<AtomicBool>,
    events: Sender<Event>,
}

impl<D: Driver + 'static> Sampler<D> {
    pub fn new(
        session: Session<D>,
        stop: Arc<AtomicBool>,
        events: Sender<Event>,
    ) -> Sampler<D> {
        Sampler { session, stop, events }
    }

    pub fn run(self) -> JoinHandle<()> {
        thread::spawn(move || self.acquire())
    }

    fn acquire(mut self) {
        let failure = self.connect_and_poll();
        // teardown runs exactly once, before any terminal signal, so the
        // consumer never observes a signal while the handle is still open
        self.session.stop_and_close();
        if let Some(message) = failure {
            let _ = self.events.send(Event::Error(message));
        }
        let _ = self.events.send(Event::Finished);
        log::debug!("sampler: done");
    }

    fn connect_and_poll(&mut self) -> Option<String> {
        if let Err(error) = self.session.connect() {
            log::error!("sampler: connect failed: {}", error);
            return Some(error.to_string());
        }
        if let Err(error) = self.session.start_streaming() {
            log::error!("sampler: streaming start failed: {}", error);
            return Some(error.to_string());
        }
        // the stop flag is checked only at the top of the cycle; an
        // in-flight fetch always completes before the loop winds down
        while !self.stop.load(Ordering::Acquire) {
            match self.session.fetch() {
                Ok(batch) if batch.is_empty() => {}
                Ok(batch) => {
                    log::debug!("sampler: acquired {} samples", batch.len());
                    if self.events.send(Event::Batch(batch)).is_err() {
                        // consumer went away; nothing left to produce for
                        break;
                    }
                }
                Err(error) => {
                    log::error!("sampler: fetch failed: {}", error);
                    return Some(error.to_string());
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
        None
    }
}
