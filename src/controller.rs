use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::capture::{Batch, DisplayWindow, Sample, SessionLog};
use crate::config::{AcquisitionConfig, ConfigError};
use crate::device::{Driver, Session};
use crate::export;
use crate::sampler::{Event, Sampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Running,
    Stopping,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    AlreadyRunning,
    InvalidConfig(ConfigError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AlreadyRunning =>
                write!(f, "acquisition is already running"),
            Self::InvalidConfig(error) =>
                write!(f, "invalid configuration: {}", error),
        }
    }
}

impl std::error::Error for ControlError {}

#[derive(Debug)]
pub enum ExportError {
    AcquisitionInProgress,
    NoData,
    Sheet(rust_xlsxwriter::XlsxError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AcquisitionInProgress =>
                write!(f, "cannot export while acquisition is in progress"),
            Self::NoData =>
                write!(f, "no data to export"),
            Self::Sheet(error) =>
                write!(f, "failed to write sheet: {}", error),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sheet(error) => Some(error),
            _ => None,
        }
    }
}

/// Latest-sample view for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub time_ms: f64,
    pub voltage_a_mv: f32,
    pub voltage_b_mv: f32,
    pub total_samples: u64,
}

/// Notification delivered to the presentation layer by [`Controller::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// New samples were appended; the window and snapshot have been updated.
    BatchAcquired { samples: usize },
    /// The producer reported a device error. Acquisition winds down on its
    /// own; a `Finished` notice follows.
    Error(String),
    /// The producer has exited and the controller is idle again.
    Finished,
}

struct Worker {
    stop: Arc<AtomicBool>,
    events: Receiver<Event>,
    handle: JoinHandle<()>,
}

/// The consumer-side orchestrator. Owns the display window and the session
/// log; all writes to either go through this type, serially, so neither
/// needs locking. Reads from another thread must go through [`Snapshot`]
/// values returned here.
pub struct Controller {
    state: AcquisitionState,
    window: DisplayWindow,
    log: SessionLog,
    latest: Option<Sample>,
    total_samples: u64,
    worker: Option<Worker>,
    pending: Vec<Notice>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Controller {
        Controller {
            state: AcquisitionState::Idle,
            window: DisplayWindow::new(0),
            log: SessionLog::new(),
            latest: None,
            total_samples: 0,
            worker: None,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn window(&self) -> &DisplayWindow {
        &self.window
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.latest {
            None => Snapshot { total_samples: self.total_samples, ..Snapshot::default() },
            Some(sample) => Snapshot {
                time_ms: sample.time_ms,
                voltage_a_mv: sample.voltage_a_mv,
                voltage_b_mv: sample.voltage_b_mv,
                total_samples: self.total_samples,
            },
        }
    }

    /// Begin a new acquisition run on a fresh device session.
    ///
    /// Clears the previous run's record, resizes the display window for the
    /// new sample interval, and spawns the producer thread. Rejected with
    /// `AlreadyRunning` while a run is live; concurrent runs are never
    /// queued or silently replaced.
    pub fn start<D: Driver + 'static>(
        &mut self, driver: D, config: AcquisitionConfig,
    ) -> Result<(), ControlError> {
        if self.state != AcquisitionState::Idle {
            return Err(ControlError::AlreadyRunning);
        }
        config.validate().map_err(ControlError::InvalidConfig)?;

        self.log.clear();
        self.window.reset(config.window_capacity());
        self.latest = None;
        self.total_samples = 0;

        let (send, recv) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let session = Session::new(driver, config);
        let handle = Sampler::new(session, stop.clone(), send).run();
        self.worker = Some(Worker { stop, events: recv, handle });
        self.state = AcquisitionState::Running;
        log::info!("acquisition started, window capacity {}", self.window.capacity());
        Ok(())
    }

    /// Drain pending producer events, updating the window, log, and
    /// snapshot, and report what happened since the last call. Must be
    /// invoked periodically by the presentation layer.
    pub fn poll(&mut self) -> Vec<Notice> {
        let mut notices = std::mem::take(&mut self.pending);
        let events = match &self.worker {
            None => return notices,
            Some(worker) => worker.events.try_iter().collect::<Vec<_>>(),
        };
        for event in events {
            match event {
                Event::Batch(batch) => {
                    let samples = batch.len();
                    self.apply_batch(&batch);
                    notices.push(Notice::BatchAcquired { samples });
                }
                Event::Error(message) => {
                    log::error!("acquisition failed: {}", message);
                    self.state = AcquisitionState::Error;
                    notices.push(Notice::Error(message));
                }
                Event::Finished => {
                    self.stop();
                    notices.push(Notice::Finished);
                }
            }
        }
        notices
    }

    /// Request a cooperative stop and block until the producer thread has
    /// fully exited. No batch is delivered after this returns; batches that
    /// were already queued are applied, so none are lost. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            self.state = AcquisitionState::Idle;
            return;
        };
        self.state = AcquisitionState::Stopping;
        worker.stop.store(true, Ordering::Release);
        if worker.handle.join().is_err() {
            log::error!("acquisition thread panicked");
        }
        // the producer has exited; whatever is still queued is the tail end
        // of the run and is accounted for before going idle
        for event in worker.events.try_iter() {
            match event {
                Event::Batch(batch) => self.apply_batch(&batch),
                Event::Error(message) => {
                    // a device fault that raced the stop request; hold the
                    // message for the next poll rather than dropping it
                    log::error!("acquisition failed during stop: {}", message);
                    self.pending.push(Notice::Error(message));
                }
                Event::Finished => {}
            }
        }
        self.state = AcquisitionState::Idle;
        log::info!("acquisition stopped, {} samples total", self.total_samples);
    }

    /// Hand the full session record to the spreadsheet serializer.
    ///
    /// Read-only and repeatable: the record is left untouched whether the
    /// export succeeds or fails.
    pub fn export(&self, path: &Path) -> Result<(), ExportError> {
        if self.state != AcquisitionState::Idle {
            return Err(ExportError::AcquisitionInProgress);
        }
        if self.log.is_empty() {
            return Err(ExportError::NoData);
        }
        export::write_sheet(path, self.log.samples()).map_err(ExportError::Sheet)
    }

    // The sole mutation path into the window and the log. Samples land in
    // the log unconditionally and in arrival order; the window evicts its
    // oldest entries as needed.
    fn apply_batch(&mut self, batch: &Batch) {
        for &sample in &batch.samples {
            self.log.push(sample);
            self.window.push(sample);
        }
        if let Some(&sample) = batch.samples.last() {
            self.latest = Some(sample);
        }
        self.total_samples += batch.len() as u64;
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
