//! Captured sample storage: the bounded display window and the unbounded
//! session record.

use std::collections::VecDeque;

bitflags::bitflags! {
    /// Overvoltage indication reported by the driver alongside a fetch,
    /// one bit per channel. Non-fatal; the affected samples are clipped
    /// to full scale by the hardware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Overflow: u8 {
        const CHANNEL_A = 1 << 0;
        const CHANNEL_B = 1 << 1;
    }
}

/// One converted sample. `time_ms` is a running offset derived from the
/// sample count and the configured interval, not a wall-clock timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_ms: f64,
    pub voltage_a_mv: f32,
    pub voltage_b_mv: f32,
}

/// One fetch cycle's worth of newly available samples. Consecutive batches
/// of a session partition its samples contiguously, without gaps or overlap.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub samples: Vec<Sample>,
    pub overflow: Overflow,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Fixed-capacity, time-ordered window over the most recent samples,
/// sized to hold exactly the configured display duration. Once full, each
/// insertion evicts the oldest sample.
///
/// The three columns always have the same length at any observable instant.
#[derive(Debug)]
pub struct DisplayWindow {
    capacity: usize,
    time: VecDeque<f64>,
    channel_a: VecDeque<f32>,
    channel_b: VecDeque<f32>,
}

impl DisplayWindow {
    pub fn new(capacity: usize) -> DisplayWindow {
        DisplayWindow {
            capacity,
            time: VecDeque::with_capacity(capacity),
            channel_a: VecDeque::with_capacity(capacity),
            channel_b: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Discard all contents and adopt a new capacity. Used at the start of
    /// a run, where a changed sample interval changes the sample count that
    /// covers the same wall-clock window.
    pub fn reset(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.time.clear();
        self.channel_a.clear();
        self.channel_b.clear();
    }

    pub fn push(&mut self, sample: Sample) {
        // a window shorter than one sample interval has no room at all
        if self.capacity == 0 {
            return;
        }
        while self.time.len() >= self.capacity {
            self.time.pop_front();
            self.channel_a.pop_front();
            self.channel_b.pop_front();
        }
        self.time.push_back(sample.time_ms);
        self.channel_a.push_back(sample.voltage_a_mv);
        self.channel_b.push_back(sample.voltage_b_mv);
    }

    pub fn time(&self) -> impl Iterator<Item = f64> + '_ {
        self.time.iter().copied()
    }

    pub fn channel_a(&self) -> impl Iterator<Item = f32> + '_ {
        self.channel_a.iter().copied()
    }

    pub fn channel_b(&self) -> impl Iterator<Item = f32> + '_ {
        self.channel_b.iter().copied()
    }

    pub fn latest(&self) -> Option<Sample> {
        Some(Sample {
            time_ms: *self.time.back()?,
            voltage_a_mv: *self.channel_a.back()?,
            voltage_b_mv: *self.channel_b.back()?,
        })
    }
}

/// The full ordered record of every sample accepted since the start of the
/// current run. Cleared exactly once per run, at its start; never truncated
/// while the run is live.
#[derive(Debug, Default)]
pub struct SessionLog {
    samples: Vec<Sample>,
}

impl SessionLog {
    pub fn new() -> SessionLog {
        SessionLog::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}
