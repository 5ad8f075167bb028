use std::f32::consts::PI;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use picostream::{
    AcquisitionConfig, Channel, Controller, Coupling, Driver, DriverFault, Notice,
    Overflow, Range, FULL_SCALE_CODE, POLL_INTERVAL,
};

const CHUNK: usize = 1000;
const RUN_FOR: Duration = Duration::from_millis(500);
const FILENAME: &str = "capture.xlsx";

/// Simulated unit producing a 1 kHz sine on channel A and a 2.5 kHz sine
/// at half amplitude on channel B.
struct SineDriver {
    interval_us: u32,
    phase: f32,
}

impl SineDriver {
    fn new() -> SineDriver {
        SineDriver { interval_us: 10, phase: 0.0 }
    }
}

impl Driver for SineDriver {
    fn open(&mut self) -> Result<(), DriverFault> {
        Ok(())
    }

    fn set_channel(&mut self, _: Channel, _: bool, _: Coupling, _: Range)
                   -> Result<(), DriverFault> {
        Ok(())
    }

    fn run_streaming(&mut self, interval_us: u32, _: u32, _: usize)
                     -> Result<(), DriverFault> {
        self.interval_us = interval_us;
        Ok(())
    }

    fn get_values(&mut self, channel_a: &mut [i16], channel_b: &mut [i16])
                  -> Result<(usize, Overflow), DriverFault> {
        let step = 2.0 * PI * 1000.0 * self.interval_us as f32 * 1e-6;
        let count = CHUNK.min(channel_a.len());
        for index in 0..count {
            let scale = FULL_SCALE_CODE as f32;
            channel_a[index] = (self.phase.sin() * scale * 0.8) as i16;
            channel_b[index] = ((self.phase * 2.5).sin() * scale * 0.4) as i16;
            self.phase = (self.phase + step) % (2.0 * PI);
        }
        Ok((count, Overflow::empty()))
    }

    fn stop(&mut self) -> Result<(), DriverFault> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverFault> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut controller = Controller::new();
    controller.start(SineDriver::new(), AcquisitionConfig::default())?;

    let started = Instant::now();
    while started.elapsed() < RUN_FOR {
        for notice in controller.poll() {
            match notice {
                Notice::BatchAcquired { .. } => {
                    let snapshot = controller.snapshot();
                    println!("t = {:9.2} ms   A = {:8.2} mV   B = {:8.2} mV   ({} samples)",
                        snapshot.time_ms, snapshot.voltage_a_mv,
                        snapshot.voltage_b_mv, snapshot.total_samples);
                }
                Notice::Error(message) => eprintln!("error: {}", message),
                Notice::Finished => println!("acquisition finished"),
            }
        }
        // drain at the same cadence the producer fills
        thread::sleep(POLL_INTERVAL);
    }
    controller.stop();

    controller.export(Path::new(FILENAME))?;
    println!("saved {} samples to {}", controller.snapshot().total_samples, FILENAME);
    Ok(())
}
