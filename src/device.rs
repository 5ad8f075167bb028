use std::fmt;

use crate::capture::{Batch, Overflow, Sample};
use crate::config::{AcquisitionConfig, Channel, Coupling};
use crate::units::{self, Range};

/// Failure reported by the vendor driver. The driver's own reporting
/// convention (return code or raised fault) is adapted into this type at
/// the trait boundary and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFault(pub String);

impl fmt::Display for DriverFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DriverFault {}

/// Raw hardware access, as exposed by the vendor driver for one unit.
///
/// `get_values` fills the two channel buffers with however many samples the
/// device has accumulated, up to the buffer length, and returns that count
/// together with the overflow flags. A zero count is the expected outcome
/// of most poll cycles, not a failure.
pub trait Driver: Send {
    fn open(&mut self) -> Result<(), DriverFault>;
    fn set_channel(&mut self, channel: Channel, enabled: bool,
                   coupling: Coupling, range: Range) -> Result<(), DriverFault>;
    fn run_streaming(&mut self, interval_us: u32, oversampling: u32,
                     max_samples: usize) -> Result<(), DriverFault>;
    fn get_values(&mut self, channel_a: &mut [i16], channel_b: &mut [i16])
                  -> Result<(usize, Overflow), DriverFault>;
    fn stop(&mut self) -> Result<(), DriverFault>;
    fn close(&mut self) -> Result<(), DriverFault>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    OpenFailed(DriverFault),
    ChannelConfigFailed(DriverFault),
    NotConnected,
    StreamStartFailed(DriverFault),
    FetchFailed(DriverFault),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OpenFailed(fault) =>
                write!(f, "failed to open device: {}", fault),
            Self::ChannelConfigFailed(fault) =>
                write!(f, "failed to configure channel: {}", fault),
            Self::NotConnected =>
                write!(f, "device not connected"),
            Self::StreamStartFailed(fault) =>
                write!(f, "failed to start streaming: {}", fault),
            Self::FetchFailed(fault) =>
                write!(f, "failed to fetch samples: {}", fault),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OpenFailed(fault) |
            Self::ChannelConfigFailed(fault) |
            Self::StreamStartFailed(fault) |
            Self::FetchFailed(fault) => Some(fault),
            Self::NotConnected => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Connected,
    Streaming,
}

/// Owns the hardware handle for one acquisition run and sequences driver
/// calls through the `Closed -> Connected -> Streaming -> Closed` lifecycle.
#[derive(Debug)]
pub struct Session<D: Driver> {
    driver: D,
    config: AcquisitionConfig,
    state: State,
    raw_a: Vec<i16>,
    raw_b: Vec<i16>,
    total_acquired: u64,
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D, config: AcquisitionConfig) -> Session<D> {
        let max_samples = config.max_samples_per_fetch;
        Session {
            driver,
            config,
            state: State::Closed,
            raw_a: vec![0; max_samples],
            raw_b: vec![0; max_samples],
            total_acquired: 0,
        }
    }

    /// Total number of samples fetched since the session was created.
    pub fn total_acquired(&self) -> u64 {
        self.total_acquired
    }

    /// Open the unit and configure both channels with the configured range.
    /// On any failure the handle is closed again; a failed connect never
    /// leaves the unit open.
    pub fn connect(&mut self) -> Result<(), DeviceError> {
        self.driver.open().map_err(DeviceError::OpenFailed)?;
        self.state = State::Connected;
        for channel in [Channel::A, Channel::B] {
            let result = self.driver.set_channel(
                channel, true, Coupling::DC, self.config.range);
            if let Err(fault) = result {
                self.stop_and_close();
                return Err(DeviceError::ChannelConfigFailed(fault));
            }
        }
        log::info!("connected, both channels at range {:?}", self.config.range);
        Ok(())
    }

    pub fn start_streaming(&mut self) -> Result<(), DeviceError> {
        if self.state != State::Connected {
            return Err(DeviceError::NotConnected);
        }
        self.driver
            .run_streaming(
                self.config.sample_interval_us,
                self.config.oversampling,
                self.config.max_samples_per_fetch)
            .map_err(DeviceError::StreamStartFailed)?;
        self.state = State::Streaming;
        log::info!("streaming started, interval {} us", self.config.sample_interval_us);
        Ok(())
    }

    /// Fetch whatever the device has accumulated since the previous call.
    ///
    /// Returns an empty batch when no new samples are available. Each sample
    /// is stamped with `running_sample_index * sample_interval`, so time
    /// offsets are monotonic across batch boundaries.
    pub fn fetch(&mut self) -> Result<Batch, DeviceError> {
        if self.state != State::Streaming {
            return Err(DeviceError::NotConnected);
        }
        let (count, overflow) = self.driver
            .get_values(&mut self.raw_a, &mut self.raw_b)
            .map_err(DeviceError::FetchFailed)?;
        debug_assert!(count <= self.config.max_samples_per_fetch);
        let interval_ms = self.config.sample_interval_ms();
        let range = self.config.range;
        let samples = (0..count)
            .map(|index| Sample {
                time_ms: (self.total_acquired + index as u64) as f64 * interval_ms,
                voltage_a_mv: units::to_millivolts(
                    self.raw_a[index], range, units::FULL_SCALE_CODE),
                voltage_b_mv: units::to_millivolts(
                    self.raw_b[index], range, units::FULL_SCALE_CODE),
            })
            .collect();
        self.total_acquired += count as u64;
        if !overflow.is_empty() {
            log::warn!("overflow reported on {:?}", overflow);
        }
        Ok(Batch { samples, overflow })
    }

    /// Stop streaming if streaming, close the handle if open. Idempotent.
    /// Driver errors during teardown are logged and swallowed; teardown
    /// must always run to completion.
    pub fn stop_and_close(&mut self) {
        if self.state == State::Streaming {
            if let Err(fault) = self.driver.stop() {
                log::warn!("ignoring driver error during stop: {}", fault);
            }
        }
        if self.state != State::Closed {
            if let Err(fault) = self.driver.close() {
                log::warn!("ignoring driver error during close: {}", fault);
            }
            log::info!("device closed");
        }
        self.state = State::Closed;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Scripted driver: plays back a fixed sequence of fetch outcomes and
    /// records the calls it receives.
    struct ScriptedDriver {
        fail_open: bool,
        fail_channel: bool,
        fail_streaming: bool,
        fetches: Vec<Result<(Vec<i16>, Vec<i16>, Overflow), DriverFault>>,
        calls: Vec<&'static str>,
    }

    impl ScriptedDriver {
        fn new() -> ScriptedDriver {
            ScriptedDriver {
                fail_open: false,
                fail_channel: false,
                fail_streaming: false,
                fetches: Vec::new(),
                calls: Vec::new(),
            }
        }
    }

    impl Driver for ScriptedDriver {
        fn open(&mut self) -> Result<(), DriverFault> {
            self.calls.push("open");
            if self.fail_open {
                return Err(DriverFault("unit not found".into()));
            }
            Ok(())
        }

        fn set_channel(&mut self, _channel: Channel, _enabled: bool,
                       _coupling: Coupling, _range: Range) -> Result<(), DriverFault> {
            self.calls.push("set_channel");
            if self.fail_channel {
                return Err(DriverFault("bad channel".into()));
            }
            Ok(())
        }

        fn run_streaming(&mut self, _interval_us: u32, _oversampling: u32,
                         _max_samples: usize) -> Result<(), DriverFault> {
            self.calls.push("run_streaming");
            if self.fail_streaming {
                return Err(DriverFault("streaming rejected".into()));
            }
            Ok(())
        }

        fn get_values(&mut self, channel_a: &mut [i16], channel_b: &mut [i16])
                      -> Result<(usize, Overflow), DriverFault> {
            self.calls.push("get_values");
            if self.fetches.is_empty() {
                return Ok((0, Overflow::empty()));
            }
            let (raw_a, raw_b, overflow) = self.fetches.remove(0)?;
            channel_a[..raw_a.len()].copy_from_slice(&raw_a);
            channel_b[..raw_b.len()].copy_from_slice(&raw_b);
            Ok((raw_a.len(), overflow))
        }

        fn stop(&mut self) -> Result<(), DriverFault> {
            self.calls.push("stop");
            Ok(())
        }

        fn close(&mut self) -> Result<(), DriverFault> {
            self.calls.push("close");
            Ok(())
        }
    }

    fn config() -> AcquisitionConfig {
        AcquisitionConfig { range: Range::V5, ..AcquisitionConfig::default() }
    }

    #[test]
    fn test_connect_configures_both_channels() {
        let mut session = Session::new(ScriptedDriver::new(), config());
        session.connect().unwrap();
        assert_eq!(session.driver.calls, ["open", "set_channel", "set_channel"]);
    }

    #[test]
    fn test_connect_open_failure() {
        let mut driver = ScriptedDriver::new();
        driver.fail_open = true;
        let mut session = Session::new(driver, config());
        assert!(matches!(session.connect(), Err(DeviceError::OpenFailed(_))));
    }

    #[test]
    fn test_connect_channel_failure_closes_handle() {
        let mut driver = ScriptedDriver::new();
        driver.fail_channel = true;
        let mut session = Session::new(driver, config());
        assert!(matches!(session.connect(),
            Err(DeviceError::ChannelConfigFailed(_))));
        // no lingering open handle after a failed connect
        assert_eq!(*session.driver.calls.last().unwrap(), "close");
    }

    #[test]
    fn test_streaming_requires_connected() {
        let mut session = Session::new(ScriptedDriver::new(), config());
        assert_eq!(session.start_streaming(), Err(DeviceError::NotConnected));
        assert_eq!(session.fetch().unwrap_err(), DeviceError::NotConnected);
    }

    #[test]
    fn test_stream_start_failure() {
        let mut driver = ScriptedDriver::new();
        driver.fail_streaming = true;
        let mut session = Session::new(driver, config());
        session.connect().unwrap();
        assert!(matches!(session.start_streaming(),
            Err(DeviceError::StreamStartFailed(_))));
    }

    #[test]
    fn test_fetch_converts_and_stamps_time() {
        // +-5 V range: codes [0, 16384, 32767] map to [0, ~2500, 5000] mV,
        // time offsets advance by one 10 us interval per sample
        let mut driver = ScriptedDriver::new();
        driver.fetches.push(Ok((
            vec![0, 16384, 32767],
            vec![0, -16384, -32767],
            Overflow::empty(),
        )));
        let mut session = Session::new(driver, config());
        session.connect().unwrap();
        session.start_streaming().unwrap();

        let batch = session.fetch().unwrap();
        assert_eq!(batch.len(), 3);
        let times = batch.samples.iter().map(|s| s.time_ms).collect::<Vec<_>>();
        assert_eq!(times, [0.0, 0.01, 0.02]);
        assert_eq!(batch.samples[0].voltage_a_mv, 0.0);
        assert!((batch.samples[1].voltage_a_mv - 2500.0).abs() < 0.5);
        assert!((batch.samples[2].voltage_a_mv - 5000.0).abs() < 0.01);
        assert!((batch.samples[2].voltage_b_mv + 5000.0).abs() < 0.01);

        // the next batch continues from the running sample count
        let batch = session.fetch().unwrap();
        assert!(batch.is_empty());
        assert_eq!(session.total_acquired(), 3);
    }

    #[test]
    fn test_fetch_surfaces_overflow_as_flag() {
        let mut driver = ScriptedDriver::new();
        driver.fetches.push(Ok((vec![1], vec![1], Overflow::CHANNEL_B)));
        let mut session = Session::new(driver, config());
        session.connect().unwrap();
        session.start_streaming().unwrap();
        let batch = session.fetch().unwrap();
        assert_eq!(batch.overflow, Overflow::CHANNEL_B);
    }

    #[test]
    fn test_fetch_failure() {
        let mut driver = ScriptedDriver::new();
        driver.fetches.push(Err(DriverFault("usb gone".into())));
        let mut session = Session::new(driver, config());
        session.connect().unwrap();
        session.start_streaming().unwrap();
        assert!(matches!(session.fetch(), Err(DeviceError::FetchFailed(_))));
    }

    #[test]
    fn test_stop_and_close_idempotent() {
        let mut session = Session::new(ScriptedDriver::new(), config());
        session.connect().unwrap();
        session.start_streaming().unwrap();
        session.stop_and_close();
        session.stop_and_close();
        let teardown_calls = session.driver.calls.iter()
            .filter(|&&call| call == "stop" || call == "close")
            .count();
        assert_eq!(teardown_calls, 2); // one stop, one close
    }
}
