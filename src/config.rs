//! Configuration of one acquisition run.

use std::fmt;

use crate::units::{InvalidRangeCode, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coupling {
    #[default]
    DC,
    AC,
}

/// Rejected user input for an acquisition parameter, naming the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NotAnInteger { field: &'static str },
    NotPositive { field: &'static str },
    InvalidRange(InvalidRangeCode),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotAnInteger { field } =>
                write!(f, "{}: expected an integer", field),
            Self::NotPositive { field } =>
                write!(f, "{}: expected a positive integer", field),
            Self::InvalidRange(error) =>
                write!(f, "channel_range_code: {}", error),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<InvalidRangeCode> for ConfigError {
    fn from(error: InvalidRangeCode) -> Self {
        Self::InvalidRange(error)
    }
}

/// Parameters of one acquisition run. Immutable once the run has started;
/// a new run takes a new configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionConfig {
    /// Time between consecutive samples, in microseconds.
    pub sample_interval_us: u32,
    /// Upper bound on the number of samples one fetch may return.
    pub max_samples_per_fetch: usize,
    pub oversampling: u32,
    /// Input span applied to both channels.
    pub range: Range,
    /// Wall-clock duration of history kept for the real-time display,
    /// in milliseconds. Independent of the full session record.
    pub display_window_ms: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            sample_interval_us: 10,
            max_samples_per_fetch: 50_000,
            oversampling: 1,
            range: Range::V10,
            display_window_ms: 200.0,
        }
    }
}

impl AcquisitionConfig {
    /// Build a configuration from raw text fields, as entered by a user.
    pub fn parse(
        sample_interval_us: &str,
        max_samples_per_fetch: &str,
        oversampling: &str,
        channel_range_code: &str,
    ) -> Result<AcquisitionConfig, ConfigError> {
        fn integer<T: std::str::FromStr>(
            text: &str, field: &'static str
        ) -> Result<T, ConfigError> {
            text.trim().parse().map_err(|_| ConfigError::NotAnInteger { field })
        }

        let config = AcquisitionConfig {
            sample_interval_us:
                integer(sample_interval_us, "sample_interval_us")?,
            max_samples_per_fetch:
                integer(max_samples_per_fetch, "max_samples_per_fetch")?,
            oversampling:
                integer(oversampling, "oversampling")?,
            range:
                Range::from_code(integer(channel_range_code, "channel_range_code")?)?,
            ..AcquisitionConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_us == 0 {
            return Err(ConfigError::NotPositive { field: "sample_interval_us" });
        }
        if self.max_samples_per_fetch == 0 {
            return Err(ConfigError::NotPositive { field: "max_samples_per_fetch" });
        }
        if self.oversampling == 0 {
            return Err(ConfigError::NotPositive { field: "oversampling" });
        }
        if !(self.display_window_ms > 0.0) {
            return Err(ConfigError::NotPositive { field: "display_window_ms" });
        }
        Ok(())
    }

    /// One sample interval expressed in milliseconds.
    pub fn sample_interval_ms(&self) -> f64 {
        self.sample_interval_us as f64 * 1e-3
    }

    /// Number of samples the display window holds at this sample interval.
    /// Must be recomputed whenever the interval changes, or the same capacity
    /// would represent a different wall-clock duration.
    pub fn window_capacity(&self) -> usize {
        (self.display_window_ms / self.sample_interval_ms()) as usize
    }
}
