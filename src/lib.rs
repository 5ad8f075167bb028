mod units;
mod config;
mod capture;
mod device;
mod sampler;
mod controller;
mod export;

pub use units::{
    Range,
    InvalidRangeCode,
    to_millivolts,
    FULL_SCALE_CODE,
};

pub use config::{
    Channel,
    Coupling,
    AcquisitionConfig,
    ConfigError,
};

pub use capture::{
    Sample,
    Batch,
    Overflow,
    DisplayWindow,
    SessionLog,
};

pub use device::{
    Driver,
    DriverFault,
    Session,
    DeviceError,
};

pub use sampler::{
    Event,
    Sampler,
    POLL_INTERVAL,
};

pub use controller::{
    AcquisitionState,
    Snapshot,
    Notice,
    Controller,
    ControlError,
    ExportError,
};

pub use export::write_sheet;
