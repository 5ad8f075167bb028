//! Conversion of raw device sample codes to physical units.

use std::fmt;

/// The device reports samples as signed 16-bit codes where this value
/// corresponds to positive full scale of the selected input range.
pub const FULL_SCALE_CODE: i16 = 32767;

/// Input voltage span of a channel, selected by a device-defined range code.
///
/// The code assignment follows the ps2000 driver: code 0 is the narrowest
/// span (±10 mV), code 11 the widest (±50 V).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    Mv10,
    Mv20,
    Mv50,
    Mv100,
    Mv200,
    Mv500,
    V1,
    V2,
    V5,
    V10,
    V20,
    V50,
}

/// Returned for a range code the device does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRangeCode(pub u8);

impl fmt::Display for InvalidRangeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid channel range code {}", self.0)
    }
}

impl std::error::Error for InvalidRangeCode {}

impl Range {
    pub fn from_code(code: u8) -> Result<Range, InvalidRangeCode> {
        match code {
            0  => Ok(Range::Mv10),
            1  => Ok(Range::Mv20),
            2  => Ok(Range::Mv50),
            3  => Ok(Range::Mv100),
            4  => Ok(Range::Mv200),
            5  => Ok(Range::Mv500),
            6  => Ok(Range::V1),
            7  => Ok(Range::V2),
            8  => Ok(Range::V5),
            9  => Ok(Range::V10),
            10 => Ok(Range::V20),
            11 => Ok(Range::V50),
            _  => Err(InvalidRangeCode(code)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Range::Mv10  => 0,
            Range::Mv20  => 1,
            Range::Mv50  => 2,
            Range::Mv100 => 3,
            Range::Mv200 => 4,
            Range::Mv500 => 5,
            Range::V1    => 6,
            Range::V2    => 7,
            Range::V5    => 8,
            Range::V10   => 9,
            Range::V20   => 10,
            Range::V50   => 11,
        }
    }

    /// Full-scale span of this range in millivolts.
    pub fn millivolts(self) -> f32 {
        match self {
            Range::Mv10  => 10.0,
            Range::Mv20  => 20.0,
            Range::Mv50  => 50.0,
            Range::Mv100 => 100.0,
            Range::Mv200 => 200.0,
            Range::Mv500 => 500.0,
            Range::V1    => 1_000.0,
            Range::V2    => 2_000.0,
            Range::V5    => 5_000.0,
            Range::V10   => 10_000.0,
            Range::V20   => 20_000.0,
            Range::V50   => 50_000.0,
        }
    }
}

/// Convert a raw sample code to millivolts by linear scaling.
///
/// `full_scale` is the code the device reports at positive full scale,
/// normally [`FULL_SCALE_CODE`]. The mapping is exact at zero and linear
/// everywhere: `to_millivolts(0, ..) == 0.0`, and doubling the raw code
/// doubles the result (absent clipping in the device itself).
pub fn to_millivolts(raw: i16, range: Range, full_scale: i16) -> f32 {
    raw as f32 * range.millivolts() / full_scale as f32
}
