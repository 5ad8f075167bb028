//! Spreadsheet serialization of a completed session record.

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};

use crate::capture::Sample;

const SHEET_NAME: &str = "Capture Data";
const HEADER: [&str; 3] = [
    "Time (ms)",
    "Voltage Channel A (mV)",
    "Voltage Channel B (mV)",
];

/// Write the samples to a single-sheet workbook at `path`, one row per
/// sample in the given order, under a bold header row. Columns are sized
/// to their content; an existing file at `path` is overwritten.
pub fn write_sheet(path: &Path, samples: &[Sample]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    for (column, title) in HEADER.iter().enumerate() {
        worksheet.write_with_format(0, column as u16, *title, &header_format)?;
    }

    for (index, sample) in samples.iter().enumerate() {
        let row = (index + 1) as u32;
        worksheet.write(row, 0, sample.time_ms)?;
        worksheet.write(row, 1, sample.voltage_a_mv as f64)?;
        worksheet.write(row, 2, sample.voltage_b_mv as f64)?;
    }

    worksheet.autofit();
    workbook.save(path)?;
    log::info!("saved {} samples to {}", samples.len(), path.display());
    Ok(())
}
