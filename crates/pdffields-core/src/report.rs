//! CSV and XLSX batch reports.

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use tracing::debug;

use crate::error::ReportError;
use crate::models::results::{REPORT_HEADERS, ReportRow};

const MAX_COLUMN_WIDTH: usize = 60;

/// Write `rows` as `;`-separated UTF-8 with CRLF line endings.
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .from_path(path)?;

    wtr.write_record(REPORT_HEADERS)?;
    for row in rows {
        wtr.write_record(row.columns())?;
    }
    wtr.flush().map_err(csv::Error::from)?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write `rows` to a single-sheet workbook with a bold, centered header.
pub fn write_xlsx(path: &Path, sheet_name: &str, rows: &[ReportRow]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in REPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, value) in row.columns().iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row_num, col as u16, *value)?;
            }
        }
    }

    for (col, width) in column_widths(rows).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    workbook.save(path)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Longest cell (header included) plus 2, capped at 60.
fn column_widths(rows: &[ReportRow]) -> [usize; 3] {
    let mut widths = REPORT_HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row.columns()) {
            *width = (*width).max(value.chars().count());
        }
    }
    widths.map(|w| (w + 2).min(MAX_COLUMN_WIDTH))
}
