// Reads form exports saved as Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tab::io_common::excel_serial_to_datetime;
use crate::tab::io_csv::assemble_rows;
use crate::tab::*;

pub fn read_xlsx_responses(
    path: String,
    cfs: &FileSource,
    survey: &Survey,
) -> TabResult<Vec<ParsedSubmission>> {
    let wrange = get_range(&path, cfs)?;
    let header_idx = cfs.header_row_index()?;
    let lines: Vec<Vec<String>> = wrange
        .rows()
        .skip(header_idx)
        .map(|row| row.iter().map(read_cell).collect())
        .collect();
    let (header, data) = match lines.split_first() {
        Some(x) => x,
        None => whatever!("The Excel file {} has no header row", path),
    };
    debug!("read_xlsx_responses: header: {:?}", header);
    assemble_rows(&path, cfs, survey, header, data, header_idx + 1)
}

/// The text of a cell. Dates are written in RFC 3339 so that they can be read as timestamps.
fn read_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(serial) => excel_serial_to_datetime(*serial)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| serial.to_string()),
        DataType::Empty => "".to_string(),
        x => {
            warn!("read_cell: unreadable cell {:?}", x);
            "".to_string()
        }
    }
}

fn get_range(path: &String, cfs: &FileSource) -> TabResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_xlsx_responses: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path: path.clone() })?;

    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path: path.clone() }.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_xlsx_responses: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => whatever!(
                "The file {} has several worksheets: the worksheet name must be provided",
                path
            ),
        }
    }
}
