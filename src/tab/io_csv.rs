// Reads form exports saved as CSV files.

use std::fs::File;

use crate::tab::io_common::*;
use crate::tab::*;

pub fn read_csv_responses(
    path: String,
    cfs: &FileSource,
    survey: &Survey,
) -> TabResult<Vec<ParsedSubmission>> {
    let (records, header_idx) = get_records(&path, cfs)?;
    let lines: Vec<Vec<String>> = records
        .enumerate()
        .map(|(idx, line_r)| -> TabResult<Vec<String>> {
            let lineno = idx + header_idx + 1;
            let line = line_r.context(CsvLineParseSnafu { lineno })?;
            Ok(line.iter().map(|s| s.to_string()).collect())
        })
        .collect::<TabResult<Vec<Vec<String>>>>()?;
    let (header, data) = match lines.split_first() {
        Some(x) => x,
        None => whatever!("The CSV file {} has no header row", path),
    };
    debug!("read_csv_responses: header: {:?}", header);
    assemble_rows(&path, cfs, survey, header, data, header_idx + 1)
}

/// Turns the lines that follow the header into submissions.
/// `first_lineno` is the 1-based line number of the header.
pub fn assemble_rows(
    path: &str,
    cfs: &FileSource,
    survey: &Survey,
    header: &[String],
    data: &[Vec<String>],
    first_lineno: usize,
) -> TabResult<Vec<ParsedSubmission>> {
    let default_id = make_default_id(path);
    let id_idx_o = cfs.id_column_index_int()?;
    let ts_idx_o = cfs.timestamp_column_index_int()?;
    let targets = map_header_row(survey, header, &[id_idx_o, ts_idx_o]);

    let mut res: Vec<ParsedSubmission> = Vec::new();
    for (idx, line) in data.iter().enumerate() {
        let lineno = first_lineno + idx + 1;
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("assemble_rows: skipping empty line {}", lineno);
            continue;
        }
        let id = match id_idx_o.and_then(|i| line.get(i)) {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => default_id(lineno),
        };
        let submitted_at = match ts_idx_o.and_then(|i| line.get(i)) {
            Some(s) if !s.trim().is_empty() => Some(parse_timestamp(s)?),
            _ => None,
        };
        let respondent = Respondent {
            name: find_cell(&targets, line, &ColumnTarget::Name).map(|s| s.to_string()),
            email: find_cell(&targets, line, &ColumnTarget::Email).map(|s| s.to_string()),
        };
        res.push(ParsedSubmission {
            id,
            submitted_at,
            respondent,
            answers: assemble_cells(&targets, line),
        });
    }
    Ok(res)
}

fn get_records(path: &str, cfs: &FileSource) -> TabResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let header_row = cfs.header_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..header_row {
        _ = records.next();
    }
    Ok((records, header_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn survey() -> Survey {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let mut b = SurveyBuilder::new("s1", "Lunch", start, end).unwrap();
        b.add_multiple("Sides", &["Fries", "Salad", "Rice"], true)
            .unwrap();
        b.add_matrix_mul("Rate the service", &["Speed"], &["Bad", "Good"], false)
            .unwrap();
        b.build().unwrap()
    }

    fn line(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_to_submissions() {
        let s = survey();
        let mut cfs = FileSource::new("csv", "r.csv");
        cfs.id_column_index = Some(serde_json::json!(1));
        let header = line(&["id", "Sides", "Rate the service [Speed]", "name"]);
        let data = vec![
            line(&["a1", "Fries; Rice", "Good", "Ann"]),
            line(&["", "", "", ""]),
            line(&["", "Salad", "", ""]),
        ];
        let res = assemble_rows("/tmp/r.csv", &cfs, &s, &header, &data, 1).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].id, "a1");
        assert_eq!(res[0].respondent.name, Some("Ann".to_string()));
        assert_eq!(res[1].id, "r.csv-00000004");

        let inputs = resolve_submission(&s, &res[0], cfs.multiple_delimiter()).unwrap();
        let sides = s.questions()[0].id;
        match inputs.get(&sides) {
            Some(RawAnswer::Multiple(sel)) => assert_eq!(sel.len(), 2),
            x => panic!("unexpected {:?}", x),
        }
        let partial: HashMap<QuestionId, RawAnswer> =
            resolve_submission(&s, &res[1], ";").unwrap();
        assert_eq!(partial.len(), 2);
    }

    #[test]
    fn unknown_label() {
        let s = survey();
        let cfs = FileSource::new("csv", "r.csv");
        let header = line(&["Sides"]);
        let data = vec![line(&["Soup"])];
        let res = assemble_rows("r.csv", &cfs, &s, &header, &data, 1).unwrap();
        assert_eq!(
            resolve_submission(&s, &res[0], ";"),
            Err(Rejection::UnknownLabel {
                question: s.questions()[0].id,
                label: "Soup".to_string()
            })
        );
    }
}
