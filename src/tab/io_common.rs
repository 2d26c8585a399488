// Primitives shared by the spreadsheet readers.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;

use survey_stats::{QuestionId, QuestionKind, Survey};

use crate::tab::{ParsedAnswer, ParsingDateSnafu, TabResult};
use snafu::prelude::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// What a column of a spreadsheet holds.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ColumnTarget {
    Answer {
        question: QuestionId,
        row: Option<String>,
    },
    Name,
    Email,
    Ignored,
}

/// Splits a header of the form "Question text [Row label]".
fn split_matrix_header(header: &str) -> Option<(&str, &str)> {
    let h = header.trim();
    let stripped = h.strip_suffix(']')?;
    let open = stripped.rfind('[')?;
    Some((stripped[..open].trim(), stripped[open + 1..].trim()))
}

fn map_header(survey: &Survey, header: &str) -> ColumnTarget {
    let h = header.trim();
    if h.eq_ignore_ascii_case("name") || h.eq_ignore_ascii_case("respondent_name") {
        return ColumnTarget::Name;
    }
    if h.eq_ignore_ascii_case("email") || h.eq_ignore_ascii_case("respondent_email") {
        return ColumnTarget::Email;
    }
    let is_matrix = |kind: &QuestionKind| kind.grid().is_some();
    if let Some(q) = survey
        .questions()
        .iter()
        .find(|q| q.text.trim() == h && !is_matrix(&q.kind))
    {
        return ColumnTarget::Answer {
            question: q.id,
            row: None,
        };
    }
    if let Some((text, row)) = split_matrix_header(h) {
        if let Some(q) = survey
            .questions()
            .iter()
            .find(|q| q.text.trim() == text && is_matrix(&q.kind))
        {
            return ColumnTarget::Answer {
                question: q.id,
                row: Some(row.to_string()),
            };
        }
    }
    ColumnTarget::Ignored
}

/// Maps every column of the header row to its meaning for the survey.
/// The id and timestamp columns are ignored here.
pub fn map_header_row(
    survey: &Survey,
    headers: &[String],
    skipped: &[Option<usize>],
) -> Vec<ColumnTarget> {
    let res: Vec<ColumnTarget> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if skipped.contains(&Some(idx)) {
                ColumnTarget::Ignored
            } else {
                map_header(survey, h)
            }
        })
        .collect();
    for (h, t) in headers.iter().zip(res.iter()) {
        if *t == ColumnTarget::Ignored {
            debug!("map_header_row: ignoring column {:?}", h);
        }
    }
    res
}

/// The answers of a spreadsheet line, following the mapping of the header.
pub fn assemble_cells(targets: &[ColumnTarget], cells: &[String]) -> Vec<ParsedAnswer> {
    targets
        .iter()
        .zip(cells.iter())
        .filter_map(|(t, content)| match t {
            ColumnTarget::Answer { question, row } => Some(ParsedAnswer::Cell {
                question: *question,
                row: row.clone(),
                content: content.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn find_cell<'a>(
    targets: &[ColumnTarget],
    cells: &'a [String],
    target: &ColumnTarget,
) -> Option<&'a str> {
    targets
        .iter()
        .position(|t| t == target)
        .and_then(|idx| cells.get(idx))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 timestamps, and "YYYY-MM-DD HH:MM:SS" read as UTC.
pub fn parse_timestamp(value: &str) -> TabResult<DateTime<Utc>> {
    let v = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(v) {
        return Ok(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S")
        .context(ParsingDateSnafu { value: v })?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Excel stores dates as a number of days since 1899-12-30.
/// Serials outside of the range of Excel dates (up to 9999-12-31) are rejected.
pub fn excel_serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let t = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(Utc.from_utc_datetime(&t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_stats::builder::SurveyBuilder;

    fn survey() -> Survey {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let mut b = SurveyBuilder::new("s1", "Lunch", start, end).unwrap();
        b.add_single("Main course", &["Fish", "Pasta"], true).unwrap();
        b.add_matrix("Rate the service", &["Speed", "Taste"], &["Bad", "Good"], false)
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn headers() {
        let s = survey();
        let headers: Vec<String> = vec!["id", "Main course", "Rate the service [Taste]", "Email", "Other"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let targets = map_header_row(&s, &headers, &[Some(0)]);
        assert_eq!(targets[0], ColumnTarget::Ignored);
        assert_eq!(
            targets[1],
            ColumnTarget::Answer {
                question: s.questions()[0].id,
                row: None
            }
        );
        assert_eq!(
            targets[2],
            ColumnTarget::Answer {
                question: s.questions()[1].id,
                row: Some("Taste".to_string())
            }
        );
        assert_eq!(targets[3], ColumnTarget::Email);
        assert_eq!(targets[4], ColumnTarget::Ignored);
    }

    #[test]
    fn timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 12:30:00").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn excel_dates() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        // 2024-03-01 is day 45352.
        assert_eq!(excel_serial_to_datetime(45352.5), Some(expected));
        assert_eq!(excel_serial_to_datetime(f64::NEG_INFINITY), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
        assert_eq!(excel_serial_to_datetime(1e300), None);
    }

    #[test]
    fn default_ids() {
        let f = make_default_id("/tmp/data/responses.csv");
        assert_eq!(f(3), "responses.csv-00000003");
    }
}
