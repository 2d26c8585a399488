use crate::tab::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// The delimiter between the labels of a multiple selection in a spreadsheet cell.
pub const DEFAULT_MULTIPLE_DELIMITER: &str = ";";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "excelPath")]
    pub excel_path: Option<String>,
}

/// The configuration echoed at the top of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub survey: String,
    pub title: String,
    #[serde(rename = "evaluationTime")]
    pub evaluation_time: String,
    #[serde(rename = "isOpen")]
    pub is_open: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: u64,
    pub text: String,
    pub order: Option<i32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDef {
    pub id: u64,
    pub text: String,
    #[serde(rename = "questionType")]
    pub question_type: String,
    #[serde(rename = "isRequired")]
    pub is_required: Option<bool>,
    pub order: Option<i32>,
    pub options: Option<Vec<ItemDef>>,
    #[serde(rename = "matrixRows")]
    pub matrix_rows: Option<Vec<ItemDef>>,
    #[serde(rename = "matrixColumns")]
    pub matrix_columns: Option<Vec<ItemDef>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDef {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    pub questions: Vec<QuestionDef>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "timestampColumnIndex")]
    pub timestamp_column_index: Option<JSValue>,
    #[serde(rename = "headerRowIndex")]
    _header_row_index: Option<JSValue>,
    #[serde(rename = "multipleDelimiter")]
    pub multiple_delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            id_column_index: None,
            timestamp_column_index: None,
            _header_row_index: None,
            multiple_delimiter: None,
            excel_worksheet_name: None,
        }
    }

    /// The 0-based index of the header row. The data rows follow it.
    pub fn header_row_index(&self) -> TabResult<usize> {
        if self._header_row_index.is_none() {
            return Ok(0);
        }
        let x = read_js_int(&self._header_row_index)?;
        ensure!(x >= 1, ParsingJsonNumberSnafu {});
        Ok(x - 1)
    }

    pub fn id_column_index_int(&self) -> TabResult<Option<usize>> {
        read_column_index(&self.id_column_index)
    }

    pub fn timestamp_column_index_int(&self) -> TabResult<Option<usize>> {
        read_column_index(&self.timestamp_column_index)
    }

    pub fn multiple_delimiter(&self) -> &str {
        match self.multiple_delimiter.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => DEFAULT_MULTIPLE_DELIMITER,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TabConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    pub survey: SurveyDef,
    #[serde(rename = "responseSources", default)]
    pub response_sources: Vec<FileSource>,
    #[serde(rename = "evaluationTime")]
    pub evaluation_time: Option<DateTime<Utc>>,
}

pub fn read_summary(path: &str) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {:?}", js["config"]);
    Ok(js)
}

/// Column indexes start at 1, as in spreadsheets. Letters ("A", "AB") are accepted too.
fn read_column_index(x: &Option<JSValue>) -> TabResult<Option<usize>> {
    match x {
        None => Ok(None),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            let idx = s
                .to_ascii_uppercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'A' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu {})?;
            Ok(Some(idx - 1))
        }
        _ => {
            let idx = read_js_int(x)?;
            ensure!(idx >= 1, ParsingJsonNumberSnafu {});
            Ok(Some(idx - 1))
        }
    }
}

fn read_js_int(x: &Option<JSValue>) -> TabResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(js: JSValue) -> FileSource {
        serde_json::from_value(js).unwrap()
    }

    #[test]
    fn column_indexes() {
        let cfs = source(json!({
            "provider": "csv",
            "filePath": "a.csv",
            "idColumnIndex": "AB",
            "timestampColumnIndex": 2,
            "headerRowIndex": "3"
        }));
        assert_eq!(cfs.id_column_index_int().unwrap(), Some(27));
        assert_eq!(cfs.timestamp_column_index_int().unwrap(), Some(1));
        assert_eq!(cfs.header_row_index().unwrap(), 2);
    }

    #[test]
    fn defaults() {
        let cfs = source(json!({"provider": "csv", "filePath": "a.csv"}));
        assert_eq!(cfs.id_column_index_int().unwrap(), None);
        assert_eq!(cfs.header_row_index().unwrap(), 0);
        assert_eq!(cfs.multiple_delimiter(), ";");
    }

    #[test]
    fn zero_is_not_an_index() {
        let cfs = source(json!({"provider": "csv", "filePath": "a.csv", "idColumnIndex": 0}));
        assert!(cfs.id_column_index_int().is_err());
    }

    #[test]
    fn letters_beyond_any_sheet() {
        let cfs = source(json!({
            "provider": "csv",
            "filePath": "a.csv",
            "idColumnIndex": "ZZZZZZZZZZZZZZZ"
        }));
        assert!(matches!(
            cfs.id_column_index_int(),
            Err(TabError::ParsingJsonNumber {})
        ));
    }

    #[test]
    fn minimal_config() {
        let config: TabConfig = serde_json::from_value(json!({
            "survey": {
                "id": "s1",
                "title": "Lunch",
                "startDate": "2024-01-01T00:00:00Z",
                "endDate": "2024-12-31T00:00:00Z",
                "questions": []
            }
        }))
        .unwrap();
        assert_eq!(config.output_settings, OutputSettings::default());
        assert!(config.response_sources.is_empty());
        assert_eq!(config.evaluation_time, None);
    }
}
