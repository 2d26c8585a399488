// Reads the flat answer records of the submission API.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::tab::io_common::{make_default_id, parse_timestamp};
use crate::tab::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonAnswer {
    question: u64,
    #[serde(rename = "selectedOption", alias = "selected_option")]
    selected_option: Option<u64>,
    #[serde(rename = "matrixRow", alias = "matrix_row")]
    matrix_row: Option<u64>,
    #[serde(rename = "matrixColumn", alias = "matrix_column")]
    matrix_column: Option<u64>,
    #[serde(rename = "textAnswer", alias = "text_answer")]
    text_answer: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonSubmission {
    id: Option<String>,
    #[serde(rename = "respondentName", alias = "respondent_name")]
    respondent_name: Option<String>,
    #[serde(rename = "respondentEmail", alias = "respondent_email")]
    respondent_email: Option<String>,
    #[serde(rename = "submittedAt", alias = "submitted_at")]
    submitted_at: Option<String>,
    #[serde(default)]
    answers: Vec<JsonAnswer>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonResponses {
    responses: Vec<JsonSubmission>,
}

pub fn read_json_responses(path: String) -> TabResult<Vec<ParsedSubmission>> {
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: &path })?;
    parse_json_responses(&path, &contents)
}

fn parse_json_responses(path: &str, contents: &str) -> TabResult<Vec<ParsedSubmission>> {
    let default_id = make_default_id(path);
    let parsed: JsonResponses = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    let mut res: Vec<ParsedSubmission> = Vec::new();
    for (idx, js) in parsed.responses.into_iter().enumerate() {
        let submitted_at = match js.submitted_at.as_deref() {
            Some(s) => Some(parse_timestamp(s)?),
            None => None,
        };
        let answers: Vec<ParsedAnswer> = js
            .answers
            .into_iter()
            .map(|a| ParsedAnswer::Record {
                question: QuestionId(a.question),
                selected_option: a.selected_option,
                matrix_row: a.matrix_row,
                matrix_column: a.matrix_column,
                text_answer: a.text_answer,
            })
            .collect();
        res.push(ParsedSubmission {
            id: js.id.unwrap_or_else(|| default_id(idx + 1)),
            submitted_at,
            respondent: Respondent {
                name: js.respondent_name,
                email: js.respondent_email,
            },
            answers,
        });
    }
    debug!("read_json_responses: {}: {} submissions", path, res.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_records() {
        let contents = r#"{"responses": [
            {"id": "r1", "respondentName": "Ann", "submittedAt": "2024-03-01T10:00:00Z",
             "answers": [{"question": 1, "selectedOption": 2},
                         {"question": 3, "matrix_row": 1, "matrix_column": 4}]},
            {"answers": [{"question": 5, "textAnswer": "More salt"}]}
        ]}"#;
        let res = parse_json_responses("/tmp/r.json", contents).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].id, "r1");
        assert_eq!(res[0].respondent.name, Some("Ann".to_string()));
        assert!(res[0].submitted_at.is_some());
        assert_eq!(
            res[0].answers[1],
            ParsedAnswer::Record {
                question: QuestionId(3),
                selected_option: None,
                matrix_row: Some(1),
                matrix_column: Some(4),
                text_answer: None
            }
        );
        assert_eq!(res[1].id, "r.json-00000002");
        assert_eq!(res[1].submitted_at, None);
    }

    #[test]
    fn bad_timestamp() {
        let contents = r#"{"responses": [{"submittedAt": "soon", "answers": []}]}"#;
        assert!(parse_json_responses("r.json", contents).is_err());
    }
}
