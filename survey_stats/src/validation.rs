use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;

use crate::config::*;
use crate::window::{window_status, WindowStatus};

/// Converts the input of one question into answer records.
///
/// The records follow the order of the question definition: options for choice
/// questions, rows then columns for matrix questions. An optional question left
/// empty produces no record.
pub fn validate_answer(
    question: &Question,
    raw: &RawAnswer,
) -> Result<Vec<AnswerRecord>, SubmissionError> {
    let qid = question.id;
    let record = |value: AnswerValue| AnswerRecord {
        question_id: qid,
        value,
    };
    let missing = SubmissionError::MissingRequiredAnswer { question_id: qid };

    match (&question.kind, raw) {
        (QuestionKind::Single(opts), RawAnswer::Single(selected)) => match selected {
            None if question.is_required => Err(missing),
            None => Ok(vec![]),
            Some(oid) if opts.iter().any(|o| o.id == *oid) => {
                Ok(vec![record(AnswerValue::Selected(*oid))])
            }
            Some(oid) => Err(SubmissionError::InvalidOption {
                question_id: qid,
                option_id: *oid,
            }),
        },
        (QuestionKind::Multiple(opts), RawAnswer::Multiple(selected)) => {
            if let Some(oid) = selected.iter().find(|oid| !opts.iter().any(|o| o.id == **oid)) {
                return Err(SubmissionError::InvalidOption {
                    question_id: qid,
                    option_id: *oid,
                });
            }
            if selected.is_empty() && question.is_required {
                return Err(missing);
            }
            Ok(opts
                .iter()
                .filter(|o| selected.contains(&o.id))
                .map(|o| record(AnswerValue::Selected(o.id)))
                .collect())
        }
        (QuestionKind::Matrix(grid), RawAnswer::Matrix(cells)) => {
            for (rid, cid) in cells.iter() {
                check_cell(qid, grid, *rid, *cid)?;
            }
            let mut res = Vec::new();
            for row in grid.rows.iter() {
                match cells.get(&row.id) {
                    Some(cid) => res.push(record(AnswerValue::Cell(row.id, *cid))),
                    None if question.is_required => {
                        debug!("validate_answer: {}: row {} is not answered", qid, row.id);
                        return Err(missing);
                    }
                    None => {}
                }
            }
            Ok(res)
        }
        (QuestionKind::MatrixMul(grid), RawAnswer::MatrixMul(cells)) => {
            for (rid, cids) in cells.iter() {
                for cid in cids.iter() {
                    check_cell(qid, grid, *rid, *cid)?;
                }
            }
            let mut res = Vec::new();
            for row in grid.rows.iter() {
                let selected = cells.get(&row.id).filter(|cids| !cids.is_empty());
                match selected {
                    Some(cids) => {
                        for col in grid.columns.iter().filter(|c| cids.contains(&c.id)) {
                            res.push(record(AnswerValue::Cell(row.id, col.id)));
                        }
                    }
                    None if question.is_required => {
                        debug!("validate_answer: {}: row {} is not answered", qid, row.id);
                        return Err(missing);
                    }
                    None => {}
                }
            }
            Ok(res)
        }
        (QuestionKind::Open, RawAnswer::Open(text)) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                Ok(vec![record(AnswerValue::Text(trimmed.to_string()))])
            } else if question.is_required {
                Err(missing)
            } else {
                Ok(vec![])
            }
        }
        (kind, _) => Err(SubmissionError::AnswerMismatch {
            question_id: qid,
            expected: kind.question_type(),
        }),
    }
}

fn check_cell(
    question_id: QuestionId,
    grid: &MatrixGrid,
    row_id: RowId,
    column_id: ColumnId,
) -> Result<(), SubmissionError> {
    if grid.row(row_id).is_some() && grid.column(column_id).is_some() {
        Ok(())
    } else {
        Err(SubmissionError::InvalidMatrixCell {
            question_id,
            row_id,
            column_id,
        })
    }
}

/// Builds a response out of the inputs of a respondent.
///
/// All or nothing: the first question that fails validation rejects the whole
/// submission. Questions without an input are validated as if left empty.
///
/// Arguments:
/// * `survey` the survey being answered
/// * `inputs` the input of each question, by question id
/// * `respondent` the optional identification of the respondent
/// * `now` the instant of the submission, checked against the survey window
pub fn assemble_response(
    survey: &Survey,
    inputs: &HashMap<QuestionId, RawAnswer>,
    respondent: Respondent,
    now: DateTime<Utc>,
) -> Result<Response, SubmissionError> {
    if let WindowStatus::Closed(reason) = window_status(survey, now) {
        return Err(SubmissionError::SurveyClosed {
            survey_id: survey.id.clone(),
            reason,
        });
    }

    if let Some(qid) = inputs.keys().find(|qid| survey.question(**qid).is_none()) {
        return Err(SubmissionError::UnknownQuestion { question_id: *qid });
    }

    let mut answers: Vec<AnswerRecord> = Vec::new();
    for question in survey.questions.iter() {
        let records = match inputs.get(&question.id) {
            Some(raw) => validate_answer(question, raw),
            None => validate_answer(question, &RawAnswer::empty_for(&question.kind)),
        };
        match records {
            Ok(mut rs) => answers.append(&mut rs),
            Err(e) => {
                debug!("assemble_response: survey {}: rejected: {}", survey.id, e);
                return Err(e);
            }
        }
    }

    debug!(
        "assemble_response: survey {}: {} answer records",
        survey.id,
        answers.len()
    );
    Ok(Response::from_records(
        survey.id.clone(),
        respondent,
        Some(now),
        answers,
    ))
}
