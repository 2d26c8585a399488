use log::{debug, info, warn};

use survey_stats::builder::SurveyBuilder;
use survey_stats::*;

use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tab::config_reader::*;

pub mod config_reader;
pub mod export_xlsx;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error parsing a number in the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file {path} has no usable worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error writing Excel file {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The path {path} has no parent directory"))]
    MissingParentDir { path: String },
    #[snafu(display("Unknown question type {question_type:?} for question {question_id}"))]
    UnknownQuestionType {
        question_type: String,
        question_id: u64,
    },
    #[snafu(display("Invalid survey definition"))]
    Definition { source: DefinitionError },
    #[snafu(display("Cannot understand the date {value:?}"))]
    ParsingDate {
        source: chrono::ParseError,
        value: String,
    },
    #[snafu(display("Submission {id} was rejected: {reason}"))]
    RejectedSubmission { id: String, reason: Rejection },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

/// An answer as parsed by the readers.
/// This is before resolving it against the definition of the survey.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ParsedAnswer {
    /// A flat record that references the ids of the survey.
    Record {
        question: QuestionId,
        selected_option: Option<u64>,
        matrix_row: Option<u64>,
        matrix_column: Option<u64>,
        text_answer: Option<String>,
    },
    /// The content of a spreadsheet cell, with labels instead of ids.
    /// `row` is the label of the matrix row, for matrix questions.
    Cell {
        question: QuestionId,
        row: Option<String>,
        content: String,
    },
}

/// A submission, as parsed by the readers.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedSubmission {
    pub id: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub respondent: Respondent,
    pub answers: Vec<ParsedAnswer>,
}

/// Why a submission did not make it into the statistics.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Rejection {
    Submission(SubmissionError),
    UnknownLabel { question: QuestionId, label: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Submission(e) => write!(f, "{}", e),
            Rejection::UnknownLabel { question, label } => {
                write!(f, "{:?} is not a choice of question {}", label, question)
            }
        }
    }
}

impl From<SubmissionError> for Rejection {
    fn from(e: SubmissionError) -> Rejection {
        Rejection::Submission(e)
    }
}

fn parse_question_type(question_type: &str, question_id: u64) -> TabResult<QuestionType> {
    match question_type {
        "single" => Ok(QuestionType::Single),
        "multiple" => Ok(QuestionType::Multiple),
        "matrix" => Ok(QuestionType::Matrix),
        "matrix_mul" => Ok(QuestionType::MatrixMul),
        "open" => Ok(QuestionType::Open),
        x => UnknownQuestionTypeSnafu {
            question_type: x,
            question_id,
        }
        .fail(),
    }
}

/// Turns the definition read from the configuration into a survey.
pub fn build_survey(def: &SurveyDef) -> TabResult<Survey> {
    let mut builder = SurveyBuilder::new(&def.id, &def.title, def.start_date, def.end_date)
        .context(DefinitionSnafu {})?
        .description(def.description.as_deref().unwrap_or(""))
        .active(def.is_active.unwrap_or(true));

    for (idx, qdef) in def.questions.iter().enumerate() {
        let qid = QuestionId(qdef.id);
        let qtype = parse_question_type(&qdef.question_type, qdef.id)?;
        let options = qdef.options.clone().unwrap_or_default();
        let rows = qdef.matrix_rows.clone().unwrap_or_default();
        let columns = qdef.matrix_columns.clone().unwrap_or_default();

        let has_choices = !options.is_empty();
        let has_grid = !rows.is_empty() || !columns.is_empty();
        let unexpected = match qtype {
            QuestionType::Single | QuestionType::Multiple => has_grid,
            QuestionType::Matrix | QuestionType::MatrixMul => has_choices,
            QuestionType::Open => has_choices || has_grid,
        };
        if unexpected {
            return Err(TabError::Definition {
                source: DefinitionError::UnexpectedChoices(qid),
            });
        }

        let to_options = || -> Vec<AnswerOption> {
            options
                .iter()
                .enumerate()
                .map(|(i, item)| AnswerOption {
                    id: OptionId(item.id),
                    text: item.text.clone(),
                    order: item.order.unwrap_or(i as i32),
                })
                .collect()
        };
        let to_grid = || MatrixGrid {
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, item)| MatrixRow {
                    id: RowId(item.id),
                    text: item.text.clone(),
                    order: item.order.unwrap_or(i as i32),
                })
                .collect(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, item)| MatrixColumn {
                    id: ColumnId(item.id),
                    text: item.text.clone(),
                    order: item.order.unwrap_or(i as i32),
                })
                .collect(),
        };
        let kind = match qtype {
            QuestionType::Single => QuestionKind::Single(to_options()),
            QuestionType::Multiple => QuestionKind::Multiple(to_options()),
            QuestionType::Matrix => QuestionKind::Matrix(to_grid()),
            QuestionType::MatrixMul => QuestionKind::MatrixMul(to_grid()),
            QuestionType::Open => QuestionKind::Open,
        };
        builder
            .add_question(Question {
                id: qid,
                text: qdef.text.clone(),
                is_required: qdef.is_required.unwrap_or(true),
                order: qdef.order.unwrap_or((idx + 1) as i32),
                kind,
            })
            .context(DefinitionSnafu {})?;
    }
    builder.build().context(DefinitionSnafu {})
}

fn find_label<'a, T>(
    items: &'a [T],
    text: impl Fn(&T) -> &str,
    label: &str,
    question: QuestionId,
) -> Result<&'a T, Rejection> {
    items
        .iter()
        .find(|item| text(item) == label)
        .ok_or_else(|| Rejection::UnknownLabel {
            question,
            label: label.to_string(),
        })
}

fn split_labels<'a>(content: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> {
    content.split(delimiter).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Folds the parsed answers of a submission into one typed input per question.
///
/// Spreadsheet labels are resolved into ids here. A selection that the question
/// cannot hold (two choices for a single choice question, for instance) rejects
/// the submission.
pub fn resolve_submission(
    survey: &Survey,
    submission: &ParsedSubmission,
    delimiter: &str,
) -> Result<HashMap<QuestionId, RawAnswer>, Rejection> {
    let mut inputs: HashMap<QuestionId, RawAnswer> = HashMap::new();
    for answer in submission.answers.iter() {
        let qid = match answer {
            ParsedAnswer::Record { question, .. } | ParsedAnswer::Cell { question, .. } => {
                *question
            }
        };
        let question = survey
            .question(qid)
            .ok_or(SubmissionError::UnknownQuestion { question_id: qid })?;
        let mismatch = SubmissionError::AnswerMismatch {
            question_id: qid,
            expected: question.question_type(),
        };
        let raw = inputs
            .entry(qid)
            .or_insert_with(|| RawAnswer::empty_for(&question.kind));

        match (answer, &question.kind, raw) {
            (
                ParsedAnswer::Record {
                    selected_option: Some(oid),
                    matrix_row: None,
                    matrix_column: None,
                    text_answer: None,
                    ..
                },
                _,
                raw,
            ) => match raw {
                RawAnswer::Single(sel) if sel.is_none() => *sel = Some(OptionId(*oid)),
                RawAnswer::Multiple(sel) => {
                    sel.insert(OptionId(*oid));
                }
                _ => return Err(mismatch.into()),
            },
            (
                ParsedAnswer::Record {
                    selected_option: None,
                    matrix_row: Some(rid),
                    matrix_column: Some(cid),
                    text_answer: None,
                    ..
                },
                _,
                raw,
            ) => match raw {
                RawAnswer::Matrix(cells) if !cells.contains_key(&RowId(*rid)) => {
                    cells.insert(RowId(*rid), ColumnId(*cid));
                }
                RawAnswer::MatrixMul(cells) => {
                    cells.entry(RowId(*rid)).or_default().insert(ColumnId(*cid));
                }
                _ => return Err(mismatch.into()),
            },
            (
                ParsedAnswer::Record {
                    selected_option: None,
                    matrix_row: None,
                    matrix_column: None,
                    text_answer: Some(text),
                    ..
                },
                _,
                RawAnswer::Open(current),
            ) if current.trim().is_empty() => *current = text.clone(),
            (ParsedAnswer::Record { .. }, _, _) => return Err(mismatch.into()),

            (ParsedAnswer::Cell { content, .. }, _, _) if content.trim().is_empty() => {}
            (ParsedAnswer::Cell { content, .. }, QuestionKind::Single(opts), RawAnswer::Single(sel))
                if sel.is_none() =>
            {
                let opt = find_label(opts, |o| o.text.as_str(), content.trim(), qid)?;
                *sel = Some(opt.id);
            }
            (ParsedAnswer::Cell { content, .. }, QuestionKind::Multiple(opts), RawAnswer::Multiple(sel)) => {
                for label in split_labels(content, delimiter) {
                    let opt = find_label(opts, |o| o.text.as_str(), label, qid)?;
                    sel.insert(opt.id);
                }
            }
            (
                ParsedAnswer::Cell {
                    content,
                    row: Some(row_label),
                    ..
                },
                QuestionKind::Matrix(grid),
                RawAnswer::Matrix(cells),
            ) => {
                let row = find_label(&grid.rows, |r| r.text.as_str(), row_label, qid)?;
                let col = find_label(&grid.columns, |c| c.text.as_str(), content.trim(), qid)?;
                if cells.insert(row.id, col.id).is_some() {
                    return Err(mismatch.into());
                }
            }
            (
                ParsedAnswer::Cell {
                    content,
                    row: Some(row_label),
                    ..
                },
                QuestionKind::MatrixMul(grid),
                RawAnswer::MatrixMul(cells),
            ) => {
                let row = find_label(&grid.rows, |r| r.text.as_str(), row_label, qid)?;
                for label in split_labels(content, delimiter) {
                    let col = find_label(&grid.columns, |c| c.text.as_str(), label, qid)?;
                    cells.entry(row.id).or_default().insert(col.id);
                }
            }
            (ParsedAnswer::Cell { content, .. }, QuestionKind::Open, RawAnswer::Open(current))
                if current.trim().is_empty() =>
            {
                *current = content.clone();
            }
            (ParsedAnswer::Cell { .. }, _, _) => return Err(mismatch.into()),
        }
    }
    Ok(inputs)
}

/// The responses that passed validation, and the number of rejected submissions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CollectedResponses {
    pub responses: Vec<Response>,
    pub rejected: u64,
}

/// Validates all the parsed submissions against the survey.
///
/// A submission without timestamp is checked against the window at `evaluation_time`.
/// In strict mode, the first rejected submission stops the run.
pub fn collect_responses(
    survey: &Survey,
    submissions: &[ParsedSubmission],
    delimiter: &str,
    evaluation_time: DateTime<Utc>,
    strict: bool,
) -> TabResult<CollectedResponses> {
    let mut responses: Vec<Response> = Vec::new();
    let mut rejected: u64 = 0;
    for submission in submissions.iter() {
        let now = submission.submitted_at.unwrap_or(evaluation_time);
        let res = resolve_submission(survey, submission, delimiter).and_then(|inputs| {
            assemble_response(survey, &inputs, submission.respondent.clone(), now)
                .map_err(Rejection::from)
        });
        match res {
            Ok(r) => {
                debug!(
                    "collect_responses: submission {}: {} answers",
                    submission.id,
                    r.answers().len()
                );
                responses.push(r);
            }
            Err(reason) if strict => {
                return RejectedSubmissionSnafu {
                    id: submission.id.clone(),
                    reason,
                }
                .fail();
            }
            Err(reason) => {
                warn!(
                    "collect_responses: submission {}: rejected: {}",
                    submission.id, reason
                );
                rejected += 1;
            }
        }
    }
    info!(
        "collect_responses: {} accepted, {} rejected",
        responses.len(),
        rejected
    );
    Ok(CollectedResponses {
        responses,
        rejected,
    })
}

fn tally_to_json(tally: &QuestionTally) -> JSValue {
    match tally {
        QuestionTally::Counts(counts) => {
            let mut m: JSMap<String, JSValue> = JSMap::new();
            for (label, count) in counts.iter() {
                m.insert(label.clone(), json!(count));
            }
            JSValue::Object(m)
        }
        QuestionTally::Grid(rows) => {
            let mut m: JSMap<String, JSValue> = JSMap::new();
            for (row, cols) in rows.iter() {
                let mut cm: JSMap<String, JSValue> = JSMap::new();
                for (col, count) in cols.iter() {
                    cm.insert(col.clone(), json!(count));
                }
                m.insert(row.clone(), JSValue::Object(cm));
            }
            JSValue::Object(m)
        }
    }
}

pub fn statistics_to_json(stats: &SurveyStatistics) -> JSValue {
    let questions: Vec<JSValue> = stats
        .questions
        .iter()
        .map(|qs| {
            json!({
                "id": qs.id.0,
                "text": qs.text,
                "question_type": qs.question_type.as_str(),
                "total_answers": qs.total_answers,
                "data": tally_to_json(&qs.data),
            })
        })
        .collect();
    json!({
        "survey": {
            "id": stats.survey.id.0,
            "title": stats.survey.title,
            "total_responses": stats.survey.total_responses,
        },
        "questions": questions,
    })
}

fn build_summary_js(
    survey: &Survey,
    stats: &SurveyStatistics,
    evaluation_time: DateTime<Utc>,
    rejected: u64,
) -> JSValue {
    let c = OutputConfig {
        survey: survey.id().0.clone(),
        title: survey.title().to_string(),
        evaluation_time: evaluation_time.to_rfc3339(),
        is_open: survey.is_open(evaluation_time),
    };
    json!({
        "config": c,
        "results": statistics_to_json(stats),
        "rejected": rejected,
    })
}

fn read_submissions(
    root_path: &Path,
    cfs: &FileSource,
    survey: &Survey,
) -> TabResult<Vec<ParsedSubmission>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read response file {:?}", p2);
    match cfs.provider.as_str() {
        "json" => io_json::read_json_responses(p2),
        "csv" => io_csv::read_csv_responses(p2, cfs, survey),
        "xlsx" => io_xlsx::read_xlsx_responses(p2, cfs, survey),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn load_config(args: &Args) -> TabResult<(TabConfig, PathBuf)> {
    if let Some(config_path) = args.config.clone() {
        let config_str =
            fs::read_to_string(&config_path).context(OpeningJsonSnafu { path: &config_path })?;
        let config: TabConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
        let root = Path::new(&config_path)
            .parent()
            .context(MissingParentDirSnafu { path: &config_path })?
            .to_path_buf();
        return Ok((config, root));
    }
    if let Some(survey_path) = args.survey.clone() {
        let survey_str =
            fs::read_to_string(&survey_path).context(OpeningJsonSnafu { path: &survey_path })?;
        let survey: SurveyDef = serde_json::from_str(&survey_str).context(ParsingJsonSnafu {})?;
        let config = TabConfig {
            output_settings: OutputSettings::default(),
            survey,
            response_sources: vec![],
            evaluation_time: None,
        };
        return Ok((config, PathBuf::from(".")));
    }
    whatever!("No survey provided: use the --config or the --survey option")
}

/// Applies the command line options on top of the configuration file.
fn apply_args(config: &mut TabConfig, args: &Args) -> TabResult<()> {
    if let Some(input) = args.input.clone() {
        let mut cfs = FileSource::new(args.input_type.as_deref().unwrap_or("json"), &input);
        cfs.multiple_delimiter = args.multiple_delimiter.clone();
        cfs.excel_worksheet_name = args.excel_worksheet_name.clone();
        config.response_sources = vec![cfs];
    }
    if let Some(now) = args.now.clone() {
        let t = DateTime::parse_from_rfc3339(&now).context(ParsingDateSnafu { value: &now })?;
        config.evaluation_time = Some(t.with_timezone(&Utc));
    }
    if args.out.is_some() {
        config.output_settings.output_path = args.out.clone();
    }
    if args.excel.is_some() {
        config.output_settings.excel_path = args.excel.clone();
    }
    Ok(())
}

fn write_output(root: &Path, output_path: &Option<String>, content: &str) -> TabResult<()> {
    match output_path.as_deref() {
        None | Some("stdout") => {
            println!("{}", content);
            Ok(())
        }
        Some(p) => {
            let path = root.join(p);
            let path_s = path.display().to_string();
            info!("Writing summary to {:?}", path_s);
            fs::write(&path, content).context(WritingOutputSnafu { path: path_s })
        }
    }
}

pub fn check_reference(summary: &JSValue, reference_path: &str) -> TabResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty_summary = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_ref.as_str(), pretty_summary.as_str(), "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Runs a full tabulation: reads the survey and the responses, computes the
/// statistics and writes the outputs.
pub fn run_tabulation(args: &Args) -> TabResult<JSValue> {
    let (mut config, root) = load_config(args)?;
    apply_args(&mut config, args)?;
    debug!("run_tabulation: config: {:?}", config);

    let survey = build_survey(&config.survey)?;
    let evaluation_time = config.evaluation_time.unwrap_or_else(Utc::now);
    info!(
        "Survey {} ({} questions), open at {}: {}",
        survey.id(),
        survey.total_questions(),
        evaluation_time.to_rfc3339(),
        survey.is_open(evaluation_time)
    );

    // Each source may use its own delimiter for multiple selections.
    let mut responses: Vec<Response> = Vec::new();
    let mut rejected: u64 = 0;
    for cfs in config.response_sources.iter() {
        let submissions = read_submissions(&root, cfs, &survey)?;
        let collected = collect_responses(
            &survey,
            &submissions,
            cfs.multiple_delimiter(),
            evaluation_time,
            args.strict,
        )?;
        responses.extend(collected.responses);
        rejected += collected.rejected;
    }

    let stats = compute_statistics(&survey, &responses);
    let summary = build_summary_js(&survey, &stats, evaluation_time, rejected);
    let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    write_output(&root, &config.output_settings.output_path, &pretty)?;

    if let Some(excel_path) = config.output_settings.excel_path.clone() {
        let path = root.join(excel_path).display().to_string();
        export_xlsx::write_statistics(&path, &survey, &stats)?;
    }

    if let Some(reference) = args.reference.clone() {
        check_reference(&summary, &reference)?;
    }
    Ok(summary)
}
