// ********* Survey definition ***********

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::Display;

macro_rules! display_as_inner {
    ($($t:ty),*) => {
        $(impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct SurveyId(pub String);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct QuestionId(pub u64);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct OptionId(pub u64);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct RowId(pub u64);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct ColumnId(pub u64);

display_as_inner!(SurveyId, QuestionId, OptionId, RowId, ColumnId);

/// The tag of a question, as it appears in survey definitions and in the statistics.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionType {
    Single,
    Multiple,
    Matrix,
    MatrixMul,
    Open,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multiple => "multiple",
            QuestionType::Matrix => "matrix",
            QuestionType::MatrixMul => "matrix_mul",
            QuestionType::Open => "open",
        }
    }
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How many answer records a single submission may produce for one question.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AnswerCardinality {
    /// Zero or one record (single choice, open text).
    AtMostOne,
    /// Any number of records, one per selected option.
    AnyNumber,
    /// At most one record per matrix row.
    OnePerRow,
    /// Any number of records per matrix row, one per selected cell.
    OneOrMorePerRow,
}

/// A selectable option of a single or multiple choice question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
    pub order: i32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatrixRow {
    pub id: RowId,
    pub text: String,
    pub order: i32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatrixColumn {
    pub id: ColumnId,
    pub text: String,
    pub order: i32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatrixGrid {
    pub rows: Vec<MatrixRow>,
    pub columns: Vec<MatrixColumn>,
}

impl MatrixGrid {
    pub fn row(&self, id: RowId) -> Option<&MatrixRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&MatrixColumn> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// The shape of a question. Each variant carries exactly the sub-entities that are
/// meaningful for it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum QuestionKind {
    Single(Vec<AnswerOption>),
    Multiple(Vec<AnswerOption>),
    Matrix(MatrixGrid),
    MatrixMul(MatrixGrid),
    Open,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Single(_) => QuestionType::Single,
            QuestionKind::Multiple(_) => QuestionType::Multiple,
            QuestionKind::Matrix(_) => QuestionType::Matrix,
            QuestionKind::MatrixMul(_) => QuestionType::MatrixMul,
            QuestionKind::Open => QuestionType::Open,
        }
    }

    pub fn cardinality(&self) -> AnswerCardinality {
        match self {
            QuestionKind::Single(_) | QuestionKind::Open => AnswerCardinality::AtMostOne,
            QuestionKind::Multiple(_) => AnswerCardinality::AnyNumber,
            QuestionKind::Matrix(_) => AnswerCardinality::OnePerRow,
            QuestionKind::MatrixMul(_) => AnswerCardinality::OneOrMorePerRow,
        }
    }

    /// The options of a choice question. Empty for the other kinds.
    pub fn options(&self) -> &[AnswerOption] {
        match self {
            QuestionKind::Single(opts) | QuestionKind::Multiple(opts) => opts,
            _ => &[],
        }
    }

    pub fn grid(&self) -> Option<&MatrixGrid> {
        match self {
            QuestionKind::Matrix(g) | QuestionKind::MatrixMul(g) => Some(g),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub is_required: bool,
    pub order: i32,
    pub kind: QuestionKind,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.kind.options().iter().find(|o| o.id == id)
    }
}

/// A survey and its questions, in display order.
///
/// Surveys are created with the [`crate::builder::SurveyBuilder`], which checks the
/// invariants of the definition.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Survey {
    pub(crate) id: SurveyId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) start_date: DateTime<Utc>,
    pub(crate) end_date: DateTime<Utc>,
    pub(crate) is_active: bool,
    pub(crate) questions: Vec<Question>,
}

impl Survey {
    pub fn id(&self) -> &SurveyId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The questions, sorted by their order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// True if the survey is active and `now` falls inside its window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        crate::window::is_open(self, now)
    }
}

// ********* Submitted data ***********

/// The final selection state of one question, as entered by a respondent.
///
/// Each variant matches one question type. Toggling of selections happens before
/// this point: only the final state is validated.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RawAnswer {
    Single(Option<OptionId>),
    Multiple(BTreeSet<OptionId>),
    Matrix(BTreeMap<RowId, ColumnId>),
    MatrixMul(BTreeMap<RowId, BTreeSet<ColumnId>>),
    Open(String),
}

impl RawAnswer {
    /// The input of a question that the respondent left untouched.
    pub fn empty_for(kind: &QuestionKind) -> RawAnswer {
        match kind {
            QuestionKind::Single(_) => RawAnswer::Single(None),
            QuestionKind::Multiple(_) => RawAnswer::Multiple(BTreeSet::new()),
            QuestionKind::Matrix(_) => RawAnswer::Matrix(BTreeMap::new()),
            QuestionKind::MatrixMul(_) => RawAnswer::MatrixMul(BTreeMap::new()),
            QuestionKind::Open => RawAnswer::Open(String::new()),
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            RawAnswer::Single(_) => QuestionType::Single,
            RawAnswer::Multiple(_) => QuestionType::Multiple,
            RawAnswer::Matrix(_) => QuestionType::Matrix,
            RawAnswer::MatrixMul(_) => QuestionType::MatrixMul,
            RawAnswer::Open(_) => QuestionType::Open,
        }
    }
}

/// The payload of an answer record. Matrix answers always carry both the row and
/// the column.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum AnswerValue {
    Selected(OptionId),
    Cell(RowId, ColumnId),
    Text(String),
}

/// One atomic fact about one response to one question.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub value: AnswerValue,
}

impl AnswerRecord {
    pub fn selected_option_id(&self) -> Option<OptionId> {
        match self.value {
            AnswerValue::Selected(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn matrix_row_id(&self) -> Option<RowId> {
        match self.value {
            AnswerValue::Cell(rid, _) => Some(rid),
            _ => None,
        }
    }

    pub fn matrix_column_id(&self) -> Option<ColumnId> {
        match self.value {
            AnswerValue::Cell(_, cid) => Some(cid),
            _ => None,
        }
    }

    pub fn text_answer(&self) -> Option<&str> {
        match &self.value {
            AnswerValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Optional identification left by an anonymous respondent.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Respondent {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One respondent's full submission. It cannot be changed once created.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Response {
    survey_id: SurveyId,
    respondent: Respondent,
    submitted_at: Option<DateTime<Utc>>,
    answers: Vec<AnswerRecord>,
}

impl Response {
    /// Rebuilds a response from records kept in a response store.
    ///
    /// New submissions should go through [`crate::assemble_response`] instead.
    pub fn from_records(
        survey_id: SurveyId,
        respondent: Respondent,
        submitted_at: Option<DateTime<Utc>>,
        answers: Vec<AnswerRecord>,
    ) -> Response {
        Response {
            survey_id,
            respondent,
            submitted_at,
            answers,
        }
    }

    pub fn survey_id(&self) -> &SurveyId {
        &self.survey_id
    }

    pub fn respondent_name(&self) -> Option<&str> {
        self.respondent.name.as_deref()
    }

    pub fn respondent_email(&self) -> Option<&str> {
        self.respondent.email.as_deref()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }
}

// ******** Output data structures *********

/// The label used for answers that reference an option, row or column that the
/// question does not define (anymore).
///
/// An option (or row, or column) whose text is this label shares the bucket: its
/// count and the unknown answers are reported together. A warning is logged when
/// that happens.
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveySummary {
    pub id: SurveyId,
    pub title: String,
    pub total_responses: u64,
}

/// Counts per label, in the order of the question definition.
///
/// Labels without any answer are not present.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum QuestionTally {
    /// label -> count, for single, multiple and open questions.
    Counts(Vec<(String, u64)>),
    /// row label -> (column label -> count), for matrix questions.
    Grid(Vec<(String, Vec<(String, u64)>)>),
}

impl QuestionTally {
    pub fn is_empty(&self) -> bool {
        match self {
            QuestionTally::Counts(c) => c.is_empty(),
            QuestionTally::Grid(g) => g.is_empty(),
        }
    }

    /// The count for a label of a flat tally. Zero if absent or if this is a grid.
    pub fn count(&self, label: &str) -> u64 {
        match self {
            QuestionTally::Counts(c) => lookup(c, label).unwrap_or(0),
            QuestionTally::Grid(_) => 0,
        }
    }

    /// The count for a cell of a grid tally. Zero if absent or if this is a flat tally.
    pub fn cell(&self, row: &str, column: &str) -> u64 {
        match self {
            QuestionTally::Grid(g) => g
                .iter()
                .find(|(r, _)| r == row)
                .and_then(|(_, cols)| lookup(cols, column))
                .unwrap_or(0),
            QuestionTally::Counts(_) => 0,
        }
    }

    /// The sum of all the counts.
    pub fn total(&self) -> u64 {
        match self {
            QuestionTally::Counts(c) => c.iter().map(|(_, n)| n).sum(),
            QuestionTally::Grid(g) => g
                .iter()
                .flat_map(|(_, cols)| cols.iter().map(|(_, n)| n))
                .sum(),
        }
    }
}

fn lookup(counts: &[(String, u64)], label: &str) -> Option<u64> {
    counts.iter().find(|(l, _)| l == label).map(|(_, n)| *n)
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionStatistics {
    pub id: QuestionId,
    pub text: String,
    pub question_type: QuestionType,
    /// The number of responses with at least one answer to this question.
    pub total_answers: u64,
    pub data: QuestionTally,
}

/// Aggregated statistics of a survey. Recomputed on demand, never stored.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyStatistics {
    pub survey: SurveySummary,
    pub questions: Vec<QuestionStatistics>,
}

/// The count of a label, and its share as a percentage.
#[derive(PartialEq, Debug, Clone)]
pub struct OptionShare {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

// ******** Errors *********

/// Why a survey does not accept responses.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ClosedReason {
    NotActive,
    NotYetStarted { opens_at: DateTime<Utc> },
    AlreadyEnded { closed_at: DateTime<Utc> },
}

/// Errors that reject a submission. None of them leaves a partial response behind.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SubmissionError {
    MissingRequiredAnswer {
        question_id: QuestionId,
    },
    InvalidOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
    InvalidMatrixCell {
        question_id: QuestionId,
        row_id: RowId,
        column_id: ColumnId,
    },
    /// The shape of the input does not fit the type of the question.
    AnswerMismatch {
        question_id: QuestionId,
        expected: QuestionType,
    },
    /// An input was provided for a question that the survey does not define.
    UnknownQuestion {
        question_id: QuestionId,
    },
    SurveyClosed {
        survey_id: SurveyId,
        reason: ClosedReason,
    },
}

impl SubmissionError {
    /// The question that caused the rejection, if any.
    pub fn question_id(&self) -> Option<QuestionId> {
        match self {
            SubmissionError::MissingRequiredAnswer { question_id }
            | SubmissionError::InvalidOption { question_id, .. }
            | SubmissionError::InvalidMatrixCell { question_id, .. }
            | SubmissionError::AnswerMismatch { question_id, .. }
            | SubmissionError::UnknownQuestion { question_id } => Some(*question_id),
            SubmissionError::SurveyClosed { .. } => None,
        }
    }
}

impl Error for SubmissionError {}

impl Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionError::MissingRequiredAnswer { question_id } => {
                write!(f, "question {} requires an answer", question_id)
            }
            SubmissionError::InvalidOption {
                question_id,
                option_id,
            } => write!(
                f,
                "option {} is not an option of question {}",
                option_id, question_id
            ),
            SubmissionError::InvalidMatrixCell {
                question_id,
                row_id,
                column_id,
            } => write!(
                f,
                "cell (row {}, column {}) is not a cell of question {}",
                row_id, column_id, question_id
            ),
            SubmissionError::AnswerMismatch {
                question_id,
                expected,
            } => write!(
                f,
                "question {} expects an answer of type {}",
                question_id, expected
            ),
            SubmissionError::UnknownQuestion { question_id } => {
                write!(f, "question {} is not part of this survey", question_id)
            }
            SubmissionError::SurveyClosed { survey_id, reason } => match reason {
                ClosedReason::NotActive => write!(f, "survey {} is not active", survey_id),
                ClosedReason::NotYetStarted { opens_at } => write!(
                    f,
                    "survey {} is not available yet, it opens at {}",
                    survey_id,
                    opens_at.to_rfc3339()
                ),
                ClosedReason::AlreadyEnded { closed_at } => write!(
                    f,
                    "survey {} closed at {}",
                    survey_id,
                    closed_at.to_rfc3339()
                ),
            },
        }
    }
}

/// Errors in the definition of a survey.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DefinitionError {
    /// The end of the window is not after its start.
    InvalidWindow {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
    /// A single or multiple choice question without options.
    EmptyChoices(QuestionId),
    /// A matrix question without rows or without columns.
    EmptyMatrix(QuestionId),
    /// A question carrying options, rows or columns that its type does not use.
    UnexpectedChoices(QuestionId),
    DuplicateQuestionOrder(i32),
    DuplicateQuestionId(QuestionId),
    /// Two options, rows or columns of the same question share an id.
    DuplicateItemId(QuestionId),
}

impl Error for DefinitionError {}

impl Display for DefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionError::InvalidWindow {
                start_date,
                end_date,
            } => write!(
                f,
                "the survey ends ({}) before it starts ({})",
                end_date.to_rfc3339(),
                start_date.to_rfc3339()
            ),
            DefinitionError::EmptyChoices(qid) => {
                write!(f, "question {} has no options", qid)
            }
            DefinitionError::EmptyMatrix(qid) => {
                write!(f, "question {} needs at least one row and one column", qid)
            }
            DefinitionError::UnexpectedChoices(qid) => {
                write!(
                    f,
                    "question {} has options, rows or columns that its type does not use",
                    qid
                )
            }
            DefinitionError::DuplicateQuestionOrder(order) => {
                write!(f, "two questions share the order {}", order)
            }
            DefinitionError::DuplicateQuestionId(qid) => {
                write!(f, "two questions share the id {}", qid)
            }
            DefinitionError::DuplicateItemId(qid) => {
                write!(f, "question {} reuses the id of an option, row or column", qid)
            }
        }
    }
}
