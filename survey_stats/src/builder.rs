pub use crate::config::*;

use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashSet;

/// A builder for survey definitions.
///
/// The builder checks every question when it is added, and the window when it is
/// created. Ids and orders are assigned automatically by the `add_*` shortcuts.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use survey_stats::builder::SurveyBuilder;
/// # use survey_stats::DefinitionError;
///
/// let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
/// let mut builder = SurveyBuilder::new("lunch", "Lunch poll", start, start + Duration::days(2))?
///     .description("Where do we eat on Friday?");
///
/// builder.add_single("Place", &["Pizza", "Sushi"], true)?;
/// builder.add_open("Anything else?", false)?;
///
/// let survey = builder.build()?;
/// assert_eq!(survey.total_questions(), 2);
/// # Ok::<(), DefinitionError>(())
/// ```
pub struct Builder {
    pub(crate) _id: SurveyId,
    pub(crate) _title: String,
    pub(crate) _description: String,
    pub(crate) _start_date: DateTime<Utc>,
    pub(crate) _end_date: DateTime<Utc>,
    pub(crate) _is_active: bool,
    pub(crate) _questions: Vec<Question>,
    // Next id handed out by the shortcuts.
    pub(crate) _next_id: u64,
}

pub type SurveyBuilder = Builder;

impl Builder {
    pub fn new(
        id: &str,
        title: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Builder, DefinitionError> {
        if end_date <= start_date {
            return Err(DefinitionError::InvalidWindow {
                start_date,
                end_date,
            });
        }
        Ok(Builder {
            _id: SurveyId(id.to_string()),
            _title: title.to_string(),
            _description: String::new(),
            _start_date: start_date,
            _end_date: end_date,
            _is_active: true,
            _questions: Vec::new(),
            _next_id: 1,
        })
    }

    pub fn description(self, description: &str) -> Builder {
        Builder {
            _description: description.to_string(),
            ..self
        }
    }

    pub fn active(self, is_active: bool) -> Builder {
        Builder {
            _is_active: is_active,
            ..self
        }
    }

    /// Adds a fully specified question.
    pub fn add_question(&mut self, question: Question) -> Result<(), DefinitionError> {
        check_question(&question)?;
        if self._questions.iter().any(|q| q.id == question.id) {
            return Err(DefinitionError::DuplicateQuestionId(question.id));
        }
        if self._questions.iter().any(|q| q.order == question.order) {
            return Err(DefinitionError::DuplicateQuestionOrder(question.order));
        }
        self._next_id = self._next_id.max(max_id(&question).saturating_add(1));
        debug!(
            "add_question: {} {:?} ({})",
            question.id,
            question.text,
            question.question_type()
        );
        self._questions.push(question);
        Ok(())
    }

    pub fn add_single(
        &mut self,
        text: &str,
        options: &[&str],
        is_required: bool,
    ) -> Result<QuestionId, DefinitionError> {
        let opts = self.make_options(options);
        self.add_shortcut(text, is_required, QuestionKind::Single(opts))
    }

    pub fn add_multiple(
        &mut self,
        text: &str,
        options: &[&str],
        is_required: bool,
    ) -> Result<QuestionId, DefinitionError> {
        let opts = self.make_options(options);
        self.add_shortcut(text, is_required, QuestionKind::Multiple(opts))
    }

    pub fn add_matrix(
        &mut self,
        text: &str,
        rows: &[&str],
        columns: &[&str],
        is_required: bool,
    ) -> Result<QuestionId, DefinitionError> {
        let grid = self.make_grid(rows, columns);
        self.add_shortcut(text, is_required, QuestionKind::Matrix(grid))
    }

    pub fn add_matrix_mul(
        &mut self,
        text: &str,
        rows: &[&str],
        columns: &[&str],
        is_required: bool,
    ) -> Result<QuestionId, DefinitionError> {
        let grid = self.make_grid(rows, columns);
        self.add_shortcut(text, is_required, QuestionKind::MatrixMul(grid))
    }

    pub fn add_open(&mut self, text: &str, is_required: bool) -> Result<QuestionId, DefinitionError> {
        self.add_shortcut(text, is_required, QuestionKind::Open)
    }

    /// Finishes the survey. Questions are sorted by order, and so are the options,
    /// rows and columns inside each question.
    pub fn build(self) -> Result<Survey, DefinitionError> {
        let mut questions = self._questions;
        questions.sort_by_key(|q| q.order);
        for q in questions.iter_mut() {
            match &mut q.kind {
                QuestionKind::Single(opts) | QuestionKind::Multiple(opts) => {
                    opts.sort_by_key(|o| o.order);
                }
                QuestionKind::Matrix(grid) | QuestionKind::MatrixMul(grid) => {
                    grid.rows.sort_by_key(|r| r.order);
                    grid.columns.sort_by_key(|c| c.order);
                }
                QuestionKind::Open => {}
            }
        }
        Ok(Survey {
            id: self._id,
            title: self._title,
            description: self._description,
            start_date: self._start_date,
            end_date: self._end_date,
            is_active: self._is_active,
            questions,
        })
    }

    fn add_shortcut(
        &mut self,
        text: &str,
        is_required: bool,
        kind: QuestionKind,
    ) -> Result<QuestionId, DefinitionError> {
        let qid = QuestionId(self.fresh_id());
        let order = self
            ._questions
            .iter()
            .map(|q| q.order)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        self.add_question(Question {
            id: qid,
            text: text.to_string(),
            is_required,
            order,
            kind,
        })?;
        Ok(qid)
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self._next_id;
        self._next_id = self._next_id.saturating_add(1);
        id
    }

    fn make_options(&mut self, labels: &[&str]) -> Vec<AnswerOption> {
        labels
            .iter()
            .enumerate()
            .map(|(idx, text)| AnswerOption {
                id: OptionId(self.fresh_id()),
                text: text.to_string(),
                order: idx as i32,
            })
            .collect()
    }

    fn make_grid(&mut self, rows: &[&str], columns: &[&str]) -> MatrixGrid {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(idx, text)| MatrixRow {
                id: RowId(self.fresh_id()),
                text: text.to_string(),
                order: idx as i32,
            })
            .collect();
        let columns = columns
            .iter()
            .enumerate()
            .map(|(idx, text)| MatrixColumn {
                id: ColumnId(self.fresh_id()),
                text: text.to_string(),
                order: idx as i32,
            })
            .collect();
        MatrixGrid { rows, columns }
    }
}

fn check_question(q: &Question) -> Result<(), DefinitionError> {
    match &q.kind {
        QuestionKind::Single(opts) | QuestionKind::Multiple(opts) => {
            if opts.is_empty() {
                return Err(DefinitionError::EmptyChoices(q.id));
            }
            if !all_distinct(opts.iter().map(|o| o.id.0)) {
                return Err(DefinitionError::DuplicateItemId(q.id));
            }
        }
        QuestionKind::Matrix(grid) | QuestionKind::MatrixMul(grid) => {
            if grid.rows.is_empty() || grid.columns.is_empty() {
                return Err(DefinitionError::EmptyMatrix(q.id));
            }
            if !all_distinct(grid.rows.iter().map(|r| r.id.0))
                || !all_distinct(grid.columns.iter().map(|c| c.id.0))
            {
                return Err(DefinitionError::DuplicateItemId(q.id));
            }
        }
        QuestionKind::Open => {}
    }
    Ok(())
}

fn all_distinct(ids: impl Iterator<Item = u64>) -> bool {
    let mut seen: HashSet<u64> = HashSet::new();
    ids.into_iter().all(|id| seen.insert(id))
}

// The largest id used by the question or by any of its items.
fn max_id(q: &Question) -> u64 {
    let items = match &q.kind {
        QuestionKind::Single(opts) | QuestionKind::Multiple(opts) => {
            opts.iter().map(|o| o.id.0).max()
        }
        QuestionKind::Matrix(grid) | QuestionKind::MatrixMul(grid) => grid
            .rows
            .iter()
            .map(|r| r.id.0)
            .chain(grid.columns.iter().map(|c| c.id.0))
            .max(),
        QuestionKind::Open => None,
    };
    items.unwrap_or(0).max(q.id.0)
}
