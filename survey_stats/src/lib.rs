mod config;
pub mod builder;
pub mod manual;
mod validation;
mod window;

use log::{debug, info, warn};

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::{Add, AddAssign},
};

pub use crate::config::*;
pub use crate::validation::{assemble_response, validate_answer};
pub use crate::window::{is_open, window_status, WindowStatus};

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct AnswerCount(u64);

impl AnswerCount {
    const EMPTY: AnswerCount = AnswerCount(0);
    const ONE: AnswerCount = AnswerCount(1);
}

impl std::iter::Sum for AnswerCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        AnswerCount(iter.map(|ac| ac.0).sum())
    }
}

impl AddAssign for AnswerCount {
    fn add_assign(&mut self, rhs: AnswerCount) {
        self.0 += rhs.0;
    }
}

impl Add for AnswerCount {
    type Output = AnswerCount;
    fn add(self: AnswerCount, rhs: AnswerCount) -> AnswerCount {
        AnswerCount(self.0 + rhs.0)
    }
}

// The position of an option, row or column in the question definition, or a
// reference that the question does not know about.
// The derived order puts the unknown slot after all the known ones.
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
enum Slot {
    Known(usize),
    Unknown,
}

// Key of a flat tally. Options come first in definition order, then free texts
// sorted alphabetically, then the unknown bucket.
#[derive(Eq, PartialEq, Debug, Clone, PartialOrd, Ord, Hash)]
enum FlatKey {
    Option(usize),
    Text(String),
    Unknown,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum TallyInternal {
    Flat(BTreeMap<FlatKey, AnswerCount>),
    Grid(BTreeMap<(Slot, Slot), AnswerCount>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct QuestionAccumulator {
    // Number of responses with at least one record for this question.
    answered: AnswerCount,
    // Number of records that went to the unknown bucket.
    unknown: AnswerCount,
    tally: TallyInternal,
}

impl QuestionAccumulator {
    fn new(question: &Question) -> QuestionAccumulator {
        let tally = match question.kind {
            QuestionKind::Matrix(_) | QuestionKind::MatrixMul(_) => {
                TallyInternal::Grid(BTreeMap::new())
            }
            _ => TallyInternal::Flat(BTreeMap::new()),
        };
        QuestionAccumulator {
            answered: AnswerCount::EMPTY,
            unknown: AnswerCount::EMPTY,
            tally,
        }
    }

    fn record(&mut self, question: &Question, value: &AnswerValue) {
        match &mut self.tally {
            TallyInternal::Flat(counts) => {
                let key = match (&question.kind, value) {
                    (QuestionKind::Single(opts) | QuestionKind::Multiple(opts), AnswerValue::Selected(oid)) => {
                        match opts.iter().position(|o| o.id == *oid) {
                            Some(idx) => FlatKey::Option(idx),
                            None => FlatKey::Unknown,
                        }
                    }
                    (QuestionKind::Open, AnswerValue::Text(s)) => FlatKey::Text(s.clone()),
                    _ => FlatKey::Unknown,
                };
                if key == FlatKey::Unknown {
                    self.unknown += AnswerCount::ONE;
                }
                *counts.entry(key).or_insert(AnswerCount::EMPTY) += AnswerCount::ONE;
            }
            TallyInternal::Grid(counts) => {
                let key = match (question.kind.grid(), value) {
                    (Some(grid), AnswerValue::Cell(rid, cid)) => (
                        grid.rows
                            .iter()
                            .position(|r| r.id == *rid)
                            .map_or(Slot::Unknown, Slot::Known),
                        grid.columns
                            .iter()
                            .position(|c| c.id == *cid)
                            .map_or(Slot::Unknown, Slot::Known),
                    ),
                    _ => (Slot::Unknown, Slot::Unknown),
                };
                if key.0 == Slot::Unknown || key.1 == Slot::Unknown {
                    self.unknown += AnswerCount::ONE;
                }
                *counts.entry(key).or_insert(AnswerCount::EMPTY) += AnswerCount::ONE;
            }
        }
    }

    fn to_tally(&self, question: &Question) -> QuestionTally {
        match &self.tally {
            TallyInternal::Flat(counts) => {
                let opts = question.kind.options();
                let mut res: Vec<(String, u64)> = Vec::new();
                for (key, count) in counts.iter() {
                    let label = match key {
                        FlatKey::Option(idx) => opts[*idx].text.clone(),
                        FlatKey::Text(s) => s.clone(),
                        FlatKey::Unknown => UNKNOWN_LABEL.to_string(),
                    };
                    push_merged(&mut res, label, count.0);
                }
                QuestionTally::Counts(res)
            }
            TallyInternal::Grid(counts) => {
                let grid = question.kind.grid();
                let mut res: Vec<(String, Vec<(String, u64)>)> = Vec::new();
                for ((row, col), count) in counts.iter() {
                    let row_label = slot_label(row, |idx| grid.map(|g| g.rows[idx].text.clone()));
                    let col_label =
                        slot_label(col, |idx| grid.map(|g| g.columns[idx].text.clone()));
                    match res.iter_mut().find(|(r, _)| *r == row_label) {
                        Some((_, cols)) => push_merged(cols, col_label, count.0),
                        None => res.push((row_label, vec![(col_label, count.0)])),
                    }
                }
                QuestionTally::Grid(res)
            }
        }
    }
}

fn slot_label(slot: &Slot, known: impl Fn(usize) -> Option<String>) -> String {
    match slot {
        Slot::Known(idx) => known(*idx).unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
        Slot::Unknown => UNKNOWN_LABEL.to_string(),
    }
}

// Two options may share the same text: their counts end up under the same label.
fn push_merged(counts: &mut Vec<(String, u64)>, label: String, count: u64) {
    match counts.iter_mut().find(|(l, _)| *l == label) {
        Some((_, c)) => *c += count,
        None => counts.push((label, count)),
    }
}

// True when an option, a row or a column of the question is labelled like the unknown bucket.
fn uses_unknown_label(question: &Question) -> bool {
    let opts = question.kind.options().iter().map(|o| o.text.as_str());
    let grid_labels: Vec<&str> = match question.kind.grid() {
        Some(g) => g
            .rows
            .iter()
            .map(|r| r.text.as_str())
            .chain(g.columns.iter().map(|c| c.text.as_str()))
            .collect(),
        None => vec![],
    };
    opts.chain(grid_labels).any(|l| l == UNKNOWN_LABEL)
}

/// Computes the statistics of a survey from all the responses collected for it.
///
/// Aggregation never fails: answers that reference an option, a row or a column
/// that the question does not define are counted under [`UNKNOWN_LABEL`].
/// The result does not depend on the order of the responses.
///
/// Arguments:
/// * `survey` the survey, with its questions
/// * `responses` the responses to this survey. Responses to other surveys are ignored.
pub fn compute_statistics(survey: &Survey, responses: &[Response]) -> SurveyStatistics {
    info!(
        "compute_statistics: survey {}: processing {:?} responses for {:?} questions",
        survey.id(),
        responses.len(),
        survey.total_questions()
    );

    let positions: HashMap<QuestionId, usize> = survey
        .questions()
        .iter()
        .enumerate()
        .map(|(idx, q)| (q.id, idx))
        .collect();

    let mut accumulators: Vec<QuestionAccumulator> = survey
        .questions()
        .iter()
        .map(QuestionAccumulator::new)
        .collect();

    let mut total_responses = AnswerCount::EMPTY;
    for response in responses.iter() {
        if response.survey_id() != survey.id() {
            warn!(
                "compute_statistics: skipping a response to survey {} while processing survey {}",
                response.survey_id(),
                survey.id()
            );
            continue;
        }
        total_responses += AnswerCount::ONE;

        let mut answered: HashSet<usize> = HashSet::new();
        for answer in response.answers().iter() {
            match positions.get(&answer.question_id) {
                Some(&idx) => {
                    accumulators[idx].record(&survey.questions()[idx], &answer.value);
                    answered.insert(idx);
                }
                None => {
                    debug!(
                        "compute_statistics: answer for unknown question {}: {:?}",
                        answer.question_id, answer.value
                    );
                }
            }
        }
        for idx in answered {
            accumulators[idx].answered += AnswerCount::ONE;
        }
    }

    let mut questions: Vec<QuestionStatistics> = Vec::new();
    for (question, acc) in survey.questions().iter().zip(accumulators.iter()) {
        if acc.unknown > AnswerCount::EMPTY {
            warn!(
                "compute_statistics: question {}: {} answers reference removed options, counted as {:?}",
                question.id, acc.unknown.0, UNKNOWN_LABEL
            );
            if uses_unknown_label(question) {
                warn!(
                    "compute_statistics: question {}: one of its labels is {:?}: its count includes the unknown answers",
                    question.id, UNKNOWN_LABEL
                );
            }
        }
        let data = acc.to_tally(question);
        debug!(
            "compute_statistics: question {}: total_answers: {} data: {:?}",
            question.id, acc.answered.0, data
        );
        questions.push(QuestionStatistics {
            id: question.id,
            text: question.text.clone(),
            question_type: question.question_type(),
            total_answers: acc.answered.0,
            data,
        });
    }

    SurveyStatistics {
        survey: SurveySummary {
            id: survey.id().clone(),
            title: survey.title().to_string(),
            total_responses: total_responses.0,
        },
        questions,
    }
}

impl QuestionStatistics {
    /// Returns a copy of these statistics where every option (or every cell of a
    /// matrix) of the question appears, with a count of zero when nobody picked it.
    ///
    /// Labels are listed in definition order, followed by the unknown bucket if it
    /// is not empty. Open questions are returned unchanged.
    pub fn dense(&self, question: &Question) -> QuestionStatistics {
        let data = match (&self.data, &question.kind) {
            (
                QuestionTally::Counts(counts),
                QuestionKind::Single(opts) | QuestionKind::Multiple(opts),
            ) => {
                let mut res: Vec<(String, u64)> = Vec::new();
                for opt in opts.iter() {
                    if !res.iter().any(|(l, _)| *l == opt.text) {
                        res.push((opt.text.clone(), self.data.count(&opt.text)));
                    }
                }
                for (label, count) in counts.iter() {
                    if !res.iter().any(|(l, _)| l == label) {
                        res.push((label.clone(), *count));
                    }
                }
                QuestionTally::Counts(res)
            }
            (QuestionTally::Grid(rows), QuestionKind::Matrix(grid) | QuestionKind::MatrixMul(grid)) => {
                let mut col_labels: Vec<String> = Vec::new();
                for col in grid.columns.iter() {
                    if !col_labels.contains(&col.text) {
                        col_labels.push(col.text.clone());
                    }
                }
                for (_, cols) in rows.iter() {
                    for (label, _) in cols.iter() {
                        if !col_labels.contains(label) {
                            col_labels.push(label.clone());
                        }
                    }
                }
                let mut row_labels: Vec<String> = Vec::new();
                for row in grid.rows.iter() {
                    if !row_labels.contains(&row.text) {
                        row_labels.push(row.text.clone());
                    }
                }
                for (label, _) in rows.iter() {
                    if !row_labels.contains(label) {
                        row_labels.push(label.clone());
                    }
                }
                QuestionTally::Grid(
                    row_labels
                        .iter()
                        .map(|r| {
                            let cols = col_labels
                                .iter()
                                .map(|c| (c.clone(), self.data.cell(r, c)))
                                .collect();
                            (r.clone(), cols)
                        })
                        .collect(),
                )
            }
            _ => self.data.clone(),
        };
        QuestionStatistics {
            data,
            ..self.clone()
        }
    }

    /// The share of each label of a flat tally, as a percentage.
    ///
    /// For multiple choice questions, the reference is the number of responses that
    /// answered the question, so that the shares may add up to more than 100%.
    /// For the other questions, it is the number of answers. Grids have no shares.
    pub fn shares(&self) -> Vec<OptionShare> {
        let counts = match &self.data {
            QuestionTally::Counts(c) => c,
            QuestionTally::Grid(_) => return vec![],
        };
        let reference = match self.question_type {
            QuestionType::Multiple => self.total_answers,
            _ => self.data.total(),
        };
        counts
            .iter()
            .map(|(label, count)| OptionShare {
                label: label.clone(),
                count: *count,
                percentage: if reference > 0 {
                    (*count as f64) * 100.0 / (reference as f64)
                } else {
                    0.0
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::builder::SurveyBuilder;
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::{BTreeMap, BTreeSet};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 11, 20, 7, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        t0() + Duration::hours(5)
    }

    fn builder() -> SurveyBuilder {
        SurveyBuilder::new("s-stats", "Statistics", t0(), t0() + Duration::days(3)).unwrap()
    }

    fn submit(survey: &Survey, inputs: Vec<(QuestionId, RawAnswer)>) -> Response {
        let inputs: HashMap<QuestionId, RawAnswer> = inputs.into_iter().collect();
        assemble_response(survey, &inputs, Respondent::default(), now()).unwrap()
    }

    fn option_id(survey: &Survey, qid: QuestionId, label: &str) -> OptionId {
        survey
            .question(qid)
            .unwrap()
            .kind
            .options()
            .iter()
            .find(|o| o.text == label)
            .unwrap()
            .id
    }

    #[test]
    fn three_single_choice_responses() {
        init_logs();
        let mut b = builder();
        let q = b.add_single("Pick one", &["X", "Y"], true).unwrap();
        let s = b.build().unwrap();
        let x = option_id(&s, q, "X");
        let y = option_id(&s, q, "Y");
        let responses: Vec<Response> = [x, x, y]
            .iter()
            .map(|oid| submit(&s, vec![(q, RawAnswer::Single(Some(*oid)))]))
            .collect();

        let stats = compute_statistics(&s, &responses);
        assert_eq!(stats.survey.total_responses, 3);
        assert_eq!(stats.survey.title, "Statistics");
        let qs = &stats.questions[0];
        assert_eq!(qs.total_answers, 3);
        assert_eq!(
            qs.data,
            QuestionTally::Counts(vec![("X".to_string(), 2), ("Y".to_string(), 1)])
        );
        assert_eq!(qs.data.total(), qs.total_answers);
    }

    #[test]
    fn multiple_choice_counts_the_response_once() {
        let mut b = builder();
        let q = b.add_multiple("Pick some", &["A", "B", "C"], true).unwrap();
        let s = b.build().unwrap();
        let selected: BTreeSet<OptionId> = ["A", "C"].iter().map(|l| option_id(&s, q, l)).collect();
        let r = submit(&s, vec![(q, RawAnswer::Multiple(selected))]);
        assert_eq!(r.answers().len(), 2);

        let stats = compute_statistics(&s, &[r]);
        let qs = &stats.questions[0];
        assert_eq!(qs.total_answers, 1);
        assert_eq!(
            qs.data,
            QuestionTally::Counts(vec![("A".to_string(), 1), ("C".to_string(), 1)])
        );
    }

    #[test]
    fn empty_response_list() {
        let mut b = builder();
        b.add_single("One", &["a"], true).unwrap();
        b.add_matrix("Grid", &["r"], &["c"], true).unwrap();
        b.add_open("Text", false).unwrap();
        let s = b.build().unwrap();
        let stats = compute_statistics(&s, &[]);
        assert_eq!(stats.survey.total_responses, 0);
        assert_eq!(stats.questions.len(), 3);
        for qs in stats.questions.iter() {
            assert_eq!(qs.total_answers, 0);
            assert!(qs.data.is_empty());
        }
    }

    #[test]
    fn one_answer_per_answered_question() {
        let mut b = builder();
        let single = b.add_single("Single", &["a", "b"], false).unwrap();
        let matrix = b.add_matrix("Matrix", &["r1", "r2"], &["c1", "c2"], false).unwrap();
        let open = b.add_open("Open", false).unwrap();
        let skipped = b.add_open("Skipped", false).unwrap();
        let s = b.build().unwrap();
        let grid = s.question(matrix).unwrap().kind.grid().unwrap().clone();
        let cells: BTreeMap<RowId, ColumnId> = grid
            .rows
            .iter()
            .map(|r| (r.id, grid.columns[1].id))
            .collect();
        let r = submit(
            &s,
            vec![
                (single, RawAnswer::Single(Some(option_id(&s, single, "b")))),
                (matrix, RawAnswer::Matrix(cells)),
                (open, RawAnswer::Open("fine".to_string())),
            ],
        );
        let stats = compute_statistics(&s, &[r]);
        let totals: Vec<u64> = stats.questions.iter().map(|q| q.total_answers).collect();
        assert_eq!(totals, vec![1, 1, 1, 0]);
        assert_eq!(stats.questions[1].data.cell("r1", "c2"), 1);
        assert_eq!(stats.questions[1].data.cell("r2", "c2"), 1);
        assert_eq!(stats.questions[1].data.cell("r2", "c1"), 0);
        assert_eq!(stats.questions[2].data.count("fine"), 1);
        assert_eq!(stats.questions[3].id, skipped);
    }

    #[test]
    fn matrix_mul_counts_every_cell() {
        let mut b = builder();
        let q = b.add_matrix_mul("When", &["AM", "PM"], &["Mon", "Tue"], true).unwrap();
        let s = b.build().unwrap();
        let grid = s.question(q).unwrap().kind.grid().unwrap().clone();
        let all_cols: BTreeSet<ColumnId> = grid.columns.iter().map(|c| c.id).collect();
        let cells: BTreeMap<RowId, BTreeSet<ColumnId>> =
            grid.rows.iter().map(|r| (r.id, all_cols.clone())).collect();
        let r1 = submit(&s, vec![(q, RawAnswer::MatrixMul(cells.clone()))]);
        let r2 = submit(&s, vec![(q, RawAnswer::MatrixMul(cells))]);
        let stats = compute_statistics(&s, &[r1, r2]);
        let qs = &stats.questions[0];
        assert_eq!(qs.total_answers, 2);
        assert_eq!(qs.data.total(), 8);
        assert_eq!(
            qs.data,
            QuestionTally::Grid(vec![
                (
                    "AM".to_string(),
                    vec![("Mon".to_string(), 2), ("Tue".to_string(), 2)]
                ),
                (
                    "PM".to_string(),
                    vec![("Mon".to_string(), 2), ("Tue".to_string(), 2)]
                ),
            ])
        );
    }

    #[test]
    fn open_answers_are_grouped_by_text() {
        let mut b = builder();
        let q = b.add_open("Why?", false).unwrap();
        let s = b.build().unwrap();
        let responses: Vec<Response> = ["because", "why not", "because", "  "]
            .iter()
            .map(|t| submit(&s, vec![(q, RawAnswer::Open(t.to_string()))]))
            .collect();
        let stats = compute_statistics(&s, &responses);
        assert_eq!(stats.survey.total_responses, 4);
        let qs = &stats.questions[0];
        assert_eq!(qs.total_answers, 3);
        assert_eq!(
            qs.data,
            QuestionTally::Counts(vec![("because".to_string(), 2), ("why not".to_string(), 1)])
        );
    }

    #[test]
    fn removed_options_go_to_unknown() {
        init_logs();
        let mut b = builder();
        let q = b.add_single("Pick", &["Keep"], true).unwrap();
        let mq = b.add_matrix("Grid", &["r"], &["c"], true).unwrap();
        let s = b.build().unwrap();
        let keep = option_id(&s, q, "Keep");
        let grid = s.question(mq).unwrap().kind.grid().unwrap().clone();
        let answers = vec![
            AnswerRecord {
                question_id: q,
                value: AnswerValue::Selected(OptionId(9000)),
            },
            AnswerRecord {
                question_id: mq,
                value: AnswerValue::Cell(grid.rows[0].id, ColumnId(9001)),
            },
        ];
        let stored = Response::from_records(s.id().clone(), Respondent::default(), None, answers);
        let fresh = submit(
            &s,
            vec![
                (q, RawAnswer::Single(Some(keep))),
                (
                    mq,
                    RawAnswer::Matrix([(grid.rows[0].id, grid.columns[0].id)].into_iter().collect()),
                ),
            ],
        );
        let stats = compute_statistics(&s, &[stored, fresh]);
        let single = &stats.questions[0];
        assert_eq!(
            single.data,
            QuestionTally::Counts(vec![("Keep".to_string(), 1), (UNKNOWN_LABEL.to_string(), 1)])
        );
        assert_eq!(single.data.total(), single.total_answers);
        let matrix = &stats.questions[1];
        assert_eq!(matrix.data.cell("r", UNKNOWN_LABEL), 1);
        assert_eq!(matrix.data.cell("r", "c"), 1);
        assert_eq!(matrix.total_answers, 2);
    }

    #[test]
    fn option_labelled_like_the_unknown_bucket() {
        init_logs();
        let mut b = builder();
        let q = b.add_single("Pick", &[UNKNOWN_LABEL, "Yes"], true).unwrap();
        let other = b.add_single("Other", &["A"], true).unwrap();
        let s = b.build().unwrap();
        assert!(uses_unknown_label(s.question(q).unwrap()));
        assert!(!uses_unknown_label(s.question(other).unwrap()));

        let picked = submit(
            &s,
            vec![
                (q, RawAnswer::Single(Some(option_id(&s, q, UNKNOWN_LABEL)))),
                (other, RawAnswer::Single(Some(option_id(&s, other, "A")))),
            ],
        );
        let removed = Response::from_records(
            s.id().clone(),
            Respondent::default(),
            None,
            vec![AnswerRecord {
                question_id: q,
                value: AnswerValue::Selected(OptionId(9000)),
            }],
        );
        let stats = compute_statistics(&s, &[picked, removed]);
        assert_eq!(
            stats.questions[0].data,
            QuestionTally::Counts(vec![(UNKNOWN_LABEL.to_string(), 2)])
        );
        assert_eq!(stats.questions[0].total_answers, 2);
    }

    #[test]
    fn responses_to_other_surveys_are_ignored() {
        let mut b = builder();
        let q = b.add_open("Text", false).unwrap();
        let s = b.build().unwrap();
        let foreign = Response::from_records(
            SurveyId("other".to_string()),
            Respondent::default(),
            None,
            vec![AnswerRecord {
                question_id: q,
                value: AnswerValue::Text("hi".to_string()),
            }],
        );
        let stats = compute_statistics(&s, &[foreign]);
        assert_eq!(stats.survey.total_responses, 0);
        assert!(stats.questions[0].data.is_empty());
    }

    #[test]
    fn order_of_responses_does_not_matter() {
        let mut b = builder();
        let single = b.add_single("Single", &["a", "b", "c"], true).unwrap();
        let multi = b.add_multiple("Multi", &["x", "y"], false).unwrap();
        let open = b.add_open("Open", false).unwrap();
        let s = b.build().unwrap();
        let mut responses: Vec<Response> = Vec::new();
        for (idx, label) in ["c", "a", "b", "a", "c", "c"].iter().enumerate() {
            let picks: BTreeSet<OptionId> = ["x", "y"]
                .iter()
                .take(idx % 3)
                .map(|l| option_id(&s, multi, l))
                .collect();
            responses.push(submit(
                &s,
                vec![
                    (single, RawAnswer::Single(Some(option_id(&s, single, label)))),
                    (multi, RawAnswer::Multiple(picks)),
                    (open, RawAnswer::Open(format!("note {}", idx % 2))),
                ],
            ));
        }
        let forward = compute_statistics(&s, &responses);
        responses.reverse();
        let backward = compute_statistics(&s, &responses);
        responses.rotate_left(2);
        let rotated = compute_statistics(&s, &responses);
        assert_eq!(forward, backward);
        assert_eq!(forward, rotated);
        assert_eq!(
            forward.questions[0].data,
            QuestionTally::Counts(vec![
                ("a".to_string(), 2),
                ("b".to_string(), 1),
                ("c".to_string(), 3)
            ])
        );
    }

    #[test]
    fn dense_fills_missing_options_and_cells() {
        let mut b = builder();
        let q = b.add_single("Pick", &["A", "B", "C"], true).unwrap();
        let mq = b.add_matrix("Grid", &["r1", "r2"], &["c1", "c2"], false).unwrap();
        let s = b.build().unwrap();
        let grid = s.question(mq).unwrap().kind.grid().unwrap().clone();
        let r = submit(
            &s,
            vec![
                (q, RawAnswer::Single(Some(option_id(&s, q, "B")))),
                (
                    mq,
                    RawAnswer::Matrix([(grid.rows[1].id, grid.columns[0].id)].into_iter().collect()),
                ),
            ],
        );
        let stats = compute_statistics(&s, &[r]);
        let dense = stats.questions[0].dense(s.question(q).unwrap());
        assert_eq!(
            dense.data,
            QuestionTally::Counts(vec![
                ("A".to_string(), 0),
                ("B".to_string(), 1),
                ("C".to_string(), 0)
            ])
        );
        let dense_grid = stats.questions[1].dense(s.question(mq).unwrap());
        assert_eq!(
            dense_grid.data,
            QuestionTally::Grid(vec![
                (
                    "r1".to_string(),
                    vec![("c1".to_string(), 0), ("c2".to_string(), 0)]
                ),
                (
                    "r2".to_string(),
                    vec![("c1".to_string(), 1), ("c2".to_string(), 0)]
                ),
            ])
        );
        assert_eq!(dense_grid.total_answers, 1);
    }

    #[test]
    fn shares_use_answering_responses_for_multiple_choice() {
        let mut b = builder();
        let q = b.add_multiple("Pick", &["A", "B"], true).unwrap();
        let s = b.build().unwrap();
        let both: BTreeSet<OptionId> = ["A", "B"].iter().map(|l| option_id(&s, q, l)).collect();
        let only_a: BTreeSet<OptionId> = [option_id(&s, q, "A")].into_iter().collect();
        let responses = vec![
            submit(&s, vec![(q, RawAnswer::Multiple(both))]),
            submit(&s, vec![(q, RawAnswer::Multiple(only_a))]),
        ];
        let stats = compute_statistics(&s, &responses);
        let shares = stats.questions[0].shares();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].label, "A");
        assert!((shares[0].percentage - 100.0).abs() < 1e-9);
        assert!((shares[1].percentage - 50.0).abs() < 1e-9);
    }
}
