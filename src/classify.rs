//! Response Classifier
//!
//! Pure mapping from one question's statistics block to the set of
//! responder ids who answered it incorrectly. No I/O; everything here is
//! driven by the declared question type:
//!
//! - flat types carry one `answers` list with `correct` flags
//! - blank/dropdown types nest their answers under `answer_sets`
//! - written types use `full_credit` flags and an `"ungraded"` bucket
//!
//! An empty result collapses to the `"none"` sentinel set rather than an
//! empty set; callers must filter the sentinel before creating records.

use std::collections::BTreeSet;

use crate::lms::types::{AnswerStatistic, QuestionStatistic};
use crate::models::NONE_RESPONDER;

/// Answer id the LMS assigns to written responses nobody has graded yet.
/// Never contributes responders, regardless of its flags.
pub const UNGRADED_ANSWER_ID: &str = "ungraded";

/// The three classification families plus a bucket for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationFamily {
    /// Single answer list, each answer flagged correct/incorrect.
    Flat,
    /// Nested answer sets (one per blank/dropdown), same flagging rule.
    AnswerSets,
    /// Free-response: correctness is a "full credit" flag.
    Written,
    /// Unrecognized type; classifies to the sentinel, never an error.
    Unknown,
}

impl ClassificationFamily {
    pub fn of(question_type: &str) -> Self {
        match question_type {
            "multiple_choice_question"
            | "true_false_question"
            | "multiple_answers_question"
            | "short_answer_question"
            | "numerical_question"
            | "matching_question" => ClassificationFamily::Flat,
            "fill_in_multiple_blanks_question" | "multiple_dropdowns_question" => {
                ClassificationFamily::AnswerSets
            }
            "essay_question" | "calculated_question" => ClassificationFamily::Written,
            _ => ClassificationFamily::Unknown,
        }
    }
}

/// Check that a statistics block carries the answer structure its declared
/// type requires. Returns the reason it is malformed, if it is.
pub fn malformed_reason(stat: &QuestionStatistic) -> Option<&'static str> {
    match ClassificationFamily::of(&stat.question_type) {
        ClassificationFamily::Flat | ClassificationFamily::Written
            if stat.answers.is_none() =>
        {
            Some("missing answers list for its declared question type")
        }
        ClassificationFamily::AnswerSets if stat.answer_sets.is_none() => {
            Some("missing answer_sets for its declared question type")
        }
        _ => None,
    }
}

/// The set of responder ids who answered this question incorrectly.
///
/// Never empty: when no identifiable responder answered incorrectly the
/// result is the single-element sentinel set. When any real id is present
/// the sentinel is excluded.
pub fn incorrect_responders(stat: &QuestionStatistic) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();

    match ClassificationFamily::of(&stat.question_type) {
        ClassificationFamily::Flat => {
            if let Some(answers) = &stat.answers {
                collect_incorrect(answers, &mut ids);
            }
        }
        ClassificationFamily::AnswerSets => {
            if let Some(sets) = &stat.answer_sets {
                for set in sets {
                    collect_incorrect(&set.answers, &mut ids);
                }
            }
        }
        ClassificationFamily::Written => {
            if let Some(answers) = &stat.answers {
                for answer in answers {
                    if answer.id.as_deref() == Some(UNGRADED_ANSWER_ID) {
                        continue;
                    }
                    if answer.full_credit != Some(true) {
                        extend_ids(answer, &mut ids);
                    }
                }
            }
        }
        ClassificationFamily::Unknown => {}
    }

    if ids.is_empty() {
        ids.insert(NONE_RESPONDER.to_string());
    }
    ids
}

fn collect_incorrect(answers: &[AnswerStatistic], ids: &mut BTreeSet<String>) {
    for answer in answers {
        if answer.correct == Some(false) {
            extend_ids(answer, ids);
        }
    }
}

fn extend_ids(answer: &AnswerStatistic, ids: &mut BTreeSet<String>) {
    if let Some(user_ids) = &answer.user_ids {
        ids.extend(user_ids.iter().cloned());
    }
}
