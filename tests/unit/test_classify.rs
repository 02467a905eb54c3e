//! Unit tests for the response classifier
//!
//! Tests cover:
//! - Per-family incorrect-responder rules
//! - The "none" sentinel and its exclusion when real ids exist
//! - The "ungraded" bucket for written questions
//! - Malformed-payload detection

use remedia::classify::{incorrect_responders, malformed_reason};
use remedia::lms::types::{AnswerSetStatistic, AnswerStatistic, QuestionStatistic};
use remedia::models::NONE_RESPONDER;

fn answer(id: &str, correct: Option<bool>, user_ids: &[&str]) -> AnswerStatistic {
    AnswerStatistic {
        id: Some(id.to_string()),
        correct,
        user_ids: Some(user_ids.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

fn written_answer(id: &str, full_credit: Option<bool>, user_ids: &[&str]) -> AnswerStatistic {
    AnswerStatistic {
        id: Some(id.to_string()),
        full_credit,
        user_ids: Some(user_ids.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

fn question(question_type: &str) -> QuestionStatistic {
    QuestionStatistic {
        id: "q1".to_string(),
        question_text: "text".to_string(),
        question_type: question_type.to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Flat (single answer list) questions
// ============================================================================

mod flat_tests {
    use super::*;

    #[test]
    fn unions_responders_of_incorrect_answers() {
        let mut stat = question("multiple_choice_question");
        stat.answers = Some(vec![
            answer("a", Some(true), &["10"]),
            answer("b", Some(false), &["11", "12"]),
            answer("c", Some(false), &["12", "13"]),
        ]);
        let ids = incorrect_responders(&stat);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["11", "12", "13"]
        );
    }

    #[test]
    fn correct_answers_contribute_nothing() {
        let mut stat = question("true_false_question");
        stat.answers = Some(vec![answer("a", Some(true), &["10", "11"])]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(NONE_RESPONDER));
    }

    #[test]
    fn sentinel_excluded_when_real_ids_present() {
        let mut stat = question("multiple_answers_question");
        stat.answers = Some(vec![
            // No responder list on this incorrect answer.
            AnswerStatistic {
                id: Some("a".to_string()),
                correct: Some(false),
                user_ids: None,
                ..Default::default()
            },
            answer("b", Some(false), &["42"]),
        ]);
        let ids = incorrect_responders(&stat);
        assert!(ids.contains("42"));
        assert!(!ids.contains(NONE_RESPONDER));
    }

    #[test]
    fn incorrect_answer_without_responders_yields_sentinel() {
        let mut stat = question("multiple_choice_question");
        stat.answers = Some(vec![AnswerStatistic {
            id: Some("a".to_string()),
            correct: Some(false),
            user_ids: None,
            ..Default::default()
        }]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(NONE_RESPONDER));
    }
}

// ============================================================================
// Answer-set (nested) questions
// ============================================================================

mod answer_set_tests {
    use super::*;

    #[test]
    fn unions_across_nested_sets() {
        let mut stat = question("fill_in_multiple_blanks_question");
        stat.answer_sets = Some(vec![
            AnswerSetStatistic {
                id: Some("blank1".to_string()),
                answers: vec![
                    answer("a", Some(true), &["1"]),
                    answer("b", Some(false), &["2"]),
                ],
                ..Default::default()
            },
            AnswerSetStatistic {
                id: Some("blank2".to_string()),
                answers: vec![answer("c", Some(false), &["3"])],
                ..Default::default()
            },
        ]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["2", "3"]);
    }

    #[test]
    fn all_correct_sets_yield_sentinel() {
        let mut stat = question("multiple_dropdowns_question");
        stat.answer_sets = Some(vec![AnswerSetStatistic {
            answers: vec![answer("a", Some(true), &["1"])],
            ..Default::default()
        }]);
        let ids = incorrect_responders(&stat);
        assert!(ids.contains(NONE_RESPONDER));
    }
}

// ============================================================================
// Written questions
// ============================================================================

mod written_tests {
    use super::*;

    #[test]
    fn includes_non_full_credit_responders() {
        let mut stat = question("essay_question");
        stat.answers = Some(vec![
            written_answer("1", Some(true), &["20"]),
            written_answer("2", Some(false), &["21"]),
            written_answer("3", None, &["22"]),
        ]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["21", "22"]);
    }

    #[test]
    fn ungraded_bucket_never_contributes() {
        let mut stat = question("essay_question");
        stat.answers = Some(vec![
            written_answer("ungraded", Some(false), &["30"]),
            written_answer("2", Some(false), &["31"]),
        ]);
        let ids = incorrect_responders(&stat);
        assert!(!ids.contains("30"));
        assert!(ids.contains("31"));
    }

    #[test]
    fn only_ungraded_yields_sentinel() {
        let mut stat = question("calculated_question");
        stat.answers = Some(vec![written_answer("ungraded", None, &["30"])]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(NONE_RESPONDER));
    }
}

// ============================================================================
// Unknown types and malformed payloads
// ============================================================================

mod edge_case_tests {
    use super::*;

    #[test]
    fn unknown_type_yields_sentinel_not_error() {
        let mut stat = question("file_upload_question");
        stat.answers = Some(vec![answer("a", Some(false), &["1"])]);
        let ids = incorrect_responders(&stat);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(NONE_RESPONDER));
    }

    #[test]
    fn flat_without_answers_is_malformed() {
        let stat = question("multiple_choice_question");
        assert!(malformed_reason(&stat).is_some());
    }

    #[test]
    fn answer_set_type_without_sets_is_malformed() {
        let mut stat = question("multiple_dropdowns_question");
        stat.answers = Some(vec![answer("a", Some(false), &["1"])]);
        assert!(malformed_reason(&stat).is_some());
    }

    #[test]
    fn well_formed_payloads_pass_validation() {
        let mut flat = question("multiple_choice_question");
        flat.answers = Some(vec![]);
        assert!(malformed_reason(&flat).is_none());

        let mut nested = question("fill_in_multiple_blanks_question");
        nested.answer_sets = Some(vec![]);
        assert!(malformed_reason(&nested).is_none());

        // Unknown types are never malformed; they classify to the sentinel.
        let unknown = question("text_only_question");
        assert!(malformed_reason(&unknown).is_none());
    }
}
