//! End-to-end pipeline scenarios against fake collaborators.

use std::sync::atomic::Ordering;

use remedia::errors::UpstreamError;
use remedia::models::SweepStatus;
use remedia::store::{QuestionStore, StudentRecordStore};

use super::helpers::*;

const COURSE: &str = "c1";
const TOKEN: &str = "test-token";

#[tokio::test]
async fn mixed_quiz_scenario_records_both_misses() {
    // One quiz with a multiple-choice question missed by s1 and a written
    // question where s1 got no credit (plus an ungraded bucket that must
    // not count).
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1", "s2"]).with_stats(
        "q1",
        vec![
            flat_question("101", "<p>What is 2+2?</p>", &["s1"]),
            written_question("102", "Explain long division.", &["s2"], &["s1"]),
        ],
    );
    let h = harness(lms, FakeTopicNamer::returning("Arithmetic"), FakeVideoFinder::default());

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.quizzes_processed, 1);
    assert!(report.issues.is_empty());

    let record = h
        .pipeline
        .store()
        .get_record("s1", COURSE)
        .await
        .unwrap()
        .expect("s1 should have a record");
    assert_eq!(record.quizzes.len(), 1);
    let entry = &record.quizzes["Quiz One"];
    let missed: Vec<&str> = entry
        .missed_questions
        .iter()
        .map(|m| m.question_id.as_str())
        .collect();
    assert_eq!(missed, vec!["101", "102"]);
    // Question text was reduced to plain text on the way in.
    assert_eq!(entry.missed_questions[0].question_text, "What is 2+2?");

    // s2 only appears in the ungraded bucket and gets no record.
    assert!(h.pipeline.store().get_record("s2", COURSE).await.unwrap().is_none());
}

#[tokio::test]
async fn double_ingest_is_idempotent() {
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"]).with_stats(
        "q1",
        vec![
            flat_question("101", "first", &["s1"]),
            flat_question("102", "second", &["s1"]),
        ],
    );
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    h.pipeline.ingest_course(COURSE, TOKEN).await;
    let first = h.pipeline.store().get_record("s1", COURSE).await.unwrap().unwrap();

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.students_updated, 0);

    let second = h.pipeline.store().get_record("s1", COURSE).await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(second.quizzes["Quiz One"].missed_questions.len(), 2);
}

#[tokio::test]
async fn unattributed_and_unenrolled_responders_create_no_records() {
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"]).with_stats(
        "q1",
        vec![
            // Incorrect but with no responder list → sentinel.
            flat_question("101", "first", &[]),
            // Responder who is not an active enrollment.
            flat_question("102", "second", &["ghost"]),
        ],
    );
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.students_updated, 0);
    assert!(h.pipeline.store().get_record("ghost", COURSE).await.unwrap().is_none());
    assert!(h.pipeline.store().get_record("none", COURSE).await.unwrap().is_none());
}

#[tokio::test]
async fn statistics_failure_skips_quiz_not_sweep() {
    let lms = FakeLms::new(&[("q1", "Quiz One"), ("q2", "Quiz Two")], &["s1"])
        .with_stats("q1", vec![flat_question("101", "first", &["s1"])])
        .fail_stats_for(
            "q2",
            UpstreamError::HttpStatus {
                status: 500,
                message: "internal".to_string(),
            },
        );
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.quizzes_processed, 1);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].quiz_id.as_deref(), Some("q2"));
    assert!(h.pipeline.store().get_record("s1", COURSE).await.unwrap().is_some());
}

#[tokio::test]
async fn credential_rejection_aborts_course() {
    let lms = FakeLms::new(&[("q1", "Quiz One"), ("q2", "Quiz Two")], &["s1"])
        .fail_stats_for("q1", UpstreamError::Authentication("401".to_string()))
        .with_stats("q2", vec![flat_question("201", "second", &["s1"])]);
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Failed);
    // The sweep stopped at the rejected credential; quiz two never ran.
    assert_eq!(h.lms.stats_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_question_is_skipped_and_reported() {
    let mut broken = flat_question("101", "broken", &["s1"]);
    broken.answers = None; // flat type without an answers list
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"])
        .with_stats("q1", vec![broken, flat_question("102", "fine", &["s1"])]);
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    let report = h.pipeline.ingest_course(COURSE, TOKEN).await;
    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].question_id.as_deref(), Some("101"));

    let record = h.pipeline.store().get_record("s1", COURSE).await.unwrap().unwrap();
    assert_eq!(record.missed_count(), 1);
}

#[tokio::test]
async fn concurrent_sweeps_of_same_course_are_single_flight() {
    let mut lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"]);
    lms.listing_delay_ms = 50;
    let h = harness(lms, FakeTopicNamer::returning("Topic"), FakeVideoFinder::default());

    let (a, b) = tokio::join!(
        h.pipeline.ingest_course(COURSE, TOKEN),
        h.pipeline.ingest_course(COURSE, TOKEN),
    );

    let statuses = [a.status, b.status];
    assert!(statuses.contains(&SweepStatus::Completed));
    assert!(statuses.contains(&SweepStatus::Skipped));
}

#[tokio::test]
async fn resolver_names_topics_and_reuses_videos() {
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"]).with_stats(
        "q1",
        vec![
            flat_question("101", "What is 1/2 + 1/4?", &["s1"]),
            flat_question("102", "Add the fractions 2/3 and 1/6.", &["s1"]),
        ],
    );
    // Both questions name to the same topic; the video lookup must only
    // happen once, the second question reuses the indexed video.
    let namer = FakeTopicNamer::returning("Adding Fractions");
    let finder = FakeVideoFinder::default().with_video("Adding Fractions", "https://v/fractions");
    let h = harness(lms, namer, finder);

    h.pipeline.ingest_course(COURSE, TOKEN).await;
    let report = h.pipeline.resolve_topics_and_videos(COURSE, "Math 101").await;

    assert_eq!(report.topics_named, 2);
    assert_eq!(report.videos_found, 1);
    assert_eq!(report.videos_reused, 1);
    assert!(report.issues.is_empty());
    assert_eq!(h.finder.calls.load(Ordering::SeqCst), 1);

    for id in ["101", "102"] {
        let q = h.pipeline.store().get_question("q1", id).await.unwrap().unwrap();
        assert_eq!(q.core_topic.as_deref(), Some("Adding Fractions"));
        assert_eq!(q.video.unwrap().link, "https://v/fractions");
    }
}

#[tokio::test]
async fn topic_timeout_leaves_question_retryable() {
    let lms = FakeLms::new(&[("q1", "Quiz One")], &["s1"])
        .with_stats("q1", vec![flat_question("101", "What is a limit?", &["s1"])]);
    let namer = FakeTopicNamer::returning("Limits").failing_first(1);
    let finder = FakeVideoFinder::default().with_video("Limits", "https://v/limits");
    let h = harness(lms, namer, finder);

    h.pipeline.ingest_course(COURSE, TOKEN).await;

    // First resolution: the naming call times out, the field stays unset.
    let report = h.pipeline.resolve_topics_and_videos(COURSE, "Calc I").await;
    assert_eq!(report.topics_named, 0);
    assert_eq!(report.issues.len(), 1);
    let q = h.pipeline.store().get_question("q1", "101").await.unwrap().unwrap();
    assert!(q.core_topic.is_none());
    assert!(q.video.is_none());

    // Next sweep retries and succeeds.
    let report = h.pipeline.resolve_topics_and_videos(COURSE, "Calc I").await;
    assert_eq!(report.topics_named, 1);
    assert_eq!(report.videos_found, 1);
    let q = h.pipeline.store().get_question("q1", "101").await.unwrap().unwrap();
    assert_eq!(q.core_topic.as_deref(), Some("Limits"));
    assert_eq!(q.video.unwrap().link, "https://v/limits");
}

#[tokio::test]
async fn end_to_end_recommendations_dedup_videos() {
    let lms = FakeLms::new(&[("q1", "Quiz One"), ("q2", "Quiz Two")], &["s1"])
        .with_stats(
            "q1",
            vec![
                flat_question("101", "fraction question one", &["s1"]),
                flat_question("102", "fraction question two", &["s1"]),
            ],
        )
        .with_stats("q2", vec![flat_question("201", "decimal question", &["s1"])]);
    let namer = FakeTopicNamer::returning("Fractions")
        .with_topic("decimal question", "Decimals");
    let finder = FakeVideoFinder::default()
        .with_video("Fractions", "https://v/fractions")
        .with_video("Decimals", "https://v/decimals");
    let h = harness(lms, namer, finder);

    h.pipeline.ingest_course(COURSE, TOKEN).await;
    h.pipeline.resolve_topics_and_videos(COURSE, "Math 101").await;

    let recs = h
        .pipeline
        .recommendations_for_student("s1", COURSE)
        .await
        .unwrap();

    // Two fraction questions share one video; one recommendation each for
    // the fraction video and the decimal video.
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].quiz_name, "Quiz One");
    assert_eq!(recs[0].video.link, "https://v/fractions");
    assert_eq!(recs[1].quiz_name, "Quiz Two");
    assert_eq!(recs[1].video.link, "https://v/decimals");
}

#[tokio::test]
async fn unknown_student_gets_empty_recommendations() {
    let h = harness(
        FakeLms::new(&[], &[]),
        FakeTopicNamer::returning("Topic"),
        FakeVideoFinder::default(),
    );
    let recs = h
        .pipeline
        .recommendations_for_student("nobody", COURSE)
        .await
        .unwrap();
    assert!(recs.is_empty());
}

#[tokio::test]
async fn course_context_feeds_the_topic_namer() {
    let h = harness(
        FakeLms::new(&[], &[]),
        FakeTopicNamer::returning("Topic"),
        FakeVideoFinder::default(),
    );
    h.pipeline
        .set_course_context(COURSE, "Remedial algebra, US grade 9")
        .await
        .unwrap();

    use remedia::store::CourseContextStore;
    assert_eq!(
        h.pipeline.store().get_context(COURSE).await.unwrap().as_deref(),
        Some("Remedial algebra, US grade 9")
    );
}
