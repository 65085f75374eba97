use time::macros::datetime;
use time::OffsetDateTime;

use crate::schemas::{ExamPayload, Question};
use crate::session::monitor::{ClientSignal, Key};
use crate::session::{
    ExamOrigin, ExamSession, FinishReason, FinishedAttempt, SessionEffect, SessionEvent,
    SessionPhase,
};

const NOW: OffsetDateTime = datetime!(2026-05-01 09:00:00 UTC);
const LATER: OffsetDateTime = datetime!(2026-05-01 09:10:00 UTC);

fn question(text: &str, options: &[&str], answer: &str) -> Question {
    Question {
        text: text.to_string(),
        options: options.iter().map(|option| option.to_string()).collect(),
        answer: answer.to_string(),
        explanation: "Because.".to_string(),
        question_image: None,
        explanation_image: None,
    }
}

fn two_question_payload() -> ExamPayload {
    ExamPayload {
        title: "Unit test exam".to_string(),
        duration_minutes: 1,
        questions: vec![
            question("Q1", &["a", "b"], "a"),
            question("Q2", &["a", "b"], "b"),
        ],
    }
}

fn preview_session() -> ExamSession {
    ExamSession::new(two_question_payload(), ExamOrigin::Preview)
}

fn activate(session: &mut ExamSession) {
    session.handle(SessionEvent::NameSubmitted("Dana".to_string()), NOW);
    session.handle(SessionEvent::GraceElapsed, NOW);
    assert_eq!(session.phase(), SessionPhase::Active);
}

fn finished(effects: &[SessionEffect]) -> Option<&FinishedAttempt> {
    effects.iter().find_map(|effect| match effect {
        SessionEffect::Finished(outcome) => Some(outcome.as_ref()),
        _ => None,
    })
}

fn submit(session: &mut ExamSession, now: OffsetDateTime) -> Vec<SessionEffect> {
    session.handle(SessionEvent::SubmitRequested, now);
    session.handle(SessionEvent::SubmitConfirmed, now)
}

#[test]
fn manual_flow_scores_one_correct_of_two() {
    let mut session = preview_session();
    activate(&mut session);

    session.handle(
        SessionEvent::OptionSelected { question: 0, option: "a".to_string() },
        NOW,
    );
    session.handle(
        SessionEvent::OptionSelected { question: 1, option: "a".to_string() },
        NOW,
    );

    let effects = submit(&mut session, LATER);
    let outcome = finished(&effects).expect("finished effect");

    assert_eq!(outcome.reason, FinishReason::Submitted);
    assert_eq!(outcome.score.correct, 1);
    assert_eq!(outcome.score.total, 2);
    assert_eq!(outcome.score.percent, 50);
    assert_eq!(outcome.score.rating, "Just made it!");
    assert!(outcome.record.is_none(), "preview attempts are not persisted");
    assert!(session.download_available());
    assert!(!session.submit_enabled());
}

#[test]
fn empty_name_keeps_session_in_entry() {
    let mut session = preview_session();

    let effects = session.handle(SessionEvent::NameSubmitted("   ".to_string()), NOW);
    assert_eq!(session.phase(), SessionPhase::Entry);
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, SessionEffect::Notice(notice) if notice.message.contains("name"))));
    assert!(!effects.iter().any(|effect| matches!(effect, SessionEffect::ScheduleGrace { .. })));
}

#[test]
fn answers_before_activation_are_ignored() {
    let mut session = preview_session();

    session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, NOW);
    session.handle(SessionEvent::NameSubmitted("Dana".to_string()), NOW);
    // Still in the grace window: clicks must not record.
    let effects =
        session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, NOW);
    assert!(effects.is_empty());

    session.handle(SessionEvent::GraceElapsed, NOW);
    let outcome_effects = submit(&mut session, LATER);
    let outcome = finished(&outcome_effects).expect("finished effect");
    assert_eq!(outcome.score.correct, 0);
}

#[test]
fn answers_after_finish_are_ignored() {
    let mut session = preview_session();
    activate(&mut session);
    submit(&mut session, LATER);

    let effects =
        session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, LATER);
    assert!(effects.is_empty());
    assert_eq!(session.attempt().answers[0], None);
}

#[test]
fn last_click_wins_per_question() {
    let mut session = preview_session();
    activate(&mut session);

    session.handle(SessionEvent::OptionSelected { question: 0, option: "b".to_string() }, NOW);
    session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, NOW);

    assert_eq!(session.attempt().answers[0].as_deref(), Some("a"));
}

#[test]
fn out_of_range_selection_is_a_no_op() {
    let mut session = preview_session();
    activate(&mut session);

    let effects =
        session.handle(SessionEvent::OptionSelected { question: 9, option: "a".to_string() }, NOW);
    assert!(effects.is_empty());
}

#[test]
fn declined_confirmation_returns_to_active() {
    let mut session = preview_session();
    activate(&mut session);

    session.handle(SessionEvent::SubmitRequested, NOW);
    let effects = session.handle(SessionEvent::SubmitDeclined, NOW);
    assert!(effects.contains(&SessionEffect::ConfirmDismissed));
    assert_eq!(session.phase(), SessionPhase::Active);

    // Answering still works after backing out.
    session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, NOW);
    assert_eq!(session.attempt().answers[0].as_deref(), Some("a"));
}

#[test]
fn confirmation_is_required_before_finishing() {
    let mut session = preview_session();
    activate(&mut session);

    let effects = session.handle(SessionEvent::SubmitConfirmed, NOW);
    assert!(effects.is_empty());
    assert_eq!(session.phase(), SessionPhase::Active);
}

#[test]
fn grace_elapsed_outside_arming_is_ignored() {
    let mut session = preview_session();

    let effects = session.handle(SessionEvent::GraceElapsed, NOW);
    assert!(effects.is_empty());
    assert_eq!(session.phase(), SessionPhase::Entry);
}

#[test]
fn three_flagged_keystrokes_force_a_single_finish() {
    let mut session = preview_session();
    activate(&mut session);

    let flagged = SessionEvent::Signal(ClientSignal::KeyDown(Key::Char('c')));

    let first = session.handle(flagged.clone(), NOW);
    assert!(first.contains(&SessionEffect::SuppressInput));
    assert!(first.iter().any(
        |effect| matches!(effect, SessionEffect::Overlay(overlay) if !overlay.persistent)
    ));
    assert!(finished(&first).is_none());
    assert_eq!(session.attempt().cheating_attempts, 1);

    let second = session.handle(flagged.clone(), NOW);
    assert!(finished(&second).is_none());
    assert_eq!(session.attempt().cheating_attempts, 2);

    let third = session.handle(flagged.clone(), LATER);
    assert!(third.iter().any(
        |effect| matches!(effect, SessionEffect::Overlay(overlay) if overlay.persistent)
    ));
    let outcome = finished(&third).expect("forced finish");
    assert_eq!(outcome.reason, FinishReason::Integrity);
    assert_eq!(outcome.score.cheating_attempts, 3);
    assert!(!session.submit_enabled());
    assert!(session.download_available());

    // Signals after the forced finish never score or persist again.
    let fourth = session.handle(flagged, LATER);
    assert!(finished(&fourth).is_none());
    assert_eq!(session.attempt().cheating_attempts, 3);
}

#[test]
fn warnings_mix_signal_sources() {
    let mut session = preview_session();
    activate(&mut session);

    session.handle(SessionEvent::Signal(ClientSignal::VisibilityLost), NOW);
    session.handle(SessionEvent::Signal(ClientSignal::FocusLost), NOW);
    assert_eq!(session.attempt().cheating_attempts, 2);
    assert_eq!(session.phase(), SessionPhase::Active);

    let effects = session
        .handle(SessionEvent::Signal(ClientSignal::ContainerVisibility { visible_ratio: 0.0 }), NOW);
    assert!(finished(&effects).is_some());
}

#[test]
fn timer_expiry_forces_exactly_one_finish() {
    let mut session = preview_session();
    activate(&mut session);

    let mut finishes = 0;
    for _ in 0..60 {
        let effects = session.handle(SessionEvent::Tick, LATER);
        if finished(&effects).is_some() {
            finishes += 1;
        }
    }
    assert_eq!(finishes, 1);
    assert_eq!(session.phase(), SessionPhase::Finished);

    // Ticks after expiry have no observable effect.
    let effects = session.handle(SessionEvent::Tick, LATER);
    assert!(effects.is_empty());
}

#[test]
fn expiry_reports_time_expired_reason() {
    let mut session = preview_session();
    activate(&mut session);

    let mut outcome = None;
    for _ in 0..60 {
        let effects = session.handle(SessionEvent::Tick, LATER);
        if let Some(finished) = finished(&effects) {
            outcome = Some(finished.clone());
        }
    }
    assert_eq!(outcome.expect("expiry outcome").reason, FinishReason::TimeExpired);
}

#[test]
fn stored_origin_builds_a_result_record() {
    let mut session = ExamSession::new(
        two_question_payload(),
        ExamOrigin::Stored {
            exam_id: "exam-7".to_string(),
            teacher_id: "teacher-3".to_string(),
        },
    );
    activate(&mut session);
    session.handle(SessionEvent::OptionSelected { question: 0, option: "a".to_string() }, NOW);

    let effects = submit(&mut session, LATER);
    let outcome = finished(&effects).expect("finished effect");
    let record = outcome.record.as_ref().expect("record for stored exam");

    assert_eq!(record.exam_id, "exam-7");
    assert_eq!(record.teacher_id, "teacher-3");
    assert_eq!(record.student_name, "Dana");
    assert_eq!(record.score, 1);
    assert_eq!(record.total_questions, 2);
    assert_eq!(record.percent, 50);
    assert_eq!(record.rating, "Just made it!");
    assert_eq!(record.answers, vec![Some("a".to_string()), None]);
    assert_eq!(record.cheating_attempts, 0);
    assert_eq!(record.started_at.as_deref(), Some("2026-05-01T09:00:00Z"));
    assert_eq!(record.finished_at.as_deref(), Some("2026-05-01T09:10:00Z"));
}

#[test]
fn activation_arms_timer_and_monitor() {
    let mut session = preview_session();

    let effects = session.handle(SessionEvent::NameSubmitted("Dana".to_string()), NOW);
    assert!(effects.contains(&SessionEffect::ScheduleGrace { seconds: 5 }));
    assert_eq!(session.phase(), SessionPhase::Arming);

    let effects = session.handle(SessionEvent::GraceElapsed, NOW);
    assert!(effects.contains(&SessionEffect::TimerDisplay("01:00".to_string())));
    assert!(session.attempt().monitoring_active);
    assert_eq!(session.attempt().started_at, Some(NOW));
}
