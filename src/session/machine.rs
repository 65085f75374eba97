use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::time::format_offset;
use crate::schemas::{ExamPayload, ResultRecord};
use crate::session::monitor::{ClientSignal, IntegrityMonitor, MonitorVerdict, WARNING_THRESHOLD};
use crate::session::score::{self, QuestionReview, ScoreResult};
use crate::session::timer::{format_clock, CountdownTimer, TimerTick};

/// Quiz is on screen for this long before answers record and monitoring
/// arms; page-load focus churn must not count as cheating.
pub const GRACE_PERIOD_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Entry,
    Arming,
    Active,
    Finished,
}

/// Where the payload came from. Only store-backed exams carry the ids a
/// result row needs; preview attempts are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamOrigin {
    Preview,
    Stored { exam_id: String, teacher_id: String },
}

/// The mutable per-attempt record. Owned exclusively by [`ExamSession`];
/// `answers` is writable only while `monitoring_active` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    pub student_name: String,
    pub answers: Vec<Option<String>>,
    pub cheating_attempts: u32,
    pub monitoring_active: bool,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
}

impl AttemptState {
    fn new(question_count: usize) -> Self {
        Self {
            student_name: String::new(),
            answers: vec![None; question_count],
            cheating_attempts: 0,
            monitoring_active: false,
            started_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    NameSubmitted(String),
    GraceElapsed,
    OptionSelected { question: usize, option: String },
    SubmitRequested,
    SubmitConfirmed,
    SubmitDeclined,
    Tick,
    Signal(ClientSignal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warn,
}

/// Transient toast-style advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Prominent full-screen overlay. Non-persistent overlays auto-dismiss
/// after [`crate::session::monitor::TRANSIENT_OVERLAY_MS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub message: String,
    pub persistent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Submitted,
    TimeExpired,
    Integrity,
}

/// Everything the UI needs once the attempt is over, plus the record the
/// driver persists best-effort for store-backed exams.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedAttempt {
    pub reason: FinishReason,
    pub score: ScoreResult,
    pub review: Vec<QuestionReview>,
    pub record: Option<ResultRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Deliver `GraceElapsed` after this many seconds.
    ScheduleGrace { seconds: u64 },
    Notice(Notice),
    Overlay(Overlay),
    TimerDisplay(String),
    ConfirmPrompt,
    ConfirmDismissed,
    SelectionChanged { question: usize, option: String },
    /// The triggering input must not reach the page.
    SuppressInput,
    Finished(Box<FinishedAttempt>),
}

/// One exam attempt from name entry to scoring. Pure of I/O and wall clock:
/// events go in with the caller's `now`, effects come out, and the single
/// writer invariant on [`AttemptState`] holds throughout.
#[derive(Debug)]
pub struct ExamSession {
    attempt_id: Uuid,
    payload: ExamPayload,
    origin: ExamOrigin,
    phase: SessionPhase,
    attempt: AttemptState,
    monitor: IntegrityMonitor,
    timer: CountdownTimer,
    confirm_open: bool,
}

impl ExamSession {
    pub fn new(payload: ExamPayload, origin: ExamOrigin) -> Self {
        let attempt = AttemptState::new(payload.questions.len());
        Self {
            attempt_id: Uuid::new_v4(),
            payload,
            origin,
            phase: SessionPhase::Entry,
            attempt,
            monitor: IntegrityMonitor::new(),
            timer: CountdownTimer::new(),
            confirm_open: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn payload(&self) -> &ExamPayload {
        &self.payload
    }

    pub fn attempt(&self) -> &AttemptState {
        &self.attempt
    }

    pub fn submit_enabled(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn download_available(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    pub fn handle(&mut self, event: SessionEvent, now: OffsetDateTime) -> Vec<SessionEffect> {
        match event {
            SessionEvent::NameSubmitted(name) => self.on_name_submitted(name),
            SessionEvent::GraceElapsed => self.on_grace_elapsed(now),
            SessionEvent::OptionSelected { question, option } => {
                self.on_option_selected(question, option)
            }
            SessionEvent::SubmitRequested => self.on_submit_requested(),
            SessionEvent::SubmitConfirmed => self.on_submit_confirmed(now),
            SessionEvent::SubmitDeclined => self.on_submit_declined(),
            SessionEvent::Tick => self.on_tick(now),
            SessionEvent::Signal(signal) => self.on_signal(signal, now),
        }
    }

    fn on_name_submitted(&mut self, name: String) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Entry {
            return Vec::new();
        }

        let name = name.trim().to_string();
        if name.is_empty() {
            return vec![notice(NoticeKind::Warn, "Please enter your name")];
        }

        self.attempt.student_name = name;
        self.phase = SessionPhase::Arming;

        vec![
            notice(NoticeKind::Info, &format!("Exam starts in {GRACE_PERIOD_SECONDS} seconds")),
            SessionEffect::ScheduleGrace { seconds: GRACE_PERIOD_SECONDS },
        ]
    }

    fn on_grace_elapsed(&mut self, now: OffsetDateTime) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Arming {
            return Vec::new();
        }

        self.phase = SessionPhase::Active;
        self.attempt.started_at = Some(now);
        self.attempt.monitoring_active = true;
        self.monitor.arm();
        let total_seconds = u64::from(self.payload.duration_minutes) * 60;
        self.timer.arm(total_seconds);

        tracing::info!(
            attempt = %self.attempt_id,
            student = %self.attempt.student_name,
            duration_minutes = self.payload.duration_minutes,
            "Attempt started"
        );

        vec![
            SessionEffect::TimerDisplay(format_clock(total_seconds)),
            notice(NoticeKind::Success, "Exam started — good luck!"),
        ]
    }

    fn on_option_selected(&mut self, question: usize, option: String) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Active || !self.attempt.monitoring_active {
            return Vec::new();
        }
        let Some(slot) = self.attempt.answers.get_mut(question) else {
            return Vec::new();
        };

        *slot = Some(option.clone());
        vec![SessionEffect::SelectionChanged { question, option }]
    }

    fn on_submit_requested(&mut self) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Active || self.confirm_open {
            return Vec::new();
        }
        self.confirm_open = true;
        vec![SessionEffect::ConfirmPrompt]
    }

    fn on_submit_confirmed(&mut self, now: OffsetDateTime) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Active || !self.confirm_open {
            return Vec::new();
        }
        self.confirm_open = false;

        let mut effects = vec![SessionEffect::ConfirmDismissed];
        effects.extend(self.finish(FinishReason::Submitted, now));
        effects
    }

    fn on_submit_declined(&mut self) -> Vec<SessionEffect> {
        if !self.confirm_open {
            return Vec::new();
        }
        self.confirm_open = false;
        vec![SessionEffect::ConfirmDismissed]
    }

    fn on_tick(&mut self, now: OffsetDateTime) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Active {
            return Vec::new();
        }

        match self.timer.tick() {
            Some(TimerTick::Remaining(remaining)) => {
                vec![SessionEffect::TimerDisplay(format_clock(remaining))]
            }
            Some(TimerTick::Expired) => {
                let mut effects = vec![SessionEffect::TimerDisplay("Time's Up!".to_string())];
                effects.extend(self.finish(FinishReason::TimeExpired, now));
                effects
            }
            None => Vec::new(),
        }
    }

    fn on_signal(&mut self, signal: ClientSignal, now: OffsetDateTime) -> Vec<SessionEffect> {
        let disposition = self.monitor.observe(&signal);
        let mut effects = Vec::new();

        if disposition.suppress {
            effects.push(SessionEffect::SuppressInput);
        }

        match disposition.verdict {
            MonitorVerdict::Ignored => {}
            MonitorVerdict::Warning { attempt, kind } => {
                self.attempt.cheating_attempts = self.monitor.attempts();
                effects.push(notice(
                    NoticeKind::Warn,
                    &format!(
                        "Cheating detected: {}. Warning {attempt}/{WARNING_THRESHOLD}",
                        kind.reason()
                    ),
                ));
                effects.push(SessionEffect::Overlay(Overlay {
                    message: format!("Cheating detected ({attempt}/{WARNING_THRESHOLD})"),
                    persistent: false,
                }));
            }
            MonitorVerdict::ForceFinish { attempt, kind } => {
                self.attempt.cheating_attempts = self.monitor.attempts();
                tracing::warn!(
                    attempt = %self.attempt_id,
                    flagged = attempt,
                    reason = kind.reason(),
                    "Integrity threshold reached"
                );
                effects.push(SessionEffect::Overlay(Overlay {
                    message: format!("Cheating detected! Attempt #{attempt}. Exam submitted."),
                    persistent: true,
                }));
                effects.extend(self.finish(FinishReason::Integrity, now));
            }
        }

        effects
    }

    // The only writer of the Active -> Finished transition. Idempotent:
    // whichever trigger lands first wins and later ones fall through the
    // phase guard.
    fn finish(&mut self, reason: FinishReason, now: OffsetDateTime) -> Vec<SessionEffect> {
        if self.phase != SessionPhase::Active {
            return Vec::new();
        }

        self.phase = SessionPhase::Finished;
        self.confirm_open = false;
        self.attempt.monitoring_active = false;
        self.monitor.disarm();
        self.timer.cancel();
        self.attempt.finished_at = Some(now);

        let score = score::score(&self.payload, &self.attempt);
        let review = score::review(&self.payload, &self.attempt);
        let record = self.result_record(&score);

        tracing::info!(
            attempt = %self.attempt_id,
            reason = ?reason,
            correct = score.correct,
            total = score.total,
            percent = score.percent,
            cheating_attempts = score.cheating_attempts,
            "Attempt finished"
        );

        vec![SessionEffect::Finished(Box::new(FinishedAttempt { reason, score, review, record }))]
    }

    fn result_record(&self, score: &ScoreResult) -> Option<ResultRecord> {
        let ExamOrigin::Stored { exam_id, teacher_id } = &self.origin else {
            return None;
        };

        Some(ResultRecord {
            exam_id: exam_id.clone(),
            teacher_id: teacher_id.clone(),
            student_name: self.attempt.student_name.clone(),
            score: score.correct,
            total_questions: score.total,
            percent: score.percent,
            rating: score.rating.to_string(),
            answers: self.attempt.answers.clone(),
            cheating_attempts: score.cheating_attempts,
            started_at: self.attempt.started_at.map(format_offset),
            finished_at: self.attempt.finished_at.map(format_offset),
        })
    }
}

fn notice(kind: NoticeKind, message: &str) -> SessionEffect {
    SessionEffect::Notice(Notice { kind, message: message.to_string() })
}
