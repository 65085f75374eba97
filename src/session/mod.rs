mod machine;
pub mod monitor;
pub mod score;
pub mod timer;

pub use machine::{
    AttemptState, ExamOrigin, ExamSession, FinishReason, FinishedAttempt, Notice, NoticeKind,
    Overlay, SessionEffect, SessionEvent, SessionPhase, GRACE_PERIOD_SECONDS,
};

#[cfg(test)]
mod tests;
