use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Duration, Instant, Interval, MissedTickBehavior};

use crate::core::time::now_utc;
use crate::services::store::RecordStore;
use crate::session::{ExamSession, FinishedAttempt, SessionEffect, SessionEvent, SessionPhase};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const EFFECT_CHANNEL_CAPACITY: usize = 64;

/// Wires an [`ExamSession`] to wall-clock time on a single task: UI events
/// come in over a channel, effects go back out, and the arming delay and the
/// one-second timer cadence are driven here. All session mutation stays on
/// this task, so near-simultaneous finish triggers serialize and the first
/// one wins.
pub struct SessionDriver {
    session: ExamSession,
    store: Option<Arc<dyn RecordStore>>,
    events: mpsc::Receiver<SessionEvent>,
    effects: mpsc::Sender<SessionEffect>,
}

pub struct SessionHandle {
    pub events: mpsc::Sender<SessionEvent>,
    pub effects: mpsc::Receiver<SessionEffect>,
    pub task: JoinHandle<Result<()>>,
}

pub fn spawn(session: ExamSession, store: Option<Arc<dyn RecordStore>>) -> SessionHandle {
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (effect_tx, effect_rx) = mpsc::channel(EFFECT_CHANNEL_CAPACITY);

    let driver = SessionDriver::new(session, store, event_rx, effect_tx);
    SessionHandle { events: event_tx, effects: effect_rx, task: tokio::spawn(driver.run()) }
}

impl SessionDriver {
    pub fn new(
        session: ExamSession,
        store: Option<Arc<dyn RecordStore>>,
        events: mpsc::Receiver<SessionEvent>,
        effects: mpsc::Sender<SessionEffect>,
    ) -> Self {
        Self { session, store, events, effects }
    }

    /// Runs until the attempt finishes or the event sender goes away.
    pub async fn run(mut self) -> Result<()> {
        let mut grace_deadline: Option<Instant> = None;
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    if self.dispatch(event, &mut grace_deadline, &mut ticker).await {
                        break;
                    }
                }
                _ = sleep_until(grace_deadline.unwrap_or_else(Instant::now)),
                    if grace_deadline.is_some() =>
                {
                    grace_deadline = None;
                    let finished = self
                        .dispatch(SessionEvent::GraceElapsed, &mut grace_deadline, &mut ticker)
                        .await;
                    if finished {
                        break;
                    }
                }
                _ = next_tick(&mut ticker), if ticker.is_some() => {
                    if self.dispatch(SessionEvent::Tick, &mut grace_deadline, &mut ticker).await {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn dispatch(
        &mut self,
        event: SessionEvent,
        grace_deadline: &mut Option<Instant>,
        ticker: &mut Option<Interval>,
    ) -> bool {
        let effects = self.session.handle(event, now_utc());
        let mut finished = false;

        for effect in effects {
            match &effect {
                SessionEffect::ScheduleGrace { seconds } => {
                    *grace_deadline = Some(Instant::now() + Duration::from_secs(*seconds));
                }
                SessionEffect::Finished(outcome) => {
                    finished = true;
                    self.persist(outcome).await;
                }
                _ => {}
            }

            if self.effects.send(effect).await.is_err() {
                // The UI is gone; keep going so the result still persists.
                tracing::debug!("Effect receiver dropped");
            }
        }

        if self.session.phase() == SessionPhase::Active && ticker.is_none() {
            let mut cadence =
                interval_at(Instant::now() + Duration::from_secs(1), Duration::from_secs(1));
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(cadence);
        }

        if finished {
            *grace_deadline = None;
            *ticker = None;
        }

        finished
    }

    /// Best-effort: a persistence failure is logged and swallowed, never
    /// shown to the student.
    async fn persist(&self, outcome: &FinishedAttempt) {
        let Some(record) = outcome.record.as_ref() else { return };
        let Some(store) = self.store.as_deref() else { return };

        if let Err(err) = store.insert_result(record).await {
            tracing::warn!(error = %err, exam_id = %record.exam_id, "Failed to persist exam result");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
