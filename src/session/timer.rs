/// Outcome of a one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Remaining(u64),
    Expired,
}

/// A single monotonic countdown per attempt. The timer itself is a counter;
/// the session driver supplies the once-per-second cadence.
#[derive(Debug, Default)]
pub struct CountdownTimer {
    remaining: u64,
    running: bool,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, duration_seconds: u64) {
        self.remaining = duration_seconds;
        self.running = true;
    }

    /// Decrements the counter. `Expired` is returned exactly once, at the
    /// tick that reaches zero; every tick after that is `None`.
    pub fn tick(&mut self) -> Option<TimerTick> {
        if !self.running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Some(TimerTick::Expired)
        } else {
            Some(TimerTick::Remaining(self.remaining))
        }
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

pub fn format_clock(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
