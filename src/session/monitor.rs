/// Warnings below this count are advisory; reaching it forces termination.
pub const WARNING_THRESHOLD: u32 = 3;

/// How long a transient warning overlay stays up before auto-dismissing.
pub const TRANSIENT_OVERLAY_MS: u64 = 2000;

/// Keys the UI shell reports. Navigation, selection and deletion keys are
/// legitimate while answering; everything else is flagged while armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Enter,
    Space,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Backspace,
    Delete,
    Char(char),
    Other,
}

impl Key {
    pub fn is_allowed(self) -> bool {
        matches!(
            self,
            Key::Tab
                | Key::Enter
                | Key::Space
                | Key::ArrowLeft
                | Key::ArrowUp
                | Key::ArrowRight
                | Key::ArrowDown
                | Key::Backspace
                | Key::Delete
        )
    }
}

/// Raw client behavior the UI shell forwards, one dispatch point for every
/// listener the page installs.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientSignal {
    VisibilityLost,
    FocusLost,
    KeyDown(Key),
    ContextMenu,
    Copy,
    Paste,
    ContainerVisibility { visible_ratio: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspicionKind {
    TabSwitched,
    FocusLost,
    ForbiddenKey,
    ContextMenu,
    CopyAttempt,
    PasteAttempt,
    ContainerHidden,
}

impl SuspicionKind {
    pub fn reason(self) -> &'static str {
        match self {
            SuspicionKind::TabSwitched => "Tab switched or minimized",
            SuspicionKind::FocusLost => "Window lost focus",
            SuspicionKind::ForbiddenKey => "Key pressed",
            SuspicionKind::ContextMenu => "Right-click",
            SuspicionKind::CopyAttempt => "Copy attempt",
            SuspicionKind::PasteAttempt => "Paste attempt",
            SuspicionKind::ContainerHidden => "Exam container hidden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorVerdict {
    Ignored,
    Warning { attempt: u32, kind: SuspicionKind },
    ForceFinish { attempt: u32, kind: SuspicionKind },
}

/// What the UI shell should do with a signal: swallow it before it reaches
/// the page, and whatever the verdict demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDisposition {
    pub suppress: bool,
    pub verdict: MonitorVerdict,
}

/// Counts suspicious client behavior while armed. The monitor never scores
/// or persists anything; its only consequential output is the
/// `ForceFinish` verdict the owning session acts on.
#[derive(Debug, Default)]
pub struct IntegrityMonitor {
    armed: bool,
    attempts: u32,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn observe(&mut self, signal: &ClientSignal) -> SignalDisposition {
        let suppress = suppresses(signal, self.armed);

        if !self.armed {
            return SignalDisposition { suppress, verdict: MonitorVerdict::Ignored };
        }

        let Some(kind) = classify(signal) else {
            return SignalDisposition { suppress, verdict: MonitorVerdict::Ignored };
        };

        self.attempts += 1;
        let verdict = if self.attempts < WARNING_THRESHOLD {
            MonitorVerdict::Warning { attempt: self.attempts, kind }
        } else {
            MonitorVerdict::ForceFinish { attempt: self.attempts, kind }
        };

        SignalDisposition { suppress, verdict }
    }
}

fn classify(signal: &ClientSignal) -> Option<SuspicionKind> {
    match signal {
        ClientSignal::VisibilityLost => Some(SuspicionKind::TabSwitched),
        ClientSignal::FocusLost => Some(SuspicionKind::FocusLost),
        ClientSignal::KeyDown(key) => {
            if key.is_allowed() {
                None
            } else {
                Some(SuspicionKind::ForbiddenKey)
            }
        }
        ClientSignal::ContextMenu => Some(SuspicionKind::ContextMenu),
        ClientSignal::Copy => Some(SuspicionKind::CopyAttempt),
        ClientSignal::Paste => Some(SuspicionKind::PasteAttempt),
        ClientSignal::ContainerVisibility { visible_ratio } => {
            (*visible_ratio <= 0.0).then_some(SuspicionKind::ContainerHidden)
        }
    }
}

// Context menu, copy and paste are swallowed even while disarmed; keystrokes
// are only swallowed once monitoring is live.
fn suppresses(signal: &ClientSignal, armed: bool) -> bool {
    match signal {
        ClientSignal::ContextMenu | ClientSignal::Copy | ClientSignal::Paste => true,
        ClientSignal::KeyDown(key) => armed && !key.is_allowed(),
        _ => false,
    }
}
