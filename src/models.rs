use std::fmt;

/// Reachability of the target as seen by one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Reachable,
    Unreachable,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Reachable => "reachable",
            Status::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the status store held before this run.
///
/// `Absent` means the monitor has never recorded an observation for the
/// target. It is not the same thing as `Known(Status::Unreachable)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousStatus {
    Absent,
    Known(Status),
}

impl fmt::Display for PreviousStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousStatus::Absent => f.write_str("unknown"),
            PreviousStatus::Known(status) => status.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    None,
    FirstObservation(Status),
    BecameUnreachable,
    BecameReachable,
}

impl TransitionEvent {
    pub fn is_none(self) -> bool {
        self == TransitionEvent::None
    }
}

/// The host being watched, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub display_name: String,
}

impl Target {
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Name used when the display-name lookup fails.
pub fn fallback_display_name(host: &str) -> String {
    format!("VM-{}", host)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub status: Status,
    pub latency_ms: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Skipped,
    Sent,
    Failed(String),
}

/// Summary of a single monitoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub target: Target,
    pub previous: PreviousStatus,
    pub current: Status,
    pub event: TransitionEvent,
    pub notification: NotifyOutcome,
}
