use crate::models::{PreviousStatus, Status, TransitionEvent};

/// Decide which event, if any, a new observation represents.
///
/// A single contrary observation flips the state immediately; there is no
/// debounce or flap suppression.
pub fn classify(previous: PreviousStatus, current: Status) -> TransitionEvent {
    match (previous, current) {
        (PreviousStatus::Absent, status) => TransitionEvent::FirstObservation(status),
        (PreviousStatus::Known(Status::Reachable), Status::Unreachable) => {
            TransitionEvent::BecameUnreachable
        }
        (PreviousStatus::Known(Status::Unreachable), Status::Reachable) => {
            TransitionEvent::BecameReachable
        }
        (PreviousStatus::Known(_), _) => TransitionEvent::None,
    }
}
