use std::time::{Duration, Instant};

use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Pending { value: String, deadline: Instant },
}

/// Holds back a value until it has been left alone for `delay`.
///
/// Time is handed in by the caller, the event loop polls it on every tick.
/// There is at most one pending value; arming again replaces it and pushes the
/// deadline out.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: State,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: State::Idle,
        }
    }

    pub fn arm(&mut self, value: impl Into<String>, now: Instant) {
        let value = value.into();
        trace!("Debounce armed with {value:?}");
        self.state = State::Pending {
            value,
            deadline: now + self.delay,
        };
    }

    pub fn cancel(&mut self) {
        self.state = State::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    /// Time left until the pending value settles.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match &self.state {
            State::Idle => None,
            State::Pending { deadline, .. } => Some(deadline.saturating_duration_since(now)),
        }
    }

    /// Returns the settled value once the deadline has been reached, and goes idle.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.state {
            State::Pending { deadline, .. } if now >= *deadline => {
                match std::mem::replace(&mut self.state, State::Idle) {
                    State::Pending { value, .. } => Some(value),
                    State::Idle => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn settles_after_delay() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);
        assert_eq!(d.poll(start), None);

        d.arm("al", start);
        assert!(d.is_pending());
        assert_eq!(d.poll(start + Duration::from_millis(499)), None);
        assert_eq!(d.poll(start + DELAY), Some("al".to_string()));
        assert!(!d.is_pending());
        assert_eq!(d.poll(start + DELAY * 2), None);
    }

    #[test]
    fn rearming_replaces_value_and_deadline() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.arm("a", start);
        d.arm("al", start + Duration::from_millis(300));

        // The first deadline has passed but was superseded.
        assert_eq!(d.poll(start + Duration::from_millis(600)), None);
        assert_eq!(
            d.remaining(start + Duration::from_millis(600)),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            d.poll(start + Duration::from_millis(800)),
            Some("al".to_string())
        );
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.arm("bob", start);
        d.cancel();
        assert_eq!(d.remaining(start), None);
        assert_eq!(d.poll(start + DELAY), None);
    }
}
