//! Occupancy transition detection.
//!
//! `detect` is a pure comparison of two consecutive occupancy readings.
//! `MonitorState` carries the previous reading between poll iterations and
//! is owned by exactly one poll loop at a time.

use std::fmt;

use serde::Serialize;

use crate::snapshot::StateSnapshot;

/// Direction of an occupancy change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    Increase,
    Decrease,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Increase => write!(f, "increase"),
            TransitionKind::Decrease => write!(f, "decrease"),
        }
    }
}

/// A detected change in occupancy between two consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub previous: u32,
    pub current: u32,
    /// Informational only, never used for the comparison.
    pub capacity: u32,
}

impl TransitionEvent {
    /// Absolute number of players that joined or left.
    pub fn delta(&self) -> u32 {
        self.current.abs_diff(self.previous)
    }
}

/// Compares the previous occupancy with the current one.
///
/// Returns `None` when the previous value is unknown (the first observation
/// only establishes the baseline) or when nothing changed.
pub fn detect(previous: Option<u32>, current: u32, capacity: u32) -> Option<TransitionEvent> {
    let previous = previous?;

    let kind = match current.cmp(&previous) {
        std::cmp::Ordering::Greater => TransitionKind::Increase,
        std::cmp::Ordering::Less => TransitionKind::Decrease,
        std::cmp::Ordering::Equal => return None,
    };

    Some(TransitionEvent {
        kind,
        previous,
        current,
        capacity,
    })
}

/// Baseline carried across poll iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorState {
    last_occupancy: Option<u32>,
}

impl MonitorState {
    /// State with no baseline: the next observation never fires.
    pub fn unknown() -> Self {
        Self {
            last_occupancy: None,
        }
    }

    /// State with a known baseline.
    pub fn with_baseline(occupancy: u32) -> Self {
        Self {
            last_occupancy: Some(occupancy),
        }
    }

    /// Occupancy seen on the last successful poll, if any.
    pub fn last_occupancy(&self) -> Option<u32> {
        self.last_occupancy
    }

    /// Runs detection against the stored baseline and records the new value.
    ///
    /// The baseline is updated whether or not a transition fired.
    pub fn observe(&mut self, snapshot: &StateSnapshot) -> Option<TransitionEvent> {
        let event = detect(self.last_occupancy, snapshot.occupancy, snapshot.capacity);
        self.last_occupancy = Some(snapshot.occupancy);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_previous_never_fires() {
        for current in [0, 1, 5, 10] {
            assert_eq!(detect(None, current, 10), None);
        }
    }

    #[test]
    fn test_equal_never_fires() {
        for value in [0, 3, 10] {
            assert_eq!(detect(Some(value), value, 10), None);
        }
    }

    #[test]
    fn test_increase() {
        let event = detect(Some(3), 5, 10).unwrap();
        assert_eq!(
            event,
            TransitionEvent {
                kind: TransitionKind::Increase,
                previous: 3,
                current: 5,
                capacity: 10,
            }
        );
        assert_eq!(event.delta(), 2);
    }

    #[test]
    fn test_decrease() {
        let event = detect(Some(5), 1, 10).unwrap();
        assert_eq!(event.kind, TransitionKind::Decrease);
        assert_eq!(event.previous, 5);
        assert_eq!(event.current, 1);
        assert_eq!(event.delta(), 4);
    }

    #[test]
    fn test_boundaries_are_ordinary_values() {
        // Emptying the server
        let event = detect(Some(1), 0, 4).unwrap();
        assert_eq!(event.kind, TransitionKind::Decrease);

        // Filling the server
        let event = detect(Some(3), 4, 4).unwrap();
        assert_eq!(event.kind, TransitionKind::Increase);

        // Capacity does not influence the comparison
        let event = detect(Some(2), 7, 4).unwrap();
        assert_eq!(event.kind, TransitionKind::Increase);
        assert_eq!(event.capacity, 4);
    }

    #[test]
    fn test_monitor_state_sequence() {
        let mut state = MonitorState::unknown();
        let fired: Vec<_> = [2, 2, 5, 5, 1]
            .into_iter()
            .filter_map(|n| state.observe(&StateSnapshot::new(n, 10)))
            .collect();

        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].kind, TransitionKind::Increase);
        assert_eq!((fired[0].previous, fired[0].current), (2, 5));
        assert_eq!(fired[1].kind, TransitionKind::Decrease);
        assert_eq!((fired[1].previous, fired[1].current), (5, 1));
        assert_eq!(state.last_occupancy(), Some(1));
    }

    #[test]
    fn test_monitor_state_with_zero_baseline_fires_on_first_join() {
        let mut state = MonitorState::with_baseline(0);
        let event = state.observe(&StateSnapshot::new(1, 4)).unwrap();
        assert_eq!(event.kind, TransitionKind::Increase);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransitionKind::Increase.to_string(), "increase");
        assert_eq!(TransitionKind::Decrease.to_string(), "decrease");
    }
}
