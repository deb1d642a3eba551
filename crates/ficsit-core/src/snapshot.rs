//! Point-in-time view of the dedicated server's game state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DomainError, DomainResult};

/// Immutable snapshot of the server state at one poll instant.
///
/// Only `occupancy` and `capacity` take part in transition detection.
/// The remaining fields are descriptive and carried through for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// Number of connected players
    pub occupancy: u32,

    /// Player limit configured on the server
    pub capacity: u32,

    /// Name of the currently loaded save session
    pub session_name: String,

    /// Session loaded automatically on server start
    pub auto_load_session_name: String,

    /// Highest unlocked tech tier
    pub tech_tier: u32,

    /// Currently active milestone schematic
    pub active_schematic: String,

    /// Current space elevator phase
    pub game_phase: String,

    /// Whether a game session is loaded and running
    pub is_running: bool,

    /// Whether the game is paused (no players connected)
    pub is_paused: bool,

    /// Average server tick rate in ticks per second
    pub average_tick_rate: f64,

    /// Total play time of the session in seconds
    pub total_duration_secs: u64,

    /// When this snapshot was taken
    pub observed_at: DateTime<Utc>,
}

impl StateSnapshot {
    /// Creates a snapshot with the given counts and empty descriptive fields.
    pub fn new(occupancy: u32, capacity: u32) -> Self {
        Self {
            occupancy,
            capacity,
            session_name: String::new(),
            auto_load_session_name: String::new(),
            tech_tier: 0,
            active_schematic: String::new(),
            game_phase: String::new(),
            is_running: false,
            is_paused: false,
            average_tick_rate: 0.0,
            total_duration_secs: 0,
            observed_at: Utc::now(),
        }
    }

    /// Creates a snapshot from signed counts as reported by the server.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidFieldValue` if either count is negative
    /// or does not fit in a `u32`.
    pub fn from_counts(occupancy: i64, capacity: i64) -> DomainResult<Self> {
        Ok(Self::new(
            count("occupancy", occupancy)?,
            count("capacity", capacity)?,
        ))
    }

    /// True when a known player limit is exceeded.
    ///
    /// A zero capacity means the server did not report one.
    pub fn exceeds_capacity(&self) -> bool {
        self.capacity > 0 && self.occupancy > self.capacity
    }
}

fn count(field: &str, value: i64) -> DomainResult<u32> {
    if value < 0 {
        return Err(DomainError::negative_count(field, value));
    }
    u32::try_from(value).map_err(|_| DomainError::count_out_of_range(field, value))
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
