//! Parsing dedicated server API responses.
//!
//! Field names follow the server's camelCase JSON. Everything except the
//! player counts is optional so older or newer server builds still decode.

use ficsit_core::{DomainError, StateSnapshot};
use serde::Deserialize;
use thiserror::Error;

/// Top-level `QueryServerState` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQueryServerState {
    pub data: RawServerStateData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServerStateData {
    pub server_game_state: RawServerGameState,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServerGameState {
    pub num_connected_players: i64,
    pub player_limit: i64,
    #[serde(default)]
    pub active_session_name: String,
    #[serde(default)]
    pub auto_load_session_name: String,
    #[serde(default)]
    pub tech_tier: u32,
    #[serde(default)]
    pub active_schematic: String,
    #[serde(default)]
    pub game_phase: String,
    #[serde(default)]
    pub is_game_running: bool,
    #[serde(default)]
    pub is_game_paused: bool,
    #[serde(default)]
    pub average_tick_rate: f64,
    /// Seconds of play time
    #[serde(default)]
    pub total_game_duration: u64,
}

impl RawServerGameState {
    /// Converts to a domain snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidFieldValue` for negative player counts.
    pub fn into_snapshot(self) -> Result<StateSnapshot, DomainError> {
        let mut snapshot = StateSnapshot::from_counts(self.num_connected_players, self.player_limit)?;
        snapshot.session_name = self.active_session_name;
        snapshot.auto_load_session_name = self.auto_load_session_name;
        snapshot.tech_tier = self.tech_tier;
        snapshot.active_schematic = self.active_schematic;
        snapshot.game_phase = self.game_phase;
        snapshot.is_running = self.is_game_running;
        snapshot.is_paused = self.is_game_paused;
        snapshot.average_tick_rate = self.average_tick_rate;
        snapshot.total_duration_secs = self.total_game_duration;
        Ok(snapshot)
    }
}

/// Error body returned by the server alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiError {
    pub error_code: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Errors that can occur while decoding a response body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid server state: {0}")]
    InvalidState(#[from] DomainError),
}

/// Decodes a `QueryServerState` response body.
///
/// An empty (or whitespace-only) body is accepted and yields a default,
/// zeroed snapshot.
pub fn parse_query_server_state(body: &[u8]) -> Result<StateSnapshot, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StateSnapshot::default());
    }

    let raw: RawQueryServerState = serde_json::from_slice(body)?;
    Ok(raw.data.server_game_state.into_snapshot()?)
}

/// Best-effort decode of an error body, used to enrich status errors.
pub fn parse_error_body(body: &[u8]) -> Option<RawApiError> {
    serde_json::from_slice(body).ok()
}
