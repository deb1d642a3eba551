//! ficsit-watch API - Wire protocol for the dedicated server HTTP API
//!
//! This crate provides the request envelope sent to `/api/v1` and the
//! response structures decoded from it.

pub mod parse;
pub mod request;

pub use parse::{
    parse_error_body, parse_query_server_state, ApiError, RawApiError, RawQueryServerState,
    RawServerGameState, RawServerStateData,
};
pub use request::{ApiFunction, ApiRequest, API_PATH};
