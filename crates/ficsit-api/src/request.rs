//! Request envelope for the dedicated server API.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Path of the API endpoint on the server.
pub const API_PATH: &str = "/api/v1";

/// API functions used by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFunction {
    QueryServerState,
}

impl ApiFunction {
    /// Function name as written in the request body.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFunction::QueryServerState => "QueryServerState",
        }
    }
}

impl fmt::Display for ApiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body POSTed to [`API_PATH`]: `{"function": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub function: &'static str,
    pub data: Value,
}

impl ApiRequest {
    /// Creates a request for `function` with the given payload.
    pub fn new(function: ApiFunction, data: Value) -> Self {
        Self {
            function: function.as_str(),
            data,
        }
    }

    /// `QueryServerState` takes an empty object as payload.
    pub fn query_server_state() -> Self {
        Self::new(ApiFunction::QueryServerState, Value::Object(Default::default()))
    }
}
