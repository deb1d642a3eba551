//! ficsit-watch Core - Shared types for Satisfactory server monitoring
//!
//! This crate provides the domain types shared between the API
//! wire layer (ficsit-api) and the daemon (ficsitd):
//! - `snapshot` - Point-in-time view of the server's game state
//! - `transition` - Occupancy transition detection and the monitor baseline
//! - `message` - Human-readable notification text
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod message;
pub mod snapshot;
pub mod transition;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use message::{format_mention, MessageTemplate, DEFAULT_WORLD_NAME};
pub use snapshot::StateSnapshot;
pub use transition::{detect, MonitorState, TransitionEvent, TransitionKind};
