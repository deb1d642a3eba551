//! Supervised server monitor.
//!
//! The monitor polls the game server, detects occupancy transitions and
//! announces them. A crashed poll loop is restarted automatically until
//! shutdown is requested.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐  start()/shutdown()
//! │ LifecycleCoordinator  │◀──────────────────── ficsitd main
//! │ CancellationToken     │
//! │ CompletionTracker     │
//! └──────────┬────────────┘
//!            │ launch
//!            ▼
//! ┌───────────────────────┐   fault   ┌───────────────────────┐
//! │  supervised instance  │──────────▶│  replacement instance │
//! │  (tracked task)       │  restart  │  (tracked task)       │
//! └──────────┬────────────┘           └───────────────────────┘
//!            │ owns
//!            ▼
//! ┌───────────────────────┐
//! │ PollLoop              │ fetch → detect → notify → sleep
//! │ MonitorState          │
//! └───────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! Production code here never panics on purpose. Broken invariants are
//! returned as an [`InternalFault`]; panics raised by collaborators are
//! contained at the instance boundary and turned into one.

mod lifecycle;
mod poller;
mod sleep;
mod supervisor;

pub use lifecycle::{LifecycleCoordinator, LifecycleError};
pub use poller::{PollContext, PollLoop, PollOutcome};
pub use sleep::{Cancelled, InterruptibleSleeper};
pub use supervisor::{BaselineCheckpoint, CompletionTracker, InternalFault};
