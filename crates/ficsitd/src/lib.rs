//! ficsit-watch daemon - server poller, Discord notifier and health endpoint
//!
//! This crate provides the runtime pieces of `ficsitd`:
//! - `config` - Layered configuration (defaults, TOML file, environment)
//! - `fetcher` - Game server state retrieval over the dedicated server API
//! - `notifier` - Message delivery to a Discord channel
//! - `monitor` - Supervised poll loop and its lifecycle
//! - `commands` - On-demand `ping` and `pioneers` replies
//! - `health` - HTTP health endpoint and command routes
//!
//! # Panic-Free Guarantees
//!
//! Production code does not call `.unwrap()` or `.expect()`. Fetch and
//! notification failures are logged and the loop keeps going; only
//! configuration errors stop the daemon.

pub mod commands;
pub mod config;
pub mod fetcher;
pub mod health;
pub mod monitor;
pub mod notifier;

pub use commands::BotCommand;
pub use config::{ConfigError, ConfigLoader, MonitorConfig, PollSettings};
pub use fetcher::{FetchError, HttpStateFetcher, StateFetcher};
pub use health::{HealthServer, HealthState, ServerError};
pub use monitor::{LifecycleCoordinator, LifecycleError};
pub use notifier::{DiscordNotifier, Notifier, NotifyError};
