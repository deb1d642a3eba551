//! On-demand commands answered outside the poll loop.

use std::fmt;

use ficsit_core::MessageTemplate;

use crate::fetcher::{FetchError, StateFetcher};

/// A user-invoked command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Liveness reply
    Ping,
    /// Current occupancy, fetched directly from the server
    Pioneers,
}

impl BotCommand {
    pub const ALL: [BotCommand; 2] = [BotCommand::Ping, BotCommand::Pioneers];

    /// Parses a command name, case-insensitive, with or without a leading `/`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix('/').unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Pioneers => "pioneers",
        }
    }

    /// Produces the reply text.
    ///
    /// `pioneers` performs its own fetch and never touches the poll loop's
    /// baseline.
    pub async fn respond(
        &self,
        fetcher: &dyn StateFetcher,
        template: &MessageTemplate,
    ) -> Result<String, FetchError> {
        match self {
            Self::Ping => Ok("Pong!".to_string()),
            Self::Pioneers => {
                let snapshot = fetcher.fetch().await?;
                Ok(template.report(&snapshot))
            }
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ficsit_core::StateSnapshot;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl StateFetcher for CountingFetcher {
        async fn fetch(&self) -> Result<StateSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Status {
                    status: 500,
                    detail: "down".to_string(),
                });
            }
            Ok(StateSnapshot::new(3, 4))
        }
    }

    fn fetcher(fail: bool) -> CountingFetcher {
        CountingFetcher {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(BotCommand::parse("ping"), Some(BotCommand::Ping));
        assert_eq!(BotCommand::parse("/Pioneers"), Some(BotCommand::Pioneers));
        assert_eq!(BotCommand::parse(" PING "), Some(BotCommand::Ping));
        assert_eq!(BotCommand::parse("players"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[test]
    fn test_name_round_trips_through_parse() {
        for cmd in BotCommand::ALL {
            assert_eq!(BotCommand::parse(cmd.name()), Some(cmd));
        }
    }

    #[tokio::test]
    async fn test_ping_does_not_fetch() {
        let fetcher = fetcher(false);
        let reply = BotCommand::Ping
            .respond(&fetcher, &MessageTemplate::default())
            .await
            .unwrap();
        assert_eq!(reply, "Pong!");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pioneers_reports_occupancy() {
        let fetcher = fetcher(false);
        let reply = BotCommand::Pioneers
            .respond(&fetcher, &MessageTemplate::new("Dune"))
            .await
            .unwrap();
        assert_eq!(reply, "3/4 pioneers in Dune");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pioneers_propagates_fetch_error() {
        let fetcher = fetcher(true);
        let err = BotCommand::Pioneers
            .respond(&fetcher, &MessageTemplate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }
}
