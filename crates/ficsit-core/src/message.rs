//! Notification and report text.

use crate::snapshot::StateSnapshot;
use crate::transition::{TransitionEvent, TransitionKind};

/// World name used when none is configured.
pub const DEFAULT_WORLD_NAME: &str = "MASSAGE-2(A-B)b";

/// Formats a Discord role mention.
///
/// Values already written as a mention (`<@&123>`) are returned unchanged,
/// so both a bare role id and a pasted mention work.
pub fn format_mention(role: &str) -> String {
    let role = role.trim();
    if role.starts_with("<@") && role.ends_with('>') {
        role.to_string()
    } else {
        format!("<@&{role}>")
    }
}

/// Builds the text sent to the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    world_name: String,
}

impl MessageTemplate {
    pub fn new(world_name: impl Into<String>) -> Self {
        Self {
            world_name: world_name.into(),
        }
    }

    /// `"{occupancy}/{capacity} pioneers in {world}"`
    pub fn occupancy(&self, occupancy: u32, capacity: u32) -> String {
        format!("{occupancy}/{capacity} pioneers in {}", self.world_name)
    }

    /// Report for the on-demand query.
    pub fn report(&self, snapshot: &StateSnapshot) -> String {
        self.occupancy(snapshot.occupancy, snapshot.capacity)
    }

    /// Announcement for a detected transition.
    pub fn transition(&self, event: &TransitionEvent) -> String {
        let delta = event.delta();
        let headline = match (event.kind, delta) {
            (TransitionKind::Increase, 1) => "A new pioneer entered in the server.".to_string(),
            (TransitionKind::Increase, n) => format!("{n} new pioneers entered in the server."),
            (TransitionKind::Decrease, 1) => "A pioneer exited the server.".to_string(),
            (TransitionKind::Decrease, n) => format!("{n} pioneers exited the server."),
        };
        format!("{headline} {}", self.occupancy(event.current, event.capacity))
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_WORLD_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TransitionKind, previous: u32, current: u32) -> TransitionEvent {
        TransitionEvent {
            kind,
            previous,
            current,
            capacity: 4,
        }
    }

    #[test]
    fn test_format_mention() {
        assert_eq!(format_mention("12345"), "<@&12345>");
        assert_eq!(format_mention(" 12345 "), "<@&12345>");
        assert_eq!(format_mention("<@&12345>"), "<@&12345>");
    }

    #[test]
    fn test_single_join_message() {
        let template = MessageTemplate::default();
        let text = template.transition(&event(TransitionKind::Increase, 1, 2));
        assert_eq!(
            text,
            "A new pioneer entered in the server. 2/4 pioneers in MASSAGE-2(A-B)b"
        );
    }

    #[test]
    fn test_single_leave_message() {
        let template = MessageTemplate::new("Grass Fields");
        let text = template.transition(&event(TransitionKind::Decrease, 2, 1));
        assert_eq!(text, "A pioneer exited the server. 1/4 pioneers in Grass Fields");
    }

    #[test]
    fn test_multi_player_jumps() {
        let template = MessageTemplate::new("Dune");
        assert!(template
            .transition(&event(TransitionKind::Increase, 0, 3))
            .starts_with("3 new pioneers entered"));
        assert!(template
            .transition(&event(TransitionKind::Decrease, 4, 2))
            .starts_with("2 pioneers exited"));
    }

    #[test]
    fn test_report() {
        let template = MessageTemplate::new("Dune");
        let snapshot = StateSnapshot::new(3, 8);
        assert_eq!(template.report(&snapshot), "3/8 pioneers in Dune");
    }
}
