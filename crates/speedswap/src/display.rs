//! The countdown sidebar shown to participants.

use speedswap_plugin_api::{ServerApi, Sidebar};

pub const BOARD_TITLE: &str = "SpeedSwap";
pub const COUNTDOWN_LABEL: &str = "Next Swap in:";

/// Format seconds as `MM:SS`. Negative values show as `00:00`.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Two-line board: a static label above the remaining time.
pub struct SwapBoard {
    sidebar: Sidebar,
}

impl Default for SwapBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapBoard {
    pub fn new() -> Self {
        Self {
            sidebar: Sidebar::new(BOARD_TITLE),
        }
    }

    /// Rewrite the board for `remaining` seconds, dropping stale lines first.
    pub fn update(&mut self, remaining: i64) {
        self.sidebar.reset_scores();
        self.sidebar.set_score(COUNTDOWN_LABEL, 2);
        self.sidebar.set_score(format_countdown(remaining), 1);
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn show_to(&self, api: &mut dyn ServerApi, players: &[String]) {
        for player in players {
            api.show_sidebar(player, &self.sidebar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_format() {
        assert_eq!(format_countdown(60), "01:00");
        assert_eq!(format_countdown(59), "00:59");
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(605), "10:05");
        assert_eq!(format_countdown(-1), "00:00");
    }

    #[test]
    fn board_has_exactly_two_lines() {
        let mut board = SwapBoard::new();
        board.update(61);
        board.update(60);
        assert_eq!(board.sidebar().lines(), vec![COUNTDOWN_LABEL, "01:00"]);
        assert_eq!(board.sidebar().title, BOARD_TITLE);
    }
}
