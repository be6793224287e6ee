//! The swap countdown task.
//!
//! The host fires the task once per second. Each tick checks liveness,
//! publishes the countdown and, when it has run out, performs a swap cycle:
//!
//! ```text
//! remaining: 60 59 ... 1 0 59 58 ... 1 0 59 ...
//!                        ^swap          ^swap
//! ```

use speedswap_plugin_api::ServerApi;
use tracing::debug;

use crate::display::SwapBoard;
use crate::error::SwapError;
use crate::transfer::{perform_cycle, SwapRotation};

/// Task ID of the repeating swap task.
pub const SWAP_TASK_ID: u32 = 1;

/// What a single countdown tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown published, no swap.
    Counted { shown: i64 },
    /// Countdown hit zero and a swap cycle ran.
    Swapped,
    /// A participant is gone; the session must stop.
    Disconnected(String),
}

/// First participant that is no longer online.
pub fn first_disconnected<'a>(api: &dyn ServerApi, participants: &'a [String]) -> Option<&'a str> {
    participants
        .iter()
        .find(|p| !api.is_online(p))
        .map(|p| p.as_str())
}

/// Countdown state carried between ticks.
pub struct SwapTimer {
    period: i64,
    remaining: i64,
    board: SwapBoard,
}

impl SwapTimer {
    pub fn new(period_seconds: u32) -> Self {
        let period = i64::from(period_seconds);
        let mut board = SwapBoard::new();
        board.update(period);
        Self {
            period,
            remaining: period,
            board,
        }
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    /// Value the next tick will display.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn board(&self) -> &SwapBoard {
        &self.board
    }

    /// Run one countdown tick.
    ///
    /// `departed` is a participant whose quit was seen since the last tick.
    /// Returns `Disconnected` without touching anything else when it is set or
    /// a participant is offline; the caller is expected to stop the session.
    pub fn tick(
        &mut self,
        api: &mut dyn ServerApi,
        participants: &[String],
        departed: Option<&str>,
        announce: bool,
    ) -> Result<TickOutcome, SwapError> {
        if let Some(gone) = departed.or_else(|| first_disconnected(api, participants)) {
            api.broadcast_message(&format!("{gone} disconnected. Stopping SpeedSwap."));
            return Ok(TickOutcome::Disconnected(gone.to_string()));
        }

        let shown = self.remaining;
        self.board.update(shown);
        self.board.show_to(api, participants);

        let outcome = if shown <= 0 {
            perform_cycle(
                api,
                participants,
                SwapRotation::cyclic(participants.len()),
                announce,
            )?;
            self.remaining = self.period;
            TickOutcome::Swapped
        } else {
            TickOutcome::Counted { shown }
        };
        self.remaining -= 1;
        debug!("Swap countdown: showed {shown}, next {}", self.remaining);
        Ok(outcome)
    }
}
