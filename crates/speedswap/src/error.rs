//! SpeedSwap error types.

use speedswap_command::swap::StartArgsError;
use speedswap_plugin_api::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("A game is already running!")]
    AlreadyRunning,

    #[error("You need at least 2 players to start! (found {found})")]
    NotEnoughPlayers { found: usize },

    #[error(transparent)]
    StartArgs(#[from] StartArgsError),

    #[error("Failed to create worlds for {owner}: {source}")]
    Provisioning {
        owner: String,
        #[source]
        source: HostError,
    },

    #[error("Could not read the state of {0}")]
    Capture(String),

    #[error("Could not move {player} to {world}: {source}")]
    Teleport {
        player: String,
        world: String,
        #[source]
        source: HostError,
    },
}
