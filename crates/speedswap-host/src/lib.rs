//! In-memory reference host for SpeedSwap: a world registry, a player table,
//! a plugin manager with a tick scheduler, and a console.

pub mod config;
pub mod host;
pub mod plugin_manager;
pub mod world;

pub use config::HostConfig;
pub use host::{Host, CONSOLE_SENDER};
pub use world::HostWorld;
