//! SpeedSwap: a speedrun swap minigame plugin.
//!
//! Each participant plays in a private world set (`SS_<name>`, `SS_<name>_nether`,
//! `SS_<name>_the_end`). Every period, all participants' states are captured
//! and rotated by one, so everyone continues someone else's run.

pub mod config;
pub mod display;
pub mod error;
pub mod portal;
pub mod provision;
pub mod roster;
pub mod scheduler;
pub mod transfer;

#[cfg(test)]
mod testing;

use speedswap_command::swap::{SwapCommand, PERMISSION, USAGE};
use speedswap_plugin_api::{EventResult, LogLevel, Plugin, PluginEvent, PluginInfo, ServerApi};
use tracing::debug;

pub use config::{DisconnectDetection, SwapConfig};
pub use error::SwapError;
pub use roster::Roster;

pub const PLUGIN_NAME: &str = "SpeedSwap";
pub const COMMAND: &str = "speedswap";

pub struct SpeedSwapPlugin {
    config: SwapConfig,
    roster: Roster,
}

impl Default for SpeedSwapPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedSwapPlugin {
    pub fn new() -> Self {
        Self::with_config(SwapConfig::default())
    }

    pub fn with_config(config: SwapConfig) -> Self {
        Self {
            config,
            roster: Roster::new(PLUGIN_NAME),
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    fn run_command(&mut self, args: &[String], api: &mut dyn ServerApi) -> String {
        match SwapCommand::parse(args) {
            Some(SwapCommand::Start(tokens)) => {
                match self.roster.start(api, &self.config, &tokens) {
                    Ok(count) => format!("SpeedSwap started with {count} players!"),
                    Err(e) => e.to_string(),
                }
            }
            Some(SwapCommand::Stop) => {
                self.roster.stop(api);
                "SpeedSwap stopped.".to_string()
            }
            None => USAGE.to_string(),
        }
    }
}

impl Plugin for SpeedSwapPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: "Swap speedrunners between their worlds on a timer".into(),
            author: "SpeedSwap".into(),
        }
    }

    fn on_enable(&mut self, api: &mut dyn ServerApi) {
        api.register_command(COMMAND, "Start or stop a SpeedSwap game", PLUGIN_NAME);
        api.log(
            LogLevel::Info,
            &format!(
                "SpeedSwap enabled (period {}s, prefix {})",
                self.config.period_seconds, self.config.world_prefix
            ),
        );
    }

    fn on_disable(&mut self, api: &mut dyn ServerApi) {
        self.roster.stop(api);
    }

    fn on_event(&mut self, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        match event {
            PluginEvent::PlayerPortal {
                player,
                from,
                cause,
                outcome,
            } => {
                if self.roster.is_participant(&player.name) {
                    if let Some(routed) = portal::route_portal(api, &self.config, from, *cause) {
                        debug!("Routing {} {cause:?} to {:?}", player.name, routed.to);
                        *outcome = routed;
                    }
                }
            }
            PluginEvent::PlayerRespawn {
                player,
                died_in,
                bed_spawn,
                location,
            } => {
                if !*bed_spawn && self.roster.is_participant(&player.name) {
                    if let Some(spawn) = portal::route_respawn(api, &self.config, died_in) {
                        *location = spawn;
                    }
                }
            }
            PluginEvent::PlayerQuit { player } => {
                self.roster
                    .handle_quit(api, &player.name, self.config.disconnect_detection);
            }
            PluginEvent::ServerStopping => {
                self.roster.stop(api);
            }
            PluginEvent::PlayerJoin { .. } | PluginEvent::ServerStarted => {}
        }
        EventResult::Continue
    }

    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        if task_id == scheduler::SWAP_TASK_ID {
            self.roster.tick(api, &self.config);
        }
    }

    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        api: &mut dyn ServerApi,
    ) -> Option<String> {
        if !command.eq_ignore_ascii_case(COMMAND) {
            return None;
        }
        if !api.has_permission(sender, PERMISSION) {
            return Some("You don't have permission!".into());
        }
        Some(self.run_command(args, api))
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        serde_json::to_value(SwapConfig::default()).ok()
    }

    fn load_config(&mut self, config: serde_json::Value) {
        self.config = SwapConfig::from_json(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_state, MockServer};
    use speedswap_plugin_api::{Location, PluginPlayer, PortalCause, PortalOutcome};

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn player(name: &str, world: &str) -> PluginPlayer {
        PluginPlayer {
            name: name.into(),
            uuid: format!("uuid-{name}"),
            world: world.into(),
            position: (0.0, 64.0, 0.0),
        }
    }

    fn host_portal_outcome() -> PortalOutcome {
        PortalOutcome {
            to: Some(Location::new("world_nether", 10.0, 65.0, 2.0)),
            can_create_portal: true,
            search_radius: 16,
        }
    }

    fn running(players: &[&str]) -> (SpeedSwapPlugin, MockServer) {
        let mut api = MockServer::new();
        api.ops.push("CONSOLE".into());
        for (i, p) in players.iter().enumerate() {
            api.add_player(p, sample_state("world", i as i32));
        }
        let mut plugin = SpeedSwapPlugin::new();
        plugin.on_enable(&mut api);
        let mut start = vec!["start"];
        start.extend_from_slice(players);
        let reply = plugin.on_command("speedswap", &args(&start), "CONSOLE", &mut api);
        assert_eq!(
            reply,
            Some(format!("SpeedSwap started with {} players!", players.len()))
        );
        (plugin, api)
    }

    #[test]
    fn enable_registers_command() {
        let mut api = MockServer::new();
        SpeedSwapPlugin::new().on_enable(&mut api);
        assert_eq!(api.commands, vec![COMMAND]);
    }

    #[test]
    fn command_requires_permission() {
        let mut api = MockServer::new();
        api.add_player("A", sample_state("world", 0));
        api.add_player("B", sample_state("world", 1));
        let mut plugin = SpeedSwapPlugin::new();
        let reply = plugin.on_command("speedswap", &args(&["start", "A", "B"]), "A", &mut api);
        assert_eq!(reply, Some("You don't have permission!".into()));
        assert!(!plugin.roster().is_running());
        assert!(api.worlds.is_empty());
    }

    #[test]
    fn usage_for_bad_subcommand() {
        let mut api = MockServer::new();
        api.ops.push("CONSOLE".into());
        let mut plugin = SpeedSwapPlugin::new();
        let reply = plugin.on_command("speedswap", &args(&["dance"]), "CONSOLE", &mut api);
        assert_eq!(reply, Some(USAGE.to_string()));
        assert_eq!(plugin.on_command("other", &[], "CONSOLE", &mut api), None);
    }

    #[test]
    fn duplicate_start_reported() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        let reply = plugin.on_command("speedswap", &args(&["start", "A", "B"]), "CONSOLE", &mut api);
        assert_eq!(reply, Some("A game is already running!".into()));
    }

    #[test]
    fn stop_command() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        let reply = plugin.on_command("speedswap", &args(&["stop"]), "CONSOLE", &mut api);
        assert_eq!(reply, Some("SpeedSwap stopped.".into()));
        assert!(!plugin.roster().is_running());
        // Stopping again is harmless.
        plugin.on_command("speedswap", &args(&["stop"]), "CONSOLE", &mut api);
    }

    #[test]
    fn portal_event_rewritten_for_participants() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        let mut event = PluginEvent::PlayerPortal {
            player: player("A", "SS_A"),
            from: Location::new("SS_A", 80.0, 65.0, 16.0),
            cause: PortalCause::NetherPortal,
            outcome: host_portal_outcome(),
        };
        plugin.on_event(&mut event, &mut api);
        let PluginEvent::PlayerPortal { outcome, .. } = event else {
            unreachable!()
        };
        assert_eq!(outcome.to, Some(Location::new("SS_A_nether", 10.0, 65.0, 2.0)));
        assert_eq!(outcome.search_radius, 128);
    }

    #[test]
    fn portal_event_untouched_for_outsiders() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        let mut event = PluginEvent::PlayerPortal {
            player: player("C", "SS_A"),
            from: Location::new("SS_A", 80.0, 65.0, 16.0),
            cause: PortalCause::NetherPortal,
            outcome: host_portal_outcome(),
        };
        plugin.on_event(&mut event, &mut api);
        let PluginEvent::PlayerPortal { outcome, .. } = event else {
            unreachable!()
        };
        assert_eq!(outcome, host_portal_outcome());
    }

    #[test]
    fn portal_event_untouched_when_stopped() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        plugin.on_disable(&mut api);
        let mut event = PluginEvent::PlayerPortal {
            player: player("A", "SS_A"),
            from: Location::new("SS_A", 80.0, 65.0, 16.0),
            cause: PortalCause::NetherPortal,
            outcome: host_portal_outcome(),
        };
        plugin.on_event(&mut event, &mut api);
        let PluginEvent::PlayerPortal { outcome, .. } = event else {
            unreachable!()
        };
        assert_eq!(outcome, host_portal_outcome());
    }

    #[test]
    fn non_bed_respawn_redirected_bed_respawn_kept() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        let host_default = Location::new("world", 0.5, 64.0, 0.5);
        let mut event = PluginEvent::PlayerRespawn {
            player: player("A", "SS_B_nether"),
            died_in: "SS_B_nether".into(),
            bed_spawn: false,
            location: host_default.clone(),
        };
        plugin.on_event(&mut event, &mut api);
        let PluginEvent::PlayerRespawn { location, .. } = &event else {
            unreachable!()
        };
        assert_eq!(location.world, "SS_B");

        let bed = Location::new("SS_A", 9.0, 70.0, 9.0);
        let mut event = PluginEvent::PlayerRespawn {
            player: player("A", "SS_B"),
            died_in: "SS_B".into(),
            bed_spawn: true,
            location: bed.clone(),
        };
        plugin.on_event(&mut event, &mut api);
        let PluginEvent::PlayerRespawn { location, .. } = &event else {
            unreachable!()
        };
        assert_eq!(location, &bed);
    }

    #[test]
    fn quit_event_stops_only_with_event_detection() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        api.player_mut("B").online = false;
        let mut quit = PluginEvent::PlayerQuit {
            player: player("B", "SS_B"),
        };
        plugin.on_event(&mut quit, &mut api);
        assert!(plugin.roster().is_running());
        // Polling notices on the next tick.
        plugin.on_task(scheduler::SWAP_TASK_ID, &mut api);
        assert!(!plugin.roster().is_running());

        let (mut plugin, mut api) = running(&["A", "B"]);
        plugin.load_config(serde_json::json!({ "disconnect_detection": "event" }));
        api.player_mut("B").online = false;
        plugin.on_event(&mut quit, &mut api);
        assert!(!plugin.roster().is_running());
        assert!(api.player("A").sidebar.is_none());
    }

    #[test]
    fn server_stopping_stops_session() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        plugin.on_event(&mut PluginEvent::ServerStopping, &mut api);
        assert!(!plugin.roster().is_running());
    }

    #[test]
    fn unrelated_task_ignored() {
        let (mut plugin, mut api) = running(&["A", "B"]);
        api.player_mut("B").online = false;
        plugin.on_task(99, &mut api);
        assert!(plugin.roster().is_running());
    }

    #[test]
    fn config_roundtrip() {
        let mut plugin = SpeedSwapPlugin::new();
        let default = plugin.default_config().unwrap();
        assert_eq!(default["period_seconds"], 60);
        plugin.load_config(serde_json::json!({ "period_seconds": 15, "announce_swaps": false }));
        assert_eq!(plugin.config().period_seconds, 15);
        assert!(!plugin.config().announce_swaps);
    }
}
