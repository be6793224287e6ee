//! The host: owns the world and the plugin manager, runs game ticks and
//! console commands.

use std::path::Path;

use speedswap_command::{split_command_line, CommandContext, CommandRegistry, CommandResult};
use speedswap_plugin_api::{EventResult, Location, Plugin, PluginEvent, PortalCause};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::plugin_manager::{PendingAction, PluginManager};
use crate::world::HostWorld;

/// Sender name for commands typed on the console. Holds every permission.
pub const CONSOLE_SENDER: &str = "CONSOLE";

/// Host commands that simulate player actions or manage the host.
const OPERATOR_COMMANDS: &[&str] = &["join", "quit", "portal", "kill", "worlds", "stop"];

pub struct Host {
    world: HostWorld,
    plugin_manager: PluginManager,
    command_registry: CommandRegistry,
}

impl Host {
    pub fn new(world: HostWorld) -> Self {
        let mut command_registry = CommandRegistry::new();
        command_registry.register_stub("join", "Bring a player online");
        command_registry.register_stub("quit", "Disconnect a player");
        command_registry.register_stub("portal", "Send a player through a portal (nether|end)");
        command_registry.register_stub("kill", "Kill a player");
        command_registry.register_stub("worlds", "List loaded worlds");

        Self {
            world,
            plugin_manager: PluginManager::new(),
            command_registry,
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(HostWorld::from_config(config))
    }

    pub fn world(&self) -> &HostWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut HostWorld {
        &mut self.world
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.plugin_manager
    }

    pub fn current_tick(&self) -> u64 {
        self.world.current_tick()
    }

    // ─── Plugin lifecycle ────────────────────────────────────────────────

    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugin_manager.register(plugin);
    }

    pub fn load_plugin_configs(&mut self, dir: &Path) {
        self.plugin_manager.load_configs(dir);
    }

    /// Enable all plugins and announce the server start.
    pub fn enable_plugins(&mut self) {
        let actions = self.plugin_manager.enable_all(&mut self.world);
        self.apply_plugin_actions(actions);
        self.dispatch(&mut PluginEvent::ServerStarted);
    }

    /// Announce the stop and disable all plugins.
    pub fn shutdown(&mut self) {
        self.dispatch(&mut PluginEvent::ServerStopping);
        let actions = self.plugin_manager.disable_all(&mut self.world);
        self.apply_plugin_actions(actions);
        info!("Host shut down at tick {}", self.world.current_tick());
    }

    /// Run one game tick (called every 50ms from main loop).
    pub fn game_tick(&mut self) {
        self.world.advance_tick();
        let actions = self.plugin_manager.tick_scheduler(&mut self.world);
        self.apply_plugin_actions(actions);
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.game_tick();
        }
    }

    fn dispatch(&mut self, event: &mut PluginEvent) -> EventResult {
        let (result, actions) = self.plugin_manager.dispatch(event, &mut self.world);
        self.apply_plugin_actions(actions);
        result
    }

    /// Apply deferred plugin actions.
    fn apply_plugin_actions(&mut self, actions: Vec<PendingAction>) {
        for action in actions {
            match action {
                PendingAction::SendMessage {
                    player_name,
                    message,
                } => {
                    debug!("-> {player_name}: {message}");
                    self.world.send_message(&player_name, &message);
                }
                PendingAction::BroadcastMessage { message } => {
                    self.world.broadcast(&message);
                }
                PendingAction::RegisterCommand { .. }
                | PendingAction::ScheduleTask { .. }
                | PendingAction::CancelTask { .. } => {
                    // These are handled internally by PluginManager
                }
            }
        }
    }

    // ─── Player actions ──────────────────────────────────────────────────

    pub fn join(&mut self, name: &str) {
        let player = self.world.join(name);
        info!("{} joined in {}", player.name, player.world);
        self.dispatch(&mut PluginEvent::PlayerJoin { player });
    }

    /// Returns false if the player was not online.
    pub fn quit(&mut self, name: &str) -> bool {
        let Some(player) = self.world.quit(name) else {
            return false;
        };
        info!("{} left", player.name);
        self.dispatch(&mut PluginEvent::PlayerQuit { player });
        true
    }

    /// Send a player through a portal. Returns where they ended up, or `None`
    /// when the crossing was cancelled or had no destination.
    pub fn portal(&mut self, name: &str, cause: PortalCause) -> Option<Location> {
        let player = self.world.find_online(name)?.to_plugin_player();
        let from = self.world.player(&player.name)?.state.location.clone();
        let outcome = self.world.default_portal_outcome(&from, cause);
        let mut event = PluginEvent::PlayerPortal {
            player,
            from,
            cause,
            outcome,
        };
        if self.dispatch(&mut event) == EventResult::Cancelled {
            return None;
        }
        let PluginEvent::PlayerPortal { player, outcome, .. } = event else {
            return None;
        };
        let to = outcome.to?;
        match self.world.teleport(&player.name, &to) {
            Ok(()) => Some(to),
            Err(e) => {
                warn!("Portal travel for {} failed: {e}", player.name);
                None
            }
        }
    }

    /// Kill a player and respawn them. Returns the respawn location.
    pub fn kill(&mut self, name: &str) -> Option<Location> {
        let player = self.world.find_online(name)?.to_plugin_player();
        let death = self.world.kill(&player.name)?;
        let mut event = PluginEvent::PlayerRespawn {
            player,
            died_in: death.died_in,
            bed_spawn: death.bed_spawn,
            location: death.location,
        };
        self.dispatch(&mut event);
        let PluginEvent::PlayerRespawn {
            player, location, ..
        } = event
        else {
            return None;
        };
        self.world.respawn(&player.name, location.clone());
        Some(location)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn handle_console_command(&mut self, line: &str) -> CommandResult {
        self.handle_command(CONSOLE_SENDER, line)
    }

    /// Run a command line on behalf of `sender`.
    pub fn handle_command(&mut self, sender: &str, line: &str) -> CommandResult {
        let Some((name, args)) = split_command_line(line) else {
            return CommandResult::err("Empty command.");
        };
        info!("{sender} issued command: {line}");

        if OPERATOR_COMMANDS.contains(&name.as_str())
            && sender != CONSOLE_SENDER
            && !self.world.is_op(sender)
        {
            return CommandResult::err("You don't have permission!");
        }

        match name.as_str() {
            "join" => self.cmd_join(&args),
            "quit" => self.cmd_quit(&args),
            "portal" => self.cmd_portal(&args),
            "kill" => self.cmd_kill(&args),
            "worlds" => self.cmd_worlds(),
            "help" => self.cmd_help(sender),
            "list" => {
                let names: Vec<String> =
                    self.world.online_players().map(|p| p.name.clone()).collect();
                self.command_registry.execute(
                    "list",
                    &CommandContext {
                        sender_name: sender.to_string(),
                        args: names,
                    },
                )
            }
            _ if self.command_registry.contains(&name) => self.command_registry.execute(
                &name,
                &CommandContext {
                    sender_name: sender.to_string(),
                    args,
                },
            ),
            _ => {
                let (response, actions) =
                    self.plugin_manager
                        .handle_command(&name, &args, sender, &mut self.world);
                self.apply_plugin_actions(actions);
                match response {
                    Some(message) => CommandResult::ok(message),
                    None => self.command_registry.execute(
                        &name,
                        &CommandContext {
                            sender_name: sender.to_string(),
                            args,
                        },
                    ),
                }
            }
        }
    }

    fn cmd_help(&self, sender: &str) -> CommandResult {
        let mut entries = self.command_registry.help_args();
        entries.extend(
            self.plugin_manager
                .plugin_commands
                .iter()
                .map(|(name, cmd)| format!("{name}:{}", cmd.description)),
        );
        entries.sort();
        self.command_registry.execute(
            "help",
            &CommandContext {
                sender_name: sender.to_string(),
                args: entries,
            },
        )
    }

    fn cmd_join(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::err("Usage: join <player>");
        };
        if self.world.find_online(name).is_some_and(|p| p.name.eq_ignore_ascii_case(name)) {
            return CommandResult::err(format!("{name} is already online"));
        }
        self.join(name);
        CommandResult::ok(format!("{name} joined the game"))
    }

    fn cmd_quit(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::err("Usage: quit <player>");
        };
        if self.quit(name) {
            CommandResult::ok(format!("{name} left the game"))
        } else {
            CommandResult::err(format!("{name} is not online"))
        }
    }

    fn cmd_portal(&mut self, args: &[String]) -> CommandResult {
        let cause = match args.get(1).map(|s| s.to_lowercase()).as_deref() {
            Some("nether") => PortalCause::NetherPortal,
            Some("end") => PortalCause::EndPortal,
            _ => return CommandResult::err("Usage: portal <player> <nether|end>"),
        };
        let name = &args[0];
        if self.world.find_online(name).is_none() {
            return CommandResult::err(format!("{name} is not online"));
        }
        match self.portal(name, cause) {
            Some(to) => CommandResult::ok(format!(
                "{name} travelled to {} ({:.1}, {:.1}, {:.1})",
                to.world, to.x, to.y, to.z
            )),
            None => CommandResult::err(format!("{name} went nowhere")),
        }
    }

    fn cmd_kill(&mut self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return CommandResult::err("Usage: kill <player>");
        };
        match self.kill(name) {
            Some(at) => CommandResult::ok(format!(
                "{name} respawned in {} ({:.1}, {:.1}, {:.1})",
                at.world, at.x, at.y, at.z
            )),
            None => CommandResult::err(format!("{name} is not online")),
        }
    }

    fn cmd_worlds(&self) -> CommandResult {
        let mut lines = vec![format!("{} worlds loaded:", self.world.worlds().count())];
        lines.extend(self.world.worlds().map(|w| {
            format!("  {} ({:?}, seed {})", w.name, w.dimension, w.seed)
        }));
        CommandResult {
            success: true,
            messages: lines,
            should_stop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host::new(HostWorld::new("world", 3, None))
    }

    #[test]
    fn join_list_quit() {
        let mut host = host();
        assert!(host.handle_console_command("join Alice").success);
        assert!(!host.handle_console_command("join alice").success);
        host.handle_console_command("join Bob");
        let list = host.handle_console_command("list");
        assert_eq!(list.messages, vec!["There are 2 players online: Alice, Bob"]);
        assert!(host.handle_console_command("/quit Bob").success);
        assert!(!host.handle_console_command("quit Bob").success);
    }

    #[test]
    fn operator_commands_need_op() {
        let mut host = host();
        host.join("Alice");
        let result = host.handle_command("Alice", "join Mallory");
        assert_eq!(result.messages, vec!["You don't have permission!"]);
        host.world_mut().add_op("Alice");
        assert!(host.handle_command("Alice", "join Mallory").success);
        // help and list are open to everyone
        host.join("Bob");
        assert!(host.handle_command("Bob", "list").success);
    }

    #[test]
    fn portal_without_plugins_uses_shared_worlds() {
        let mut host = host();
        host.join("Alice");
        let result = host.handle_console_command("portal Alice nether");
        assert!(result.success);
        assert_eq!(
            host.world().player("Alice").unwrap().state.location.world,
            "world_nether"
        );
        assert!(!host.handle_console_command("portal Alice sideways").success);
        assert!(!host.handle_console_command("portal").success);
    }

    #[test]
    fn kill_respawns_at_default_spawn() {
        let mut host = host();
        host.join("Alice");
        host.world_mut().player_mut("Alice").unwrap().state.level = 9;
        let result = host.handle_console_command("kill Alice");
        assert!(result.success);
        let state = &host.world().player("Alice").unwrap().state;
        assert_eq!(state.level, 0);
        assert_eq!(state.location.world, "world");
    }

    #[test]
    fn worlds_and_help() {
        let mut host = host();
        let worlds = host.handle_console_command("worlds");
        assert_eq!(worlds.messages[0], "3 worlds loaded:");
        let help = host.handle_console_command("help");
        assert!(help.messages.iter().any(|l| l == "  portal - Send a player through a portal (nether|end)"));
    }

    #[test]
    fn stop_and_unknown() {
        let mut host = host();
        assert!(host.handle_console_command("stop").should_stop);
        let unknown = host.handle_console_command("frobnicate");
        assert!(!unknown.success);
        assert!(!host.handle_console_command("   ").success);
    }

    #[test]
    fn ticks_advance() {
        let mut host = host();
        host.run_ticks(5);
        assert_eq!(host.current_tick(), 5);
    }
}
