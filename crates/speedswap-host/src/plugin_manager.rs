//! Plugin manager: loads, enables, and dispatches events to plugins.

use std::collections::HashMap;
use std::path::Path;

use speedswap_plugin_api::{
    Dimension, EventResult, HostError, Inventory, Location, LogLevel, PlayerState, Plugin,
    PluginEvent, PluginPlayer, ServerApi, Sidebar, StatusEffect, WorldInfo,
};
use tracing::{debug, error, info, warn};

use crate::world::HostWorld;

// ─── Types ───────────────────────────────────────────────────────────────────

/// A scheduled task owned by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub plugin_name: String,
    pub task_id: u32,
    pub remaining_ticks: u64,
    /// `None` = one-shot, `Some(n)` = repeating every `n` ticks.
    pub interval: Option<u64>,
}

/// Deferred side-effect requested by a plugin during a callback.
///
/// Player and world writes apply immediately; chat and scheduler changes are
/// queued and applied once the callback returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    SendMessage {
        player_name: String,
        message: String,
    },
    BroadcastMessage {
        message: String,
    },
    RegisterCommand {
        name: String,
        description: String,
        plugin_name: String,
    },
    ScheduleTask {
        task: ScheduledTask,
    },
    CancelTask {
        plugin_name: String,
        task_id: u32,
    },
}

// ─── ServerApiImpl ───────────────────────────────────────────────────────────

/// Implements `ServerApi` over the live world, accumulating PendingActions for deferred writes.
struct ServerApiImpl<'a> {
    world: &'a mut HostWorld,
    actions: Vec<PendingAction>,
}

impl<'a> ServerApiImpl<'a> {
    fn new(world: &'a mut HostWorld) -> Self {
        Self {
            world,
            actions: Vec::new(),
        }
    }

    fn take_actions(self) -> Vec<PendingAction> {
        self.actions
    }
}

impl ServerApi for ServerApiImpl<'_> {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.world
            .online_players()
            .map(|p| p.to_plugin_player())
            .collect()
    }

    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.world.find_online(name).map(|p| p.to_plugin_player())
    }

    fn is_online(&self, player_name: &str) -> bool {
        self.world.player(player_name).is_some_and(|p| p.online)
    }

    fn has_permission(&self, sender: &str, _permission: &str) -> bool {
        sender == crate::host::CONSOLE_SENDER || self.world.is_op(sender)
    }

    fn send_message(&mut self, player_name: &str, message: &str) {
        self.actions.push(PendingAction::SendMessage {
            player_name: player_name.to_string(),
            message: message.to_string(),
        });
    }

    fn broadcast_message(&mut self, message: &str) {
        self.actions.push(PendingAction::BroadcastMessage {
            message: message.to_string(),
        });
    }

    fn player_state(&self, player_name: &str) -> Option<PlayerState> {
        self.world
            .player(player_name)
            .filter(|p| p.online)
            .map(|p| p.state.clone())
    }

    fn max_health(&self, player_name: &str) -> Option<f64> {
        self.world.player(player_name).map(|p| p.max_health)
    }

    fn teleport_player(&mut self, player_name: &str, to: &Location) -> Result<(), HostError> {
        self.world.teleport(player_name, to)
    }

    fn set_inventory(&mut self, player_name: &str, inventory: &Inventory) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.inventory = inventory.clone();
        }
    }

    fn set_player_health(&mut self, player_name: &str, health: f64) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.health = health.clamp(0.0, p.max_health);
        }
    }

    fn set_player_food(&mut self, player_name: &str, food: i32, saturation: f32) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.food = food.clamp(0, 20);
            p.state.saturation = saturation.max(0.0);
        }
    }

    fn set_player_experience(&mut self, player_name: &str, level: i32, progress: f32) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.level = level.max(0);
            p.state.exp = progress.clamp(0.0, 1.0);
        }
    }

    fn set_fire_ticks(&mut self, player_name: &str, ticks: i32) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.fire_ticks = ticks;
        }
    }

    fn set_respawn_point(&mut self, player_name: &str, point: Option<&Location>) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.respawn_point = point.cloned();
        }
    }

    fn add_effect(&mut self, player_name: &str, effect: &StatusEffect) {
        self.world.add_effect(player_name, effect);
    }

    fn remove_effect(&mut self, player_name: &str, effect_id: i32) {
        if let Some(p) = self.world.online_mut(player_name) {
            p.state.effects.retain(|e| e.effect_id != effect_id);
        }
    }

    fn show_sidebar(&mut self, player_name: &str, sidebar: &Sidebar) {
        self.world.set_sidebar(player_name, Some(sidebar.clone()));
    }

    fn reset_sidebar(&mut self, player_name: &str) {
        self.world.set_sidebar(player_name, None);
    }

    fn get_world(&self, name: &str) -> Option<WorldInfo> {
        self.world.get_world(name).cloned()
    }

    fn create_world(
        &mut self,
        name: &str,
        dimension: Dimension,
        seed: i64,
    ) -> Result<WorldInfo, HostError> {
        self.world.create_world(name, dimension, seed)
    }

    fn unload_world(&mut self, name: &str) -> bool {
        self.world.unload_world(name)
    }

    fn ticks_per_second(&self) -> u64 {
        u64::from(self.world.tick_rate())
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!("[plugin] {message}"),
            LogLevel::Warn => warn!("[plugin] {message}"),
            LogLevel::Error => error!("[plugin] {message}"),
            LogLevel::Debug => debug!("[plugin] {message}"),
        }
    }

    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.actions.push(PendingAction::ScheduleTask {
            task: ScheduledTask {
                plugin_name: plugin_name.to_string(),
                task_id,
                remaining_ticks: delay_ticks,
                interval: Some(interval_ticks.max(1)),
            },
        });
    }

    fn cancel_task(&mut self, plugin_name: &str, task_id: u32) {
        self.actions.push(PendingAction::CancelTask {
            plugin_name: plugin_name.to_string(),
            task_id,
        });
    }

    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str) {
        self.actions.push(PendingAction::RegisterCommand {
            name: name.to_string(),
            description: description.to_string(),
            plugin_name: plugin_name.to_string(),
        });
    }
}

// ─── PluginManager ───────────────────────────────────────────────────────────

/// A command registered by a plugin.
#[derive(Debug, Clone)]
pub struct PluginCommand {
    pub plugin_name: String,
    pub description: String,
}

/// Manages all loaded plugins, their scheduled tasks, and command registrations.
///
/// Every entry point applies the internal actions (commands, tasks) itself
/// and returns the chat actions for the caller to deliver.
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
    tasks: Vec<ScheduledTask>,
    /// Commands registered by plugins: command_name → owner.
    pub plugin_commands: HashMap<String, PluginCommand>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            tasks: Vec::new(),
            plugin_commands: HashMap::new(),
        }
    }

    /// Register a plugin (call before enable_all).
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        info!("Registered plugin: {}", plugin.info().name);
        self.plugins.push(plugin);
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// Enable all registered plugins.
    pub fn enable_all(&mut self, world: &mut HostWorld) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for plugin in &mut self.plugins {
            let mut api = ServerApiImpl::new(world);
            plugin.on_enable(&mut api);
            all_actions.extend(api.take_actions());
            let info = plugin.info();
            info!("Enabled plugin {} v{}", info.name, info.version);
        }
        self.apply_internal_actions(all_actions)
    }

    /// Disable all registered plugins and drop their tasks.
    pub fn disable_all(&mut self, world: &mut HostWorld) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        for plugin in &mut self.plugins {
            let mut api = ServerApiImpl::new(world);
            plugin.on_disable(&mut api);
            all_actions.extend(api.take_actions());
        }
        let remaining = self.apply_internal_actions(all_actions);
        self.tasks.clear();
        remaining
    }

    /// Dispatch an event to all plugins. Plugins may rewrite the event's
    /// mutable fields; later plugins see earlier rewrites.
    pub fn dispatch(
        &mut self,
        event: &mut PluginEvent,
        world: &mut HostWorld,
    ) -> (EventResult, Vec<PendingAction>) {
        let cancellable = event.is_cancellable();
        let mut all_actions = Vec::new();
        let mut final_result = EventResult::Continue;

        for plugin in &mut self.plugins {
            let mut api = ServerApiImpl::new(world);
            let result = plugin.on_event(event, &mut api);
            all_actions.extend(api.take_actions());

            if cancellable && result == EventResult::Cancelled {
                final_result = EventResult::Cancelled;
                break; // Stop propagation
            }
        }

        (final_result, self.apply_internal_actions(all_actions))
    }

    /// Tick the scheduler. Returns pending actions from fired tasks.
    pub fn tick_scheduler(&mut self, world: &mut HostWorld) -> Vec<PendingAction> {
        let mut all_actions = Vec::new();
        let mut fired: Vec<(String, u32)> = Vec::new();

        // Decrement and collect fired tasks
        for task in &mut self.tasks {
            if task.remaining_ticks > 0 {
                task.remaining_ticks -= 1;
            }
            if task.remaining_ticks == 0 {
                fired.push((task.plugin_name.clone(), task.task_id));
                if let Some(interval) = task.interval {
                    task.remaining_ticks = interval;
                }
            }
        }

        // Remove one-shot tasks that fired
        self.tasks
            .retain(|t| t.remaining_ticks > 0 || t.interval.is_some());

        for (plugin_name, task_id) in fired {
            // An earlier task in this tick may have cancelled this one.
            let cancelled = all_actions.iter().any(|a| {
                matches!(a, PendingAction::CancelTask { plugin_name: p, task_id: t }
                    if *p == plugin_name && *t == task_id)
            });
            if cancelled {
                continue;
            }
            if let Some(plugin) = self
                .plugins
                .iter_mut()
                .find(|p| p.info().name == plugin_name)
            {
                let mut api = ServerApiImpl::new(world);
                plugin.on_task(task_id, &mut api);
                all_actions.extend(api.take_actions());
            }
        }

        self.apply_internal_actions(all_actions)
    }

    /// Handle a plugin-registered command. Returns (response_message, pending_actions).
    pub fn handle_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        world: &mut HostWorld,
    ) -> (Option<String>, Vec<PendingAction>) {
        let plugin_name = match self.plugin_commands.get(command) {
            Some(entry) => entry.plugin_name.clone(),
            None => return (None, Vec::new()),
        };

        if let Some(plugin) = self
            .plugins
            .iter_mut()
            .find(|p| p.info().name == plugin_name)
        {
            let mut api = ServerApiImpl::new(world);
            let response = plugin.on_command(command, args, sender, &mut api);
            let actions = api.take_actions();
            (response, self.apply_internal_actions(actions))
        } else {
            (None, Vec::new())
        }
    }

    /// Load configs for all plugins from `<dir>/<plugin>/config.json`,
    /// writing the plugin's defaults when the file is absent.
    pub fn load_configs(&mut self, dir: &Path) {
        for plugin in &mut self.plugins {
            let info = plugin.info();
            if let Some(default_config) = plugin.default_config() {
                let plugin_dir = dir.join(&info.name);
                let config_path = plugin_dir.join("config.json");

                let config = if config_path.exists() {
                    match std::fs::read_to_string(&config_path) {
                        Ok(data) => match serde_json::from_str(&data) {
                            Ok(v) => v,
                            Err(e) => {
                                warn!("Failed to parse config for {}: {e}", info.name);
                                default_config.clone()
                            }
                        },
                        Err(e) => {
                            warn!("Failed to read config for {}: {e}", info.name);
                            default_config.clone()
                        }
                    }
                } else {
                    // Write default config
                    if let Err(e) = std::fs::create_dir_all(&plugin_dir) {
                        warn!("Failed to create {}: {e}", plugin_dir.display());
                    }
                    if let Ok(json) = serde_json::to_string_pretty(&default_config) {
                        if let Err(e) = std::fs::write(&config_path, json) {
                            warn!("Failed to write default config for {}: {e}", info.name);
                        }
                    }
                    default_config
                };

                plugin.load_config(config);
            }
        }
    }

    /// Apply internal actions (RegisterCommand, ScheduleTask, CancelTask)
    /// immediately and hand back the rest.
    fn apply_internal_actions(&mut self, actions: Vec<PendingAction>) -> Vec<PendingAction> {
        let mut remaining = Vec::new();
        for action in actions {
            match action {
                PendingAction::RegisterCommand {
                    name,
                    description,
                    plugin_name,
                } => {
                    self.plugin_commands.insert(
                        name.to_lowercase(),
                        PluginCommand {
                            plugin_name,
                            description,
                        },
                    );
                }
                PendingAction::ScheduleTask { task } => {
                    // Re-scheduling an existing id replaces it.
                    self.tasks.retain(|t| {
                        !(t.plugin_name == task.plugin_name && t.task_id == task.task_id)
                    });
                    self.tasks.push(task);
                }
                PendingAction::CancelTask {
                    plugin_name,
                    task_id,
                } => {
                    self.tasks
                        .retain(|t| !(t.plugin_name == plugin_name && t.task_id == task_id));
                }
                other => remaining.push(other),
            }
        }
        remaining
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
