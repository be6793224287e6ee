//! Plugin API: traits, events, and server API for plugin authors.
//!
//! This crate defines the interface between a host server and the plugins it
//! loads. It has no dependency on any host implementation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Information about an online player, passed to plugins in events.
#[derive(Debug, Clone)]
pub struct PluginPlayer {
    pub name: String,
    pub uuid: String,
    /// Name of the world the player is currently in.
    pub world: String,
    pub position: (f64, f64, f64),
}

/// World environment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Overworld,
    Nether,
    TheEnd,
}

impl Dimension {
    /// Conventional world-name suffix for this dimension (empty for the overworld).
    pub fn world_suffix(self) -> &'static str {
        match self {
            Dimension::Overworld => "",
            Dimension::Nether => "_nether",
            Dimension::TheEnd => "_the_end",
        }
    }
}

/// A position inside a named world, with orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_rotation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }
}

/// An item stack in a player inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Namespaced item identifier, e.g. `minecraft:diamond_pickaxe`.
    pub item: String,
    pub count: u16,
    /// Durability damage or variant metadata.
    pub damage: u16,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u16) -> Self {
        Self {
            item: item.into(),
            count,
            damage: 0,
        }
    }
}

/// A single inventory slot. `None` is an empty slot.
pub type Slot = Option<ItemStack>;

/// Number of storage slots (hotbar included).
pub const STORAGE_SLOTS: usize = 36;
/// Number of worn-equipment slots (helmet, chestplate, leggings, boots).
pub const ARMOR_SLOTS: usize = 4;
/// Number of auxiliary slots (offhand).
pub const EXTRA_SLOTS: usize = 1;

/// The three slot groups of a player inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub storage: Vec<Slot>,
    pub armor: Vec<Slot>,
    pub extra: Vec<Slot>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::empty()
    }
}

impl Inventory {
    /// An inventory with every slot empty.
    pub fn empty() -> Self {
        Self {
            storage: vec![None; STORAGE_SLOTS],
            armor: vec![None; ARMOR_SLOTS],
            extra: vec![None; EXTRA_SLOTS],
        }
    }
}

/// An active timed status effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect type ID. A player has at most one active effect per type.
    pub effect_id: i32,
    /// Amplifier (0 = level I, 1 = level II, etc.).
    pub amplifier: i32,
    /// Remaining duration in ticks.
    pub duration_ticks: i32,
}

/// The transferable state of a player, as read from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub location: Location,
    pub inventory: Inventory,
    pub health: f64,
    pub food: i32,
    pub saturation: f32,
    pub level: i32,
    /// Progress towards the next level (0.0 .. 1.0).
    pub exp: f32,
    pub effects: Vec<StatusEffect>,
    /// Remaining burn time in ticks.
    pub fire_ticks: i32,
    /// Bed/anchor respawn point, if the player has one.
    pub respawn_point: Option<Location>,
}

/// Registry entry for a loaded world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldInfo {
    pub name: String,
    pub dimension: Dimension,
    pub seed: i64,
    pub spawn: Location,
}

/// A sidebar scoreboard: a title and scored lines, highest score on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidebar {
    pub title: String,
    lines: Vec<(String, i32)>,
}

impl Sidebar {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    /// Set the score of an entry, adding it if absent.
    pub fn set_score(&mut self, entry: impl Into<String>, score: i32) {
        let entry = entry.into();
        match self.lines.iter_mut().find(|(e, _)| *e == entry) {
            Some(line) => line.1 = score,
            None => self.lines.push((entry, score)),
        }
    }

    /// Remove every entry.
    pub fn reset_scores(&mut self) {
        self.lines.clear();
    }

    /// Entries ordered for display (highest score first).
    pub fn lines(&self) -> Vec<&str> {
        let mut sorted: Vec<&(String, i32)> = self.lines.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.into_iter().map(|(e, _)| e.as_str()).collect()
    }
}

/// What triggered a dimension crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalCause {
    NetherPortal,
    EndPortal,
}

/// Mutable result of a portal event. Plugins may rewrite it before the host travels.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalOutcome {
    /// Destination. `None` means the host found no destination.
    pub to: Option<Location>,
    /// Whether the host may build a portal at the destination if none exists.
    pub can_create_portal: bool,
    /// Radius (blocks) searched for an existing portal at the destination.
    pub search_radius: i32,
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// Result of dispatching an event to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// Event was cancelled by this plugin.
    Cancelled,
}

/// Errors reported by host world and player operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("world already exists: {0}")]
    WorldExists(String),

    #[error("world limit reached ({limit} worlds)")]
    WorldLimit { limit: usize },

    #[error("world generation failed for {name}: {reason}")]
    Generation { name: String, reason: String },

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("unknown world: {0}")]
    UnknownWorld(String),
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// All events that plugins can listen to.
///
/// Events are dispatched by mutable reference: fields documented as mutable
/// may be rewritten by a plugin and the host honours the final value.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    PlayerJoin {
        player: PluginPlayer,
    },
    PlayerQuit {
        player: PluginPlayer,
    },
    /// A player is about to cross a portal. `outcome` is mutable.
    PlayerPortal {
        player: PluginPlayer,
        from: Location,
        cause: PortalCause,
        outcome: PortalOutcome,
    },
    /// A dead player is about to respawn. `location` is mutable.
    PlayerRespawn {
        player: PluginPlayer,
        /// World the player died in.
        died_in: String,
        /// Whether `location` comes from the player's bed/anchor point.
        bed_spawn: bool,
        location: Location,
    },
    ServerStarted,
    ServerStopping,
}

impl PluginEvent {
    /// Whether this event type can be cancelled by a plugin.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, PluginEvent::PlayerPortal { .. })
    }
}

// ─── Plugin trait ────────────────────────────────────────────────────────────

/// Metadata about a plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// The Plugin trait: implemented by plugins loaded into a host.
pub trait Plugin: Send {
    /// Return plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Called when the plugin is loaded. Use `api` to register commands, schedule tasks.
    fn on_enable(&mut self, api: &mut dyn ServerApi);

    /// Called when the plugin is unloaded.
    fn on_disable(&mut self, api: &mut dyn ServerApi) {
        let _ = api;
    }

    /// Called for every dispatched event. Return `Cancelled` to cancel cancellable events.
    fn on_event(&mut self, event: &mut PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        let _ = (event, api);
        EventResult::Continue
    }

    /// Called when a scheduled task fires.
    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        let _ = (task_id, api);
    }

    /// Called when a plugin-registered command is executed. Return a response message.
    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        api: &mut dyn ServerApi,
    ) -> Option<String> {
        let _ = (command, args, sender, api);
        None
    }

    /// Return a default config as JSON. If `Some`, the plugin gets a config file.
    fn default_config(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called with the loaded config (from `plugins/<name>/config.json`).
    fn load_config(&mut self, _config: serde_json::Value) {}
}

// ─── Server API ──────────────────────────────────────────────────────────────

/// Access to server state, passed to plugins during callbacks.
///
/// Reads and player/world writes take effect immediately, so a plugin observes
/// its own writes within one callback. Messages, scheduler and command
/// registration calls are deferred until the callback returns.
pub trait ServerApi {
    // --- Players ---
    fn online_players(&self) -> Vec<PluginPlayer>;
    /// Resolve an online player by exact name, or by unambiguous name prefix
    /// (both case-insensitive).
    fn get_player(&self, name: &str) -> Option<PluginPlayer>;
    fn is_online(&self, player_name: &str) -> bool;
    fn has_permission(&self, sender: &str, permission: &str) -> bool;
    fn send_message(&mut self, player_name: &str, message: &str);
    fn broadcast_message(&mut self, message: &str);

    // --- Player state ---
    fn player_state(&self, player_name: &str) -> Option<PlayerState>;
    /// Current max-health attribute, if the host exposes one for this player.
    fn max_health(&self, player_name: &str) -> Option<f64>;
    fn teleport_player(&mut self, player_name: &str, to: &Location) -> Result<(), HostError>;
    fn set_inventory(&mut self, player_name: &str, inventory: &Inventory);
    fn set_player_health(&mut self, player_name: &str, health: f64);
    fn set_player_food(&mut self, player_name: &str, food: i32, saturation: f32);
    fn set_player_experience(&mut self, player_name: &str, level: i32, progress: f32);
    fn set_fire_ticks(&mut self, player_name: &str, ticks: i32);
    fn set_respawn_point(&mut self, player_name: &str, point: Option<&Location>);
    fn add_effect(&mut self, player_name: &str, effect: &StatusEffect);
    fn remove_effect(&mut self, player_name: &str, effect_id: i32);

    // --- Display ---
    fn show_sidebar(&mut self, player_name: &str, sidebar: &Sidebar);
    /// Put the player back on the host's default scoreboard.
    fn reset_sidebar(&mut self, player_name: &str);

    // --- Worlds ---
    fn get_world(&self, name: &str) -> Option<WorldInfo>;
    fn create_world(
        &mut self,
        name: &str,
        dimension: Dimension,
        seed: i64,
    ) -> Result<WorldInfo, HostError>;
    /// Unload a world from the registry. Returns false if it was not loaded.
    fn unload_world(&mut self, name: &str) -> bool;

    // --- Server ---
    /// Game ticks per second. Scheduler delays and intervals count these ticks.
    fn ticks_per_second(&self) -> u64;
    fn log(&self, level: LogLevel, message: &str);

    // --- Scheduler ---
    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    );
    fn cancel_task(&mut self, plugin_name: &str, task_id: u32);

    // --- Commands ---
    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_suffixes() {
        assert_eq!(Dimension::Overworld.world_suffix(), "");
        assert_eq!(Dimension::Nether.world_suffix(), "_nether");
        assert_eq!(Dimension::TheEnd.world_suffix(), "_the_end");
    }

    #[test]
    fn dimension_serializes_snake_case() {
        let json = serde_json::to_string(&Dimension::TheEnd).unwrap();
        assert_eq!(json, "\"the_end\"");
    }

    #[test]
    fn location_rotation() {
        let loc = Location::new("world", 1.0, 2.0, 3.0).with_rotation(90.0, -10.0);
        assert_eq!(loc.world, "world");
        assert_eq!(loc.yaw, 90.0);
        assert_eq!(loc.pitch, -10.0);
    }

    #[test]
    fn empty_inventory_layout() {
        let inv = Inventory::empty();
        assert_eq!(inv.storage.len(), STORAGE_SLOTS);
        assert_eq!(inv.armor.len(), ARMOR_SLOTS);
        assert_eq!(inv.extra.len(), EXTRA_SLOTS);
        assert!(inv.storage.iter().chain(&inv.armor).all(Option::is_none));
    }

    #[test]
    fn sidebar_orders_by_score() {
        let mut board = Sidebar::new("Title");
        board.set_score("low", 1);
        board.set_score("high", 2);
        assert_eq!(board.lines(), vec!["high", "low"]);
    }

    #[test]
    fn sidebar_updates_existing_entry() {
        let mut board = Sidebar::new("Title");
        board.set_score("a", 1);
        board.set_score("a", 5);
        assert_eq!(board.lines(), vec!["a"]);
    }

    #[test]
    fn sidebar_reset_clears() {
        let mut board = Sidebar::new("Title");
        board.set_score("a", 1);
        board.reset_scores();
        assert!(board.lines().is_empty());
        assert_eq!(board.title, "Title");
    }

    #[test]
    fn host_error_messages() {
        assert_eq!(
            HostError::WorldLimit { limit: 4 }.to_string(),
            "world limit reached (4 worlds)"
        );
        assert_eq!(
            HostError::UnknownPlayer("Bob".into()).to_string(),
            "unknown player: Bob"
        );
    }

    #[test]
    fn event_cancellable_flags() {
        let player = PluginPlayer {
            name: "Alice".into(),
            uuid: "u1".into(),
            world: "world".into(),
            position: (0.0, 64.0, 0.0),
        };
        assert!(PluginEvent::PlayerPortal {
            player: player.clone(),
            from: Location::new("world", 0.0, 64.0, 0.0),
            cause: PortalCause::NetherPortal,
            outcome: PortalOutcome {
                to: None,
                can_create_portal: false,
                search_radius: 128,
            },
        }
        .is_cancellable());
        assert!(!PluginEvent::PlayerJoin {
            player: player.clone()
        }
        .is_cancellable());
        assert!(!PluginEvent::PlayerRespawn {
            player,
            died_in: "world".into(),
            bed_spawn: false,
            location: Location::new("world", 0.0, 64.0, 0.0),
        }
        .is_cancellable());
        assert!(!PluginEvent::ServerStopping.is_cancellable());
    }
}
