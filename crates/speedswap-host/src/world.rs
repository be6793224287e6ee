//! In-memory world registry and player table.
//!
//! Worlds are registry entries only (name, dimension, seed, spawn); there is
//! no terrain. Players carry the full transferable state.

use std::collections::{BTreeMap, HashSet};

use speedswap_plugin_api::{
    Dimension, HostError, Inventory, Location, PlayerState, PluginPlayer, PortalCause,
    PortalOutcome, Sidebar, StatusEffect, WorldInfo,
};
use tracing::{debug, info};

use crate::config::{HostConfig, DEFAULT_TICK_RATE};

pub const DEFAULT_MAX_HEALTH: f64 = 20.0;

/// Nether coordinate scaling factor.
const NETHER_SCALE: f64 = 8.0;

/// Search radius (in blocks) when looking for an existing portal in the target dimension.
const PORTAL_SEARCH_RADIUS: i32 = 128;

/// Fixed End spawn position (feet Y).
const END_SPAWN_Y: f64 = 49.0;

/// Spawn point of a freshly created world. Depends only on dimension and seed.
pub fn world_spawn(name: &str, dimension: Dimension, seed: i64) -> Location {
    match dimension {
        Dimension::Overworld => {
            let offset = seed.rem_euclid(16) as f64;
            Location::new(name, offset + 0.5, 64.0, 0.5)
        }
        Dimension::Nether => Location::new(name, 0.5, 64.0, 0.5),
        Dimension::TheEnd => Location::new(name, 100.5, END_SPAWN_Y, 0.5),
    }
}

/// A known player, online or not.
#[derive(Debug, Clone)]
pub struct HostPlayer {
    pub name: String,
    pub uuid: String,
    pub online: bool,
    pub state: PlayerState,
    pub max_health: f64,
    /// Sidebar currently shown; `None` is the host default display.
    pub sidebar: Option<Sidebar>,
    /// Every chat line delivered to this player.
    pub messages: Vec<String>,
}

impl HostPlayer {
    fn new(name: &str, spawn: Location) -> Self {
        Self {
            name: name.to_string(),
            uuid: format!("{:032x}", rand::random::<u128>()),
            online: true,
            state: fresh_state(spawn),
            max_health: DEFAULT_MAX_HEALTH,
            sidebar: None,
            messages: Vec::new(),
        }
    }

    pub fn to_plugin_player(&self) -> PluginPlayer {
        let loc = &self.state.location;
        PluginPlayer {
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            world: loc.world.clone(),
            position: (loc.x, loc.y, loc.z),
        }
    }
}

fn fresh_state(location: Location) -> PlayerState {
    PlayerState {
        location,
        inventory: Inventory::empty(),
        health: DEFAULT_MAX_HEALTH,
        food: 20,
        saturation: 5.0,
        level: 0,
        exp: 0.0,
        effects: Vec::new(),
        fire_ticks: 0,
        respawn_point: None,
    }
}

/// Host-side outcome of a death, before plugins see the respawn event.
#[derive(Debug, Clone, PartialEq)]
pub struct Death {
    pub died_in: String,
    pub bed_spawn: bool,
    pub location: Location,
}

pub struct HostWorld {
    players: Vec<HostPlayer>,
    worlds: BTreeMap<String, WorldInfo>,
    default_world: String,
    max_worlds: Option<usize>,
    ops: HashSet<String>,
    broadcasts: Vec<String>,
    current_tick: u64,
    tick_rate: u32,
}

impl HostWorld {
    /// Create a host with the default world set `<name>`, `<name>_nether`, `<name>_the_end`.
    pub fn new(default_world: &str, seed: i64, max_worlds: Option<usize>) -> Self {
        let mut worlds = BTreeMap::new();
        for dimension in [Dimension::Overworld, Dimension::Nether, Dimension::TheEnd] {
            let name = format!("{default_world}{}", dimension.world_suffix());
            let spawn = world_spawn(&name, dimension, seed);
            worlds.insert(
                name.clone(),
                WorldInfo {
                    name,
                    dimension,
                    seed,
                    spawn,
                },
            );
        }
        Self {
            players: Vec::new(),
            worlds,
            default_world: default_world.to_string(),
            max_worlds,
            ops: HashSet::new(),
            broadcasts: Vec::new(),
            current_tick: 0,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        let mut world = Self::new(&config.world.name, config.world.seed, config.world.max_worlds);
        world.set_tick_rate(config.server.tick_rate);
        for op in &config.permissions.ops {
            world.add_op(op);
        }
        world
    }

    // ─── Ticks & permissions ─────────────────────────────────────────────

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn set_tick_rate(&mut self, tick_rate: u32) {
        self.tick_rate = tick_rate.max(1);
    }

    pub fn add_op(&mut self, name: &str) {
        self.ops.insert(name.to_lowercase());
    }

    pub fn is_op(&self, name: &str) -> bool {
        self.ops.contains(&name.to_lowercase())
    }

    // ─── Worlds ──────────────────────────────────────────────────────────

    pub fn default_world(&self) -> &str {
        &self.default_world
    }

    pub fn worlds(&self) -> impl Iterator<Item = &WorldInfo> {
        self.worlds.values()
    }

    pub fn get_world(&self, name: &str) -> Option<&WorldInfo> {
        self.worlds.get(name)
    }

    pub fn create_world(
        &mut self,
        name: &str,
        dimension: Dimension,
        seed: i64,
    ) -> Result<WorldInfo, HostError> {
        if self.worlds.contains_key(name) {
            return Err(HostError::WorldExists(name.to_string()));
        }
        if let Some(limit) = self.max_worlds {
            if self.worlds.len() >= limit {
                return Err(HostError::WorldLimit { limit });
            }
        }
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(HostError::Generation {
                name: name.to_string(),
                reason: "invalid world name".into(),
            });
        }
        let info = WorldInfo {
            name: name.to_string(),
            dimension,
            seed,
            spawn: world_spawn(name, dimension, seed),
        };
        self.worlds.insert(name.to_string(), info.clone());
        info!("Created world {name} ({dimension:?}, seed {seed})");
        Ok(info)
    }

    /// Unload a world. The default world set and occupied worlds stay loaded.
    pub fn unload_world(&mut self, name: &str) -> bool {
        let is_default = self
            .worlds
            .get(name)
            .is_some_and(|w| name == format!("{}{}", self.default_world, w.dimension.world_suffix()));
        let occupied = self
            .players
            .iter()
            .any(|p| p.online && p.state.location.world == name);
        if is_default || occupied {
            return false;
        }
        let removed = self.worlds.remove(name).is_some();
        if removed {
            info!("Unloaded world {name}");
        }
        removed
    }

    fn default_spawn(&self) -> Location {
        self.worlds
            .get(&self.default_world)
            .map(|w| w.spawn.clone())
            .unwrap_or_else(|| Location::new(self.default_world.clone(), 0.5, 64.0, 0.5))
    }

    fn spawn_of(&self, world: &str) -> Option<Location> {
        self.worlds.get(world).map(|w| w.spawn.clone())
    }

    /// Where the host itself would send a portal crossing from `from`: the
    /// shared default world set.
    pub fn default_portal_outcome(&self, from: &Location, cause: PortalCause) -> PortalOutcome {
        let dimension = self.worlds.get(&from.world).map(|w| w.dimension);
        let nether = format!("{}{}", self.default_world, Dimension::Nether.world_suffix());
        let the_end = format!("{}{}", self.default_world, Dimension::TheEnd.world_suffix());
        let to = match (cause, dimension) {
            (PortalCause::NetherPortal, Some(Dimension::Overworld)) => Some(Location::new(
                nether,
                from.x / NETHER_SCALE,
                from.y,
                from.z / NETHER_SCALE,
            )),
            (PortalCause::NetherPortal, Some(Dimension::Nether)) => Some(Location::new(
                self.default_world.clone(),
                from.x * NETHER_SCALE,
                from.y,
                from.z * NETHER_SCALE,
            )),
            (PortalCause::EndPortal, Some(Dimension::Overworld)) => self.spawn_of(&the_end),
            (PortalCause::EndPortal, Some(Dimension::TheEnd)) => Some(self.default_spawn()),
            _ => None,
        };
        PortalOutcome {
            to,
            can_create_portal: cause == PortalCause::NetherPortal,
            search_radius: if cause == PortalCause::NetherPortal {
                PORTAL_SEARCH_RADIUS
            } else {
                0
            },
        }
    }

    // ─── Players ─────────────────────────────────────────────────────────

    /// Bring a player online, creating them at the default spawn on first join.
    pub fn join(&mut self, name: &str) -> PluginPlayer {
        if let Some(player) = self.player_mut(name) {
            player.online = true;
            return player.to_plugin_player();
        }
        let spawn = self.default_spawn();
        let player = HostPlayer::new(name, spawn);
        let plugin_player = player.to_plugin_player();
        self.players.push(player);
        plugin_player
    }

    /// Take a player offline. Returns `None` if they were not online.
    pub fn quit(&mut self, name: &str) -> Option<PluginPlayer> {
        let player = self.player_mut(name).filter(|p| p.online)?;
        player.online = false;
        Some(player.to_plugin_player())
    }

    /// Case-insensitive exact lookup, online or not.
    pub fn player(&self, name: &str) -> Option<&HostPlayer> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut HostPlayer> {
        self.players
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Online player lookup: exact name first, then a unique name prefix.
    pub fn find_online(&self, name: &str) -> Option<&HostPlayer> {
        let online = || self.players.iter().filter(|p| p.online);
        if let Some(p) = online().find(|p| p.name.eq_ignore_ascii_case(name)) {
            return Some(p);
        }
        let needle = name.to_lowercase();
        let mut matches = online().filter(|p| p.name.to_lowercase().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(p), None) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn online_mut(&mut self, name: &str) -> Option<&mut HostPlayer> {
        self.player_mut(name).filter(|p| p.online)
    }

    pub fn online_players(&self) -> impl Iterator<Item = &HostPlayer> {
        self.players.iter().filter(|p| p.online)
    }

    pub fn teleport(&mut self, name: &str, to: &Location) -> Result<(), HostError> {
        if !self.worlds.contains_key(&to.world) {
            return Err(HostError::UnknownWorld(to.world.clone()));
        }
        let player = self
            .online_mut(name)
            .ok_or_else(|| HostError::UnknownPlayer(name.to_string()))?;
        debug!("Teleport {} -> {} ({}, {}, {})", player.name, to.world, to.x, to.y, to.z);
        player.state.location = to.clone();
        Ok(())
    }

    pub fn add_effect(&mut self, name: &str, effect: &StatusEffect) {
        if let Some(player) = self.online_mut(name) {
            player
                .state
                .effects
                .retain(|e| e.effect_id != effect.effect_id);
            player.state.effects.push(effect.clone());
        }
    }

    /// Kill a player and compute the host's default respawn: the respawn
    /// point when one is set, otherwise the default world spawn.
    pub fn kill(&mut self, name: &str) -> Option<Death> {
        let default_spawn = self.default_spawn();
        let player = self.online_mut(name)?;
        let died_in = player.state.location.world.clone();
        let (bed_spawn, location) = match player.state.respawn_point.clone() {
            Some(point) => (true, point),
            None => (false, default_spawn),
        };
        player.state.health = 0.0;
        Some(Death {
            died_in,
            bed_spawn,
            location,
        })
    }

    /// Complete a respawn at `location`, resetting the player's vitals.
    pub fn respawn(&mut self, name: &str, location: Location) {
        let Some(player) = self.online_mut(name) else {
            return;
        };
        let respawn_point = player.state.respawn_point.take();
        player.state = fresh_state(location);
        player.state.respawn_point = respawn_point;
        player.state.health = player.max_health;
    }

    // ─── Chat & display ──────────────────────────────────────────────────

    pub fn send_message(&mut self, name: &str, message: &str) {
        if let Some(player) = self.online_mut(name) {
            player.messages.push(message.to_string());
        }
    }

    pub fn broadcast(&mut self, message: &str) {
        info!("[broadcast] {message}");
        self.broadcasts.push(message.to_string());
        for player in self.players.iter_mut().filter(|p| p.online) {
            player.messages.push(message.to_string());
        }
    }

    pub fn broadcasts(&self) -> &[String] {
        &self.broadcasts
    }

    pub fn set_sidebar(&mut self, name: &str, sidebar: Option<Sidebar>) {
        if let Some(player) = self.online_mut(name) {
            player.sidebar = sidebar;
        }
    }
}
