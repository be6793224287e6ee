//! In-memory `ServerApi` used by the unit tests.

use std::collections::HashMap;

use speedswap_plugin_api::{
    Dimension, HostError, Inventory, ItemStack, Location, LogLevel, PlayerState, PluginPlayer,
    ServerApi, Sidebar, StatusEffect, WorldInfo,
};

pub struct MockPlayer {
    pub name: String,
    pub online: bool,
    pub state: PlayerState,
    pub max_health: Option<f64>,
    pub sidebar: Option<Sidebar>,
    pub messages: Vec<String>,
}

#[derive(Default)]
pub struct MockServer {
    pub players: Vec<MockPlayer>,
    pub worlds: HashMap<String, WorldInfo>,
    pub world_limit: Option<usize>,
    /// Creating this world fails with a generation error.
    pub fail_world: Option<String>,
    /// Teleports of this player fail.
    pub fail_teleport: Option<String>,
    pub tick_rate: u64,
    pub broadcasts: Vec<String>,
    pub ops: Vec<String>,
    pub scheduled: Vec<(String, u64, u64, u32)>,
    pub cancelled: Vec<(String, u32)>,
    pub commands: Vec<String>,
}

/// A distinct, fully populated state; `n` varies every field.
pub fn sample_state(world: &str, n: i32) -> PlayerState {
    let mut inventory = Inventory::empty();
    inventory.storage[0] = Some(ItemStack::new("minecraft:stone", n as u16 + 1));
    PlayerState {
        location: Location::new(world, f64::from(n) * 10.0, 64.0, f64::from(n) * -10.0)
            .with_rotation(n as f32, 0.0),
        inventory,
        health: 10.0 + f64::from(n),
        food: 20 - n,
        saturation: 5.0,
        level: n,
        exp: 0.25,
        effects: vec![StatusEffect {
            effect_id: n + 1,
            amplifier: 0,
            duration_ticks: 600,
        }],
        fire_ticks: n * 20,
        respawn_point: Some(Location::new(world, 1.0, 2.0, 3.0)),
    }
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            tick_rate: 20,
            ..Self::default()
        }
    }

    pub fn add_player(&mut self, name: &str, state: PlayerState) {
        self.players.push(MockPlayer {
            name: name.to_string(),
            online: true,
            state,
            max_health: Some(20.0),
            sidebar: None,
            messages: Vec::new(),
        });
    }

    pub fn player(&self, name: &str) -> &MockPlayer {
        self.players
            .iter()
            .find(|p| p.name == name)
            .expect("no such mock player")
    }

    pub fn player_mut(&mut self, name: &str) -> &mut MockPlayer {
        self.players
            .iter_mut()
            .find(|p| p.name == name)
            .expect("no such mock player")
    }

    fn with_player(&mut self, name: &str, f: impl FnOnce(&mut MockPlayer)) {
        if let Some(p) = self.players.iter_mut().find(|p| p.name == name) {
            f(p);
        }
    }

    fn to_plugin_player(p: &MockPlayer) -> PluginPlayer {
        PluginPlayer {
            name: p.name.clone(),
            uuid: format!("uuid-{}", p.name),
            world: p.state.location.world.clone(),
            position: (p.state.location.x, p.state.location.y, p.state.location.z),
        }
    }
}

impl ServerApi for MockServer {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.players
            .iter()
            .filter(|p| p.online)
            .map(Self::to_plugin_player)
            .collect()
    }

    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.players
            .iter()
            .find(|p| p.online && p.name.eq_ignore_ascii_case(name))
            .map(Self::to_plugin_player)
    }

    fn is_online(&self, player_name: &str) -> bool {
        self.players
            .iter()
            .any(|p| p.online && p.name == player_name)
    }

    fn has_permission(&self, sender: &str, _permission: &str) -> bool {
        self.ops.iter().any(|o| o == sender)
    }

    fn send_message(&mut self, player_name: &str, message: &str) {
        self.with_player(player_name, |p| p.messages.push(message.to_string()));
    }

    fn broadcast_message(&mut self, message: &str) {
        self.broadcasts.push(message.to_string());
    }

    fn player_state(&self, player_name: &str) -> Option<PlayerState> {
        self.players
            .iter()
            .find(|p| p.online && p.name == player_name)
            .map(|p| p.state.clone())
    }

    fn max_health(&self, player_name: &str) -> Option<f64> {
        self.players
            .iter()
            .find(|p| p.name == player_name)
            .and_then(|p| p.max_health)
    }

    fn teleport_player(&mut self, player_name: &str, to: &Location) -> Result<(), HostError> {
        if self.fail_teleport.as_deref() == Some(player_name) {
            return Err(HostError::UnknownWorld(to.world.clone()));
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == player_name)
            .ok_or_else(|| HostError::UnknownPlayer(player_name.to_string()))?;
        player.state.location = to.clone();
        Ok(())
    }

    fn set_inventory(&mut self, player_name: &str, inventory: &Inventory) {
        self.with_player(player_name, |p| p.state.inventory = inventory.clone());
    }

    fn set_player_health(&mut self, player_name: &str, health: f64) {
        self.with_player(player_name, |p| p.state.health = health);
    }

    fn set_player_food(&mut self, player_name: &str, food: i32, saturation: f32) {
        self.with_player(player_name, |p| {
            p.state.food = food;
            p.state.saturation = saturation;
        });
    }

    fn set_player_experience(&mut self, player_name: &str, level: i32, progress: f32) {
        self.with_player(player_name, |p| {
            p.state.level = level;
            p.state.exp = progress;
        });
    }

    fn set_fire_ticks(&mut self, player_name: &str, ticks: i32) {
        self.with_player(player_name, |p| p.state.fire_ticks = ticks);
    }

    fn set_respawn_point(&mut self, player_name: &str, point: Option<&Location>) {
        self.with_player(player_name, |p| p.state.respawn_point = point.cloned());
    }

    fn add_effect(&mut self, player_name: &str, effect: &StatusEffect) {
        self.with_player(player_name, |p| {
            p.state.effects.retain(|e| e.effect_id != effect.effect_id);
            p.state.effects.push(effect.clone());
        });
    }

    fn remove_effect(&mut self, player_name: &str, effect_id: i32) {
        self.with_player(player_name, |p| {
            p.state.effects.retain(|e| e.effect_id != effect_id)
        });
    }

    fn show_sidebar(&mut self, player_name: &str, sidebar: &Sidebar) {
        self.with_player(player_name, |p| p.sidebar = Some(sidebar.clone()));
    }

    fn reset_sidebar(&mut self, player_name: &str) {
        self.with_player(player_name, |p| p.sidebar = None);
    }

    fn get_world(&self, name: &str) -> Option<WorldInfo> {
        self.worlds.get(name).cloned()
    }

    fn create_world(
        &mut self,
        name: &str,
        dimension: Dimension,
        seed: i64,
    ) -> Result<WorldInfo, HostError> {
        if self.worlds.contains_key(name) {
            return Err(HostError::WorldExists(name.to_string()));
        }
        if let Some(limit) = self.world_limit {
            if self.worlds.len() >= limit {
                return Err(HostError::WorldLimit { limit });
            }
        }
        if self.fail_world.as_deref() == Some(name) {
            return Err(HostError::Generation {
                name: name.to_string(),
                reason: "test failure".into(),
            });
        }
        let spawn = match dimension {
            Dimension::TheEnd => Location::new(name, 100.5, 49.0, 0.5),
            _ => Location::new(name, 0.5, 64.0, 0.5),
        };
        let world = WorldInfo {
            name: name.to_string(),
            dimension,
            seed,
            spawn,
        };
        self.worlds.insert(name.to_string(), world.clone());
        Ok(world)
    }

    fn unload_world(&mut self, name: &str) -> bool {
        self.worlds.remove(name).is_some()
    }

    fn ticks_per_second(&self) -> u64 {
        self.tick_rate
    }

    fn log(&self, _level: LogLevel, _message: &str) {}

    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.scheduled
            .push((plugin_name.to_string(), delay_ticks, interval_ticks, task_id));
    }

    fn cancel_task(&mut self, plugin_name: &str, task_id: u32) {
        self.cancelled.push((plugin_name.to_string(), task_id));
    }

    fn register_command(&mut self, name: &str, _description: &str, _plugin_name: &str) {
        self.commands.push(name.to_string());
    }
}
