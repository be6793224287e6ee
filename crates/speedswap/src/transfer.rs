//! State transfer: snapshot every participant, then hand the snapshots on.

use speedswap_plugin_api::{PlayerState, ServerApi};
use tracing::{debug, warn};

use crate::error::SwapError;

/// Max health used when the host exposes no attribute for the target.
pub const DEFAULT_MAX_HEALTH: f64 = 20.0;

/// Cyclic shift by one: the snapshot of participant `i` goes to `(i + 1) mod n`.
///
/// With two participants this is a direct exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRotation {
    len: usize,
}

impl SwapRotation {
    pub fn cyclic(len: usize) -> Self {
        Self { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Participant that receives the snapshot captured from `source`.
    pub fn target(&self, source: usize) -> usize {
        (source + 1) % self.len
    }
}

/// Immutable capture of one participant's transferable state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    owner: String,
    state: PlayerState,
}

impl PlayerSnapshot {
    pub fn capture(api: &dyn ServerApi, player: &str) -> Result<Self, SwapError> {
        let state = api
            .player_state(player)
            .ok_or_else(|| SwapError::Capture(player.to_string()))?;
        Ok(Self {
            owner: player.to_string(),
            state,
        })
    }

    /// Name of the participant this snapshot was taken from.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Overwrite `target`'s state with this snapshot.
    ///
    /// Health is capped at the target's own max health; status effects and
    /// inventory are replaced, never merged. The teleport goes first, and if
    /// it fails no other field is written.
    pub fn apply_to(&self, api: &mut dyn ServerApi, target: &str) -> Result<(), SwapError> {
        let state = &self.state;
        api.teleport_player(target, &state.location)
            .map_err(|source| SwapError::Teleport {
                player: target.to_string(),
                world: state.location.world.clone(),
                source,
            })?;
        api.set_inventory(target, &state.inventory);

        let max_health = api.max_health(target).unwrap_or(DEFAULT_MAX_HEALTH);
        api.set_player_health(target, state.health.min(max_health));
        api.set_player_food(target, state.food, state.saturation);
        api.set_player_experience(target, state.level, state.exp);
        api.set_fire_ticks(target, state.fire_ticks);
        api.set_respawn_point(target, state.respawn_point.as_ref());

        let active = api
            .player_state(target)
            .map(|s| s.effects)
            .unwrap_or_default();
        for effect in &active {
            api.remove_effect(target, effect.effect_id);
        }
        for effect in &state.effects {
            api.add_effect(target, effect);
        }
        Ok(())
    }
}

/// Run one swap cycle over `participants`.
///
/// All snapshots are captured before any is applied, and a failed capture
/// aborts the cycle before anyone is touched. If applying fails, the targets
/// already written get their own snapshot back.
pub fn perform_cycle(
    api: &mut dyn ServerApi,
    participants: &[String],
    rotation: SwapRotation,
    announce: bool,
) -> Result<(), SwapError> {
    if participants.len() < 2 || rotation.len() != participants.len() {
        warn!(
            "Skipping swap: {} participant(s), rotation over {}",
            participants.len(),
            rotation.len()
        );
        return Ok(());
    }

    let snapshots = participants
        .iter()
        .map(|p| PlayerSnapshot::capture(api, p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut applied: Vec<usize> = Vec::with_capacity(snapshots.len());
    for (source, snapshot) in snapshots.iter().enumerate() {
        let target = rotation.target(source);
        if let Err(e) = snapshot.apply_to(api, &participants[target]) {
            warn!("Swap cycle aborted: {e}");
            for &restored in applied.iter().rev() {
                if let Err(undo) = snapshots[restored].apply_to(api, &participants[restored]) {
                    warn!("Could not restore {}: {undo}", participants[restored]);
                }
            }
            return Err(e);
        }
        debug!("{} received the state of {}", participants[target], snapshot.owner());
        applied.push(target);
    }

    if announce {
        for (source, snapshot) in snapshots.iter().enumerate() {
            let target = &participants[rotation.target(source)];
            api.send_message(target, &format!("Swapped with {}!", snapshot.owner()));
        }
    }
    Ok(())
}
