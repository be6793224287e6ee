//! Roster and session lifecycle.

use speedswap_command::swap::classify_start_tokens;
use speedswap_plugin_api::{Location, ServerApi};
use tracing::{debug, info, warn};

use crate::config::{DisconnectDetection, SwapConfig};
use crate::error::SwapError;
use crate::provision::{provision_all, WorldSet};
use crate::scheduler::{SwapTimer, TickOutcome, SWAP_TASK_ID};

/// A player enrolled in the running session.
#[derive(Debug, Clone)]
pub struct Participant {
    pub name: String,
    pub worlds: WorldSet,
}

/// The running game. Exists only while a game is running.
pub struct Session {
    participants: Vec<Participant>,
    timer: SwapTimer,
    /// Scheduler handle of the repeating countdown task.
    task_id: u32,
    swaps: u32,
    /// Participant whose quit was seen since the last countdown tick.
    departed: Option<String>,
}

impl Session {
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Participant names in rotation order.
    pub fn names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_participant(&self, name: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Completed swap cycles.
    pub fn swaps(&self) -> u32 {
        self.swaps
    }
}

/// Owns the session and drives its startup, ticking and shutdown.
pub struct Roster {
    plugin_name: String,
    session: Option<Session>,
}

impl Roster {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_participant(&self, name: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.is_participant(name))
    }

    /// Start a game from raw command tokens. Returns the participant count.
    ///
    /// Nothing is changed unless the whole start succeeds.
    pub fn start(
        &mut self,
        api: &mut dyn ServerApi,
        config: &SwapConfig,
        tokens: &[String],
    ) -> Result<usize, SwapError> {
        if self.is_running() {
            return Err(SwapError::AlreadyRunning);
        }
        let args = classify_start_tokens(tokens, |t| api.get_player(t).map(|p| p.name))?;
        if args.players.len() < 2 {
            return Err(SwapError::NotEnoughPlayers {
                found: args.players.len(),
            });
        }

        let owners: Vec<(String, i64)> = args
            .players
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), args.seed_for(i).unwrap_or_else(rand::random)))
            .collect();

        api.broadcast_message(&format!(
            "SpeedSwap: Generating {} worlds. Please wait...",
            owners.len() * 3
        ));
        let (sets, provisioner) = provision_all(api, &config.world_prefix, &owners)?;

        let timer = SwapTimer::new(config.period_seconds);
        let participants: Vec<Participant> = sets
            .into_iter()
            .map(|worlds| Participant {
                name: worlds.owner.clone(),
                worlds,
            })
            .collect();

        if let Err(e) = place_participants(api, &participants) {
            provisioner.rollback(api);
            return Err(e);
        }

        for p in &participants {
            api.show_sidebar(&p.name, timer.board().sidebar());
            api.send_message(&p.name, "All worlds ready! Starting game...");
            info!(
                "{} -> {} (seed {})",
                p.name, p.worlds.primary.name, p.worlds.seed
            );
        }

        let interval = api.ticks_per_second().max(1);
        api.schedule_repeating(&self.plugin_name, 0, interval, SWAP_TASK_ID);
        let count = participants.len();
        self.session = Some(Session {
            participants,
            timer,
            task_id: SWAP_TASK_ID,
            swaps: 0,
            departed: None,
        });
        info!(
            "SpeedSwap started with {count} players, swapping every {}s",
            config.period_seconds
        );
        Ok(count)
    }

    /// Stop the running game, if any. Safe to call repeatedly.
    ///
    /// Returns whether a session was running.
    pub fn stop(&mut self, api: &mut dyn ServerApi) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        api.cancel_task(&self.plugin_name, session.task_id);
        for p in &session.participants {
            if api.is_online(&p.name) {
                api.reset_sidebar(&p.name);
            }
        }
        info!("SpeedSwap stopped after {} swap(s)", session.swaps);
        true
    }

    /// Run one countdown tick of the running session.
    pub fn tick(&mut self, api: &mut dyn ServerApi, config: &SwapConfig) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let names = session.names();
        let departed = session.departed.take();
        match session
            .timer
            .tick(api, &names, departed.as_deref(), config.announce_swaps)
        {
            Ok(TickOutcome::Swapped) => {
                session.swaps += 1;
                info!("Swap #{} done", session.swaps);
            }
            Ok(TickOutcome::Counted { .. }) => {}
            Ok(TickOutcome::Disconnected(name)) => {
                info!("{name} disconnected, stopping");
                self.stop(api);
            }
            Err(e) => {
                warn!("Swap cycle failed: {e}");
                api.broadcast_message(&format!("SpeedSwap stopped: {e}"));
                self.stop(api);
            }
        }
    }

    /// Record a participant's quit.
    ///
    /// With event detection the session stops at once. Otherwise the next
    /// countdown tick reports the disconnect, even if the player is back online
    /// by then.
    pub fn handle_quit(
        &mut self,
        api: &mut dyn ServerApi,
        name: &str,
        detection: DisconnectDetection,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(participant) = session
            .participants
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        else {
            return;
        };
        let name = participant.name.clone();
        match detection {
            DisconnectDetection::Event => {
                api.broadcast_message(&format!("{name} disconnected. Stopping SpeedSwap."));
                self.stop(api);
            }
            DisconnectDetection::Poll => {
                debug!("{name} quit, reporting on the next countdown tick");
                session.departed.get_or_insert(name);
            }
        }
    }
}

/// Teleport every participant to the spawn of their primary world.
///
/// On failure the participants already moved are sent back where they were.
fn place_participants(
    api: &mut dyn ServerApi,
    participants: &[Participant],
) -> Result<(), SwapError> {
    let mut placed: Vec<(&str, Location)> = Vec::with_capacity(participants.len());
    for p in participants {
        let origin = api.player_state(&p.name).map(|s| s.location);
        if let Err(source) = api.teleport_player(&p.name, &p.worlds.primary.spawn) {
            warn!("Could not place {} in {}: {source}", p.name, p.worlds.primary.name);
            for (name, origin) in placed.iter().rev() {
                if let Err(e) = api.teleport_player(name, origin) {
                    warn!("Could not return {name} to {}: {e}", origin.world);
                }
            }
            return Err(SwapError::Teleport {
                player: p.name.clone(),
                world: p.worlds.primary.name.clone(),
                source,
            });
        }
        if let Some(origin) = origin {
            placed.push((p.name.as_str(), origin));
        }
    }
    Ok(())
}
