//! `/speedswap` subcommand grammar and start-argument classification.

use thiserror::Error;

/// Permission node required to run `/speedswap`.
pub const PERMISSION: &str = "speedswap.admin";

pub const USAGE: &str = "Usage: /speedswap start <p1> <p2> [p3...] [seeds...] | /speedswap stop";

/// A parsed `/speedswap` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapCommand {
    /// Raw start tokens (player names and seeds, in order).
    Start(Vec<String>),
    Stop,
}

impl SwapCommand {
    /// Parse subcommand arguments. Returns `None` when the caller should get usage text.
    pub fn parse(args: &[String]) -> Option<Self> {
        let (sub, rest) = args.split_first()?;
        if sub.eq_ignore_ascii_case("start") {
            // Two players minimum before any seed.
            if rest.len() < 2 {
                return None;
            }
            Some(SwapCommand::Start(rest.to_vec()))
        } else if sub.eq_ignore_ascii_case("stop") {
            Some(SwapCommand::Stop)
        } else {
            None
        }
    }
}

/// Start tokens split into resolved players and seeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartArgs {
    /// Canonical player names in resolution order, without duplicates.
    pub players: Vec<String>,
    /// Seeds in order of appearance; seed `i` belongs to player `i`.
    pub seeds: Vec<i64>,
}

impl StartArgs {
    /// Seed assigned to the participant at `index`, if one was given.
    pub fn seed_for(&self, index: usize) -> Option<i64> {
        self.seeds.get(index).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartArgsError {
    #[error("Unknown player or invalid seed: {0}")]
    UnresolvedToken(String),
}

/// Classify start tokens.
///
/// Each token is first offered to `resolve`, which returns the canonical name
/// of a connected player. Tokens that do not resolve must parse as an `i64`
/// seed. A player named twice is enrolled once.
pub fn classify_start_tokens<F>(tokens: &[String], mut resolve: F) -> Result<StartArgs, StartArgsError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut args = StartArgs::default();
    for token in tokens {
        if let Some(name) = resolve(token) {
            if !args.players.contains(&name) {
                args.players.push(name);
            }
            continue;
        }
        let seed = token
            .parse::<i64>()
            .map_err(|_| StartArgsError::UnresolvedToken(token.clone()))?;
        args.seeds.push(seed);
    }
    Ok(args)
}
