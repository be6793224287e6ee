//! World provisioning: one identically-seeded world triplet per participant.
//!
//! Worlds are named `<prefix>_<owner>`, `<prefix>_<owner>_nether` and
//! `<prefix>_<owner>_the_end`. Provisioning for a whole roster is
//! transactional: worlds created by a failed start are unloaded again.

use speedswap_plugin_api::{Dimension, HostError, ServerApi, WorldInfo};
use tracing::{debug, info, warn};

use crate::error::SwapError;

const DIMENSIONS: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::TheEnd];

/// Name of the primary world owned by `owner`.
pub fn world_stem(prefix: &str, owner: &str) -> String {
    format!("{prefix}_{owner}")
}

/// Name of `owner`'s world for `dimension`.
pub fn world_name(prefix: &str, owner: &str, dimension: Dimension) -> String {
    format!("{}{}", world_stem(prefix, owner), dimension.world_suffix())
}

/// The linked worlds owned by one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSet {
    pub owner: String,
    pub seed: i64,
    pub primary: WorldInfo,
    pub nether: WorldInfo,
    pub the_end: WorldInfo,
}

/// Tracks the worlds created during one start so they can be rolled back.
#[derive(Debug)]
pub struct Provisioner<'a> {
    prefix: &'a str,
    created: Vec<String>,
}

impl<'a> Provisioner<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            created: Vec::new(),
        }
    }

    /// Create (or reuse) the three worlds for `owner`, all with `seed`.
    pub fn provision(
        &mut self,
        api: &mut dyn ServerApi,
        owner: &str,
        seed: i64,
    ) -> Result<WorldSet, HostError> {
        let [primary, nether, the_end] = DIMENSIONS.map(|dim| world_name(self.prefix, owner, dim));
        Ok(WorldSet {
            owner: owner.to_string(),
            seed,
            primary: self.ensure_world(api, &primary, Dimension::Overworld, seed)?,
            nether: self.ensure_world(api, &nether, Dimension::Nether, seed)?,
            the_end: self.ensure_world(api, &the_end, Dimension::TheEnd, seed)?,
        })
    }

    fn ensure_world(
        &mut self,
        api: &mut dyn ServerApi,
        name: &str,
        dimension: Dimension,
        seed: i64,
    ) -> Result<WorldInfo, HostError> {
        if let Some(existing) = api.get_world(name) {
            if existing.seed != seed {
                warn!(
                    "World {name} already loaded with seed {}, requested {seed}; reusing it",
                    existing.seed
                );
            }
            return Ok(existing);
        }
        let world = api.create_world(name, dimension, seed)?;
        debug!("Created world {name} ({dimension:?}, seed {seed})");
        self.created.push(name.to_string());
        Ok(world)
    }

    /// Unload every world this provisioner created.
    pub fn rollback(self, api: &mut dyn ServerApi) {
        for name in self.created.iter().rev() {
            if !api.unload_world(name) {
                warn!("Rollback could not unload world {name}");
            }
        }
        info!("Rolled back {} world(s)", self.created.len());
    }

    /// Names of the worlds created so far.
    pub fn created(&self) -> &[String] {
        &self.created
    }
}

/// Provision a world set for every `(owner, seed)` pair, in order.
///
/// On failure every world created by this call is unloaded and no sets are returned.
/// On success the provisioner is handed back so a later startup step can still
/// roll the new worlds back.
pub fn provision_all<'a>(
    api: &mut dyn ServerApi,
    prefix: &'a str,
    owners: &[(String, i64)],
) -> Result<(Vec<WorldSet>, Provisioner<'a>), SwapError> {
    let mut provisioner = Provisioner::new(prefix);
    let mut sets = Vec::with_capacity(owners.len());
    for (owner, seed) in owners {
        match provisioner.provision(api, owner, *seed) {
            Ok(set) => sets.push(set),
            Err(source) => {
                warn!("Provisioning for {owner} failed: {source}");
                provisioner.rollback(api);
                return Err(SwapError::Provisioning {
                    owner: owner.clone(),
                    source,
                });
            }
        }
    }
    info!(
        "Provisioned {} world set(s), {} new world(s)",
        sets.len(),
        provisioner.created().len()
    );
    Ok((sets, provisioner))
}
