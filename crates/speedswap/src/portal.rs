//! Portal and respawn routing inside per-player world sets.
//!
//! Without routing, a portal in `SS_Alice` would lead to the host's shared
//! nether. The router rewrites the destination to the matching world of the
//! same set:
//!
//! | from        | crossing | to              | coordinates            |
//! |-------------|----------|-----------------|------------------------|
//! | primary     | nether   | `_nether`       | x / scale, z / scale   |
//! | `_nether`   | nether   | primary         | x * scale, z * scale   |
//! | primary     | end      | `_the_end`      | fixed end platform     |
//! | `_the_end`  | end      | primary         | world spawn            |

use speedswap_plugin_api::{Dimension, Location, PortalCause, PortalOutcome, ServerApi};
use tracing::debug;

use crate::config::SwapConfig;

/// A world that belongs to a world set, split into its set stem and dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedWorld {
    /// Primary world name, `<prefix>_<owner>`.
    pub stem: String,
    pub dimension: Dimension,
}

/// Resolve a world name back to its set.
///
/// The dimension comes from the world registry, so owner names containing
/// underscores still resolve. Unregistered or unprefixed worlds yield `None`.
pub fn owned_world(api: &dyn ServerApi, prefix: &str, world_name: &str) -> Option<OwnedWorld> {
    if !world_name.starts_with(&format!("{prefix}_")) {
        return None;
    }
    let dimension = api.get_world(world_name)?.dimension;
    let stem = world_name.strip_suffix(dimension.world_suffix())?;
    if stem.len() <= prefix.len() + 1 {
        return None;
    }
    Some(OwnedWorld {
        stem: stem.to_string(),
        dimension,
    })
}

/// Compute the redirected outcome for a portal crossing starting at `from`.
///
/// Returns `None` when the crossing is not ours to route or the destination
/// world is missing; the host's own outcome then stands.
pub fn route_portal(
    api: &dyn ServerApi,
    config: &SwapConfig,
    from: &Location,
    cause: PortalCause,
) -> Option<PortalOutcome> {
    let source = owned_world(api, &config.world_prefix, &from.world)?;
    let scale = config.nether_scale;

    let destination = match (cause, source.dimension) {
        (PortalCause::NetherPortal, Dimension::Overworld) => {
            let target = format!("{}{}", source.stem, Dimension::Nether.world_suffix());
            api.get_world(&target)
                .map(|w| Location::new(w.name, from.x / scale, from.y, from.z / scale))
        }
        (PortalCause::NetherPortal, Dimension::Nether) => api
            .get_world(&source.stem)
            .map(|w| Location::new(w.name, from.x * scale, from.y, from.z * scale)),
        (PortalCause::EndPortal, Dimension::Overworld) => {
            let target = format!("{}{}", source.stem, Dimension::TheEnd.world_suffix());
            let spawn = &config.end_spawn;
            api.get_world(&target).map(|w| {
                Location::new(w.name, spawn.x, spawn.y, spawn.z).with_rotation(spawn.yaw, spawn.pitch)
            })
        }
        (PortalCause::EndPortal, Dimension::TheEnd) => {
            api.get_world(&source.stem).map(|w| w.spawn)
        }
        _ => {
            debug!("No route for {cause:?} out of {}", from.world);
            return None;
        }
    };

    let Some(to) = destination else {
        debug!("Linked world for {} missing, leaving portal to the host", from.world);
        return None;
    };

    let nether_crossing = cause == PortalCause::NetherPortal;
    Some(PortalOutcome {
        to: Some(to),
        can_create_portal: nether_crossing,
        search_radius: if nether_crossing {
            config.portal_search_radius
        } else {
            0
        },
    })
}

/// Respawn point for a non-bed respawn after dying in `died_in`: the spawn of
/// that world set's primary world.
pub fn route_respawn(api: &dyn ServerApi, config: &SwapConfig, died_in: &str) -> Option<Location> {
    let source = owned_world(api, &config.world_prefix, died_in)?;
    api.get_world(&source.stem).map(|w| w.spawn)
}
