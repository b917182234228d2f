// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver selection: ask the matcher for candidates and take the best tier.

use tracing::{info, instrument, warn};

use plugwerk_core::types::{DeviceIdentity, DriverCandidate, MatchTier};

use crate::SetupContext;
use crate::call::timed;

/// First candidate of the best non-empty tier.  Within a tier the
/// matcher's response order decides.
pub fn best_candidate(candidates: &[DriverCandidate]) -> Option<&DriverCandidate> {
    MatchTier::ALL
        .iter()
        .find_map(|tier| candidates.iter().find(|c| c.tier == *tier))
}

/// Pick a driver for the device at `device_uri`.
///
/// Lookup failures and empty answers both yield `None`.
#[instrument(skip(ctx, identity))]
pub async fn resolve_best_driver(
    ctx: &SetupContext,
    identity: &DeviceIdentity,
    device_uri: &str,
) -> Option<String> {
    let make_and_model = identity.make_and_model().unwrap_or_default();

    let candidates = match timed(
        "GetBestDrivers",
        ctx.timeouts.query,
        ctx.collaborators
            .drivers
            .get_best_drivers(&identity.device_id, &make_and_model, device_uri),
    )
    .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "driver lookup failed");
            return None;
        }
    };

    match best_candidate(&candidates) {
        Some(best) => {
            info!(driver = %best.driver_id, tier = best.tier.keyword(), "driver selected");
            Some(best.driver_id.clone())
        }
        None => {
            warn!(device_id = %identity.device_id, "no driver candidates");
            None
        }
    }
}
