// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue name allocation.
//
// The base name is the device's model tag, sanitised.  Taken names are
// probed with `-2`, `-3`, … suffixes against one snapshot of the spooler's
// queue list.  The result is advisory: a queue created by someone else in
// the meantime is caught by registration verification, not here.

use tracing::{debug, instrument, warn};

use plugwerk_core::error::{PlugwerkError, Result};
use plugwerk_core::types::{DeviceIdentity, QueueName};

use crate::SetupContext;
use crate::call::timed;

/// Sanitised model tag of `identity`, `mdl` first, then `model`.
pub fn base_name(identity: &DeviceIdentity) -> Result<QueueName> {
    let model = identity
        .tag("mdl")
        .or_else(|| identity.tag("model"))
        .ok_or(PlugwerkError::NoQueueName)?;
    QueueName::sanitize(&model).ok_or(PlugwerkError::NoQueueName)
}

/// `base` if free in `taken`, otherwise the first free `base-N`, N ≥ 2.
///
/// The spooler treats queue names case-insensitively, so does this.
pub fn pick_free_name(base: &QueueName, taken: &[String]) -> QueueName {
    let is_taken = |name: &QueueName| taken.iter().any(|t| t.eq_ignore_ascii_case(name.as_str()));

    if !is_taken(base) {
        return base.clone();
    }
    let mut index = 2;
    loop {
        let candidate = base.with_suffix(index);
        if !is_taken(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Allocate a queue name for `identity`.
///
/// Fails with `NoQueueName` when the device reports no model.  A failed
/// queue listing is treated as an empty snapshot.
#[instrument(skip(ctx, identity), fields(device_id = %identity.device_id))]
pub async fn allocate_name(ctx: &SetupContext, identity: &DeviceIdentity) -> Result<QueueName> {
    let base = base_name(identity)?;

    let taken = match timed(
        "QueueNames",
        ctx.timeouts.query,
        ctx.collaborators.spooler.queue_names(),
    )
    .await
    {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "cannot list queues; assuming none");
            Vec::new()
        }
    };

    let name = pick_free_name(&base, &taken);
    debug!(%base, %name, taken = taken.len(), "queue name allocated");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plugwerk_bridge::testing::FakeHost;

    use super::*;

    fn taken(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn base(name: &str) -> QueueName {
        QueueName::try_from(name).expect("valid")
    }

    #[test]
    fn free_base_is_used_as_is() {
        assert_eq!(pick_free_name(&base("Widget"), &taken(&["Other"])).as_str(), "Widget");
    }

    #[test]
    fn taken_names_get_the_next_free_suffix() {
        let names = taken(&["Widget", "Widget-2"]);
        assert_eq!(pick_free_name(&base("Widget"), &names).as_str(), "Widget-3");

        // Gaps are filled first.
        let names = taken(&["Widget", "Widget-3"]);
        assert_eq!(pick_free_name(&base("Widget"), &names).as_str(), "Widget-2");
    }

    #[test]
    fn comparison_ignores_case() {
        let names = taken(&["widget"]);
        assert_eq!(pick_free_name(&base("Widget"), &names).as_str(), "Widget-2");
    }

    #[test]
    fn allocation_is_deterministic_and_free() {
        let names = taken(&["Widget", "Widget-2", "Widget-4"]);
        let first = pick_free_name(&base("Widget"), &names);
        let second = pick_free_name(&base("Widget"), &names);
        assert_eq!(first, second);
        assert!(!names.contains(&first.to_string()));
    }

    #[test]
    fn base_name_prefers_mdl_and_sanitises() {
        let identity = DeviceIdentity::from_device_id("MFG:Acme;MODEL:Long Name;MDL:Widget 3000+;");
        assert_eq!(base_name(&identity).expect("name").as_str(), "Widget-3000-");

        let identity = DeviceIdentity::from_device_id("MFG:Acme;MODEL:Long Name;");
        assert_eq!(base_name(&identity).expect("name").as_str(), "Long-Name");
    }

    #[test]
    fn missing_model_is_an_error() {
        let identity = DeviceIdentity::from_fields(Some("Acme".into()), None, None, None);
        assert!(matches!(base_name(&identity), Err(PlugwerkError::NoQueueName)));
    }

    #[tokio::test]
    async fn allocates_against_registered_queues() {
        let host = Arc::new(FakeHost::new());
        host.set_queues(&["Widget", "Widget-2"]).await;
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let identity =
            DeviceIdentity::from_fields(Some("Acme".into()), Some("Widget".into()), None, None);
        let name = allocate_name(&ctx, &identity).await.expect("name");
        assert_eq!(name.as_str(), "Widget-3");
    }

    #[tokio::test]
    async fn no_model_fails_before_listing_queues() {
        let host = Arc::new(FakeHost::new());
        let ctx = SetupContext::new(host.collaborators(), Default::default());
        let identity = DeviceIdentity::from_fields(Some("Acme".into()), None, None, None);

        assert!(allocate_name(&ctx, &identity).await.is_err());
        assert!(host.calls().await.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_falls_back_to_base() {
        let host = Arc::new(FakeHost::new());
        host.set_queues(&["Widget"]).await;
        host.fail("QueueNames").await;
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let identity =
            DeviceIdentity::from_fields(Some("Acme".into()), Some("Widget".into()), None, None);
        assert_eq!(allocate_name(&ctx, &identity).await.expect("name").as_str(), "Widget");
    }
}
