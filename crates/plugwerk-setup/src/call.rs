// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-call deadline for every collaborator request.
//
// Queries get the short deadline, package installs the long one.  An expired
// deadline surfaces as `PlugwerkError::Timeout` and is handled like any other
// remote failure.  Nothing is retried.

use std::future::Future;
use std::time::Duration;

use plugwerk_core::ServiceConfig;
use plugwerk_core::error::{PlugwerkError, Result};
use tracing::warn;

/// Deadlines applied to collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Lookups and spooler mutations.
    pub query: Duration,
    /// Package and driver installation.
    pub install: Duration,
}

impl Timeouts {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            query: config.query_timeout(),
            install: config.install_timeout(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Await `future` for at most `limit`.
pub async fn timed<T, F>(call: &'static str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(call, secs = limit.as_secs(), "collaborator call timed out");
            Err(PlugwerkError::Timeout { call, after: limit })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_results() {
        let ok = timed("Fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.expect("ok"), 7);

        let err: Result<()> = timed("Failing", Duration::from_secs(1), async {
            Err(PlugwerkError::NoDriver)
        })
        .await;
        assert!(matches!(err, Err(PlugwerkError::NoDriver)));
    }

    #[tokio::test]
    async fn expiry_maps_to_timeout() {
        let err = timed("Slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        match err {
            PlugwerkError::Timeout { call, after } => {
                assert_eq!(call, "Slow");
                assert_eq!(after, Duration::from_millis(10));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn defaults_follow_config() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.query, Duration::from_secs(60));
        assert_eq!(timeouts.install, Duration::from_secs(3600));
    }
}
