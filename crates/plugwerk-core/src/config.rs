// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persistent daemon settings, stored as `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URI of the local CUPS scheduler.
    pub cups_uri: String,
    /// Unix socket the inbound transport listens on.
    pub socket_path: PathBuf,
    /// Timeout for query-style collaborator calls, in seconds.
    pub query_timeout_secs: u64,
    /// Timeout for package installation calls, in seconds.
    pub install_timeout_secs: u64,
    /// Upper bound on workflows running at the same time.
    pub max_concurrent_workflows: usize,
    /// How long shutdown waits for in-flight workflows, in seconds.
    pub shutdown_grace_secs: u64,
    /// Show desktop notices for "please wait" and driver failures.
    pub notifications_enabled: bool,
    /// PackageKit console client.
    pub pkcon_path: PathBuf,
    /// Desktop notification helper.
    pub notify_send_path: PathBuf,
    /// Directory holding CUPS filter programs.
    pub cups_filter_dir: PathBuf,
}

impl ServiceConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Socket location under the per-user runtime directory, or the temp
/// directory when there is none.
pub fn socket_path_in(runtime_dir: Option<PathBuf>) -> PathBuf {
    runtime_dir
        .filter(|dir| dir.is_absolute())
        .unwrap_or_else(std::env::temp_dir)
        .join("plugwerk.sock")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cups_uri: "ipp://localhost:631".into(),
            socket_path: socket_path_in(std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from)),
            query_timeout_secs: 60,
            install_timeout_secs: 3600,
            max_concurrent_workflows: 4,
            shutdown_grace_secs: 10,
            notifications_enabled: true,
            pkcon_path: "pkcon".into(),
            notify_send_path: "notify-send".into(),
            cups_filter_dir: "/usr/lib/cups/filter".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"query_timeout_secs": 5}"#).expect("parse");
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.install_timeout(), Duration::from_secs(3600));
        assert_eq!(config.max_concurrent_workflows, 4);
    }

    #[test]
    fn socket_lives_in_the_runtime_dir() {
        assert_eq!(
            socket_path_in(Some("/run/user/1000".into())),
            PathBuf::from("/run/user/1000/plugwerk.sock")
        );
        assert_eq!(
            socket_path_in(Some("relative".into())),
            std::env::temp_dir().join("plugwerk.sock")
        );
        assert_eq!(socket_path_in(None), std::env::temp_dir().join("plugwerk.sock"));
    }
}
