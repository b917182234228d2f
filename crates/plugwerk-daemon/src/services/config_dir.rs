// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration directory resolution and `config.json` storage.

use std::path::{Path, PathBuf};

use plugwerk_core::ServiceConfig;
use plugwerk_core::error::Result;
use tracing::warn;

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Return the configuration directory, creating it if needed.
pub fn config_dir() -> PathBuf {
    let dir = config_dir_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    );
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// `$XDG_CONFIG_HOME/plugwerk`, else `~/.config/plugwerk`, else
/// `/tmp/plugwerk`.
pub fn config_dir_from(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let base = xdg_config_home
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| home.map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join("plugwerk")
}

/// Read `config.json` from `dir`.  `None` when it is missing or invalid.
pub fn load_config(dir: &Path) -> Option<ServiceConfig> {
    let path = dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Write `config` to `dir/config.json`.
pub fn persist_config(dir: &Path, config: &ServiceConfig) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
