// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PackageKit adapter driven through the `pkcon` console client.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use plugwerk_core::error::Result;
use plugwerk_core::types::device_id_tag;

use crate::process::run_tool;
use crate::traits::{FileProvider, PackageModify, PackageQuery};

/// Package query and install through `pkcon`.
pub struct PkconPackages {
    pkcon: PathBuf,
}

impl PkconPackages {
    pub fn new(pkcon: PathBuf) -> Self {
        Self { pkcon }
    }
}

#[async_trait]
impl PackageQuery for PkconPackages {
    #[instrument(skip(self))]
    async fn search_file(&self, file: &str, filter: &str) -> Result<FileProvider> {
        let mut args = vec!["--plain".to_string()];
        if !filter.is_empty() {
            args.push(format!("--filter={filter}"));
        }
        args.extend(["search".into(), "file".into(), file.into()]);

        let output = run_tool(&self.pkcon, &args, "packagekit", "SearchFile").await?;
        let provider = parse_search_output(&output);
        if provider.package.is_empty() {
            warn!("no package provides file");
        }
        Ok(provider)
    }
}

impl PkconPackages {
    /// One non-interactive `pkcon install` for the whole batch.
    async fn install(&self, packages: &[String], call: &'static str) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut args = vec!["--plain".to_string(), "-y".into(), "install".into()];
        args.extend(packages.iter().cloned());

        info!(count = packages.len(), "installing packages");
        run_tool(&self.pkcon, &args, "packagekit", call)
            .await
            .map(|_| ())
    }
}

// pkcon has no flags or interaction modes; `-y` keeps every install quiet.
#[async_trait]
impl PackageModify for PkconPackages {
    #[instrument(skip(self))]
    async fn install_package_names(
        &self,
        _flags: u32,
        packages: &[String],
        _interaction: &str,
    ) -> Result<()> {
        self.install(packages, "InstallPackageNames").await
    }

    #[instrument(skip(self))]
    async fn install_printer_drivers(
        &self,
        _flags: u32,
        device_ids: &[String],
        _interaction: &str,
    ) -> Result<()> {
        let mut packages = BTreeSet::new();
        for device_id in device_ids {
            let Some(provide) = driver_provide(device_id) else {
                warn!(%device_id, "device id names no make and model");
                continue;
            };
            let args = ["--plain".to_string(), "what-provides".into(), provide.clone()];
            let output = run_tool(&self.pkcon, &args, "packagekit", "InstallPrinterDrivers").await?;

            let provider = parse_search_output(&output);
            if provider.package.is_empty() {
                info!(%provide, "no package provides a driver");
            } else if provider.installed {
                debug!(%provide, package = %provider.package, "driver already installed");
            } else {
                packages.insert(provider.package);
            }
        }

        let packages: Vec<String> = packages.into_iter().collect();
        self.install(&packages, "InstallPrinterDrivers").await
    }
}

/// Package capability that driver packages advertise for a device, e.g.
/// `postscriptdriver(hewlett-packard;laserjet_4200)`.
fn driver_provide(device_id: &str) -> Option<String> {
    let mfg = device_id_tag(device_id, "MFG").or_else(|| device_id_tag(device_id, "MANUFACTURER"))?;
    let mdl = device_id_tag(device_id, "MDL").or_else(|| device_id_tag(device_id, "MODEL"))?;
    let normalize = |value: &str| value.trim().to_lowercase().replace(' ', "_");
    Some(format!("postscriptdriver({};{})", normalize(&mfg), normalize(&mdl)))
}

/// Read the first `Installed`/`Available` row of `pkcon --plain search`.
///
/// Rows look like `Installed   acme-filters-1.2-3.x86_64 (fedora)   Summary`.
fn parse_search_output(output: &str) -> FileProvider {
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let installed = match fields.next() {
            Some("Installed") => true,
            Some("Available") => false,
            _ => continue,
        };
        if let Some(package_id) = fields.next() {
            return FileProvider {
                installed,
                package: package_name(package_id).to_string(),
            };
        }
    }
    FileProvider {
        installed: false,
        package: String::new(),
    }
}

/// Strip the version and architecture from a `name-version.arch` id.
fn package_name(package_id: &str) -> &str {
    let mut end = package_id.len();
    let mut offset = 0;
    for segment in package_id.split('-') {
        if offset > 0 && segment.starts_with(|c: char| c.is_ascii_digit()) {
            end = offset - 1;
            break;
        }
        offset += segment.len() + 1;
    }
    &package_id[..end]
}
