// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugwerk Bridge — interfaces to the services the workflow orchestrates,
// plus the adapters that reach them on a CUPS host.

pub mod cups;
pub mod desktop;
pub mod packagekit;
mod process;
pub mod stub;
pub mod testing;
pub mod traits;

use std::sync::Arc;

use plugwerk_core::ServiceConfig;

use crate::traits::{DriverService, Notifier, PackageModify, PackageQuery, Spooler, SpoolerMechanism};

/// Every collaborator the workflow talks to, behind trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub drivers: Arc<dyn DriverService>,
    pub package_query: Arc<dyn PackageQuery>,
    pub package_modify: Arc<dyn PackageModify>,
    pub mechanism: Arc<dyn SpoolerMechanism>,
    pub spooler: Arc<dyn Spooler>,
    pub notifier: Arc<dyn Notifier>,
}

/// Build the adapters for the local host.
///
/// CUPS serves as spooler, mechanism and driver matcher; PackageKit is
/// reached through `pkcon`; notices go through `notify-send` unless
/// disabled.
pub fn host_collaborators(config: &ServiceConfig) -> plugwerk_core::error::Result<Collaborators> {
    let cups = Arc::new(cups::CupsClient::new(&config.cups_uri)?);
    let drivers = Arc::new(cups::CupsDriverService::new(
        &config.cups_uri,
        config.cups_filter_dir.clone(),
    )?);
    let packages = Arc::new(packagekit::PkconPackages::new(config.pkcon_path.clone()));

    let notifier: Arc<dyn Notifier> = if config.notifications_enabled {
        Arc::new(desktop::NotifySend::new(config.notify_send_path.clone()))
    } else {
        Arc::new(stub::DisabledNotifier)
    };

    Ok(Collaborators {
        drivers,
        package_query: packages.clone(),
        package_modify: packages,
        mechanism: cups.clone(),
        spooler: cups,
        notifier,
    })
}
