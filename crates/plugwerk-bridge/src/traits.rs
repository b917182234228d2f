// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator interfaces used by the auto-configuration workflow.
//
// Argument lists mirror the remote methods one-to-one.  String arguments are
// always present; callers convert absent values to "" before calling.

use std::path::Path;

use async_trait::async_trait;
use tempfile::TempPath;

use plugwerk_core::error::Result;
use plugwerk_core::human_errors::UserNotice;
use plugwerk_core::types::DriverCandidate;

/// Driver-matching service.
#[async_trait]
pub trait DriverService: Send + Sync {
    /// GetBestDrivers: candidate drivers for a device, in the service's
    /// response order.
    async fn get_best_drivers(
        &self,
        device_id: &str,
        make_and_model: &str,
        device_uri: &str,
    ) -> Result<Vec<DriverCandidate>>;

    /// MissingExecutables: programs referenced by a driver file that are not
    /// installed on this host.
    async fn missing_executables(&self, driver_file: &Path) -> Result<Vec<String>>;
}

/// Answer to a SearchFile query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProvider {
    pub installed: bool,
    pub package: String,
}

/// Package-query service.
#[async_trait]
pub trait PackageQuery: Send + Sync {
    /// SearchFile: which package provides `file`, and whether it is installed.
    async fn search_file(&self, file: &str, filter: &str) -> Result<FileProvider>;
}

/// Package-modify service.
#[async_trait]
pub trait PackageModify: Send + Sync {
    /// InstallPackageNames.
    async fn install_package_names(
        &self,
        flags: u32,
        packages: &[String],
        interaction: &str,
    ) -> Result<()>;

    /// InstallPrinterDrivers, keyed by IEEE 1284 device ids.
    async fn install_printer_drivers(
        &self,
        flags: u32,
        device_ids: &[String],
        interaction: &str,
    ) -> Result<()>;
}

/// Privileged spooler mechanism that mutates queues.
#[async_trait]
pub trait SpoolerMechanism: Send + Sync {
    /// PrinterAdd.
    async fn printer_add(
        &self,
        name: &str,
        device_uri: &str,
        driver_id: &str,
        info: &str,
        location: &str,
    ) -> Result<()>;

    /// PrinterSetEnabled.
    async fn printer_set_enabled(&self, name: &str, enabled: bool) -> Result<()>;

    /// PrinterSetAcceptJobs.
    async fn printer_set_accept_jobs(&self, name: &str, accepting: bool, reason: &str)
    -> Result<()>;

    /// PrinterAddOptionDefault.
    async fn printer_add_option_default(
        &self,
        name: &str,
        option: &str,
        values: &[String],
    ) -> Result<()>;
}

/// Unprivileged spooler client.
#[async_trait]
pub trait Spooler: Send + Sync {
    /// Names of all registered queues.  A snapshot: it may be stale by the
    /// time the caller acts on it.
    async fn queue_names(&self) -> Result<Vec<String>>;

    /// A queue attribute as text, `None` if the queue does not report it.
    async fn queue_attribute(&self, queue: &str, attribute: &str) -> Result<Option<String>>;

    /// Submit a CUPS command job (`#CUPS-COMMAND`) to a queue.  Returns the
    /// job id; an error means the job ended in an error state.
    async fn submit_command(&self, queue: &str, command: &str, title: &str) -> Result<i32>;

    /// Download the queue's driver file to a temporary path.  `None` when
    /// the queue has no driver file.
    async fn fetch_driver_file(&self, queue: &str) -> Result<Option<DriverFile>>;
}

/// Desktop notification display.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notice: &UserNotice) -> Result<()>;
}

/// A temporary local copy of a queue's driver file.  The file is deleted
/// when this value is dropped or [`DriverFile::remove`]d.
#[derive(Debug)]
pub struct DriverFile {
    path: TempPath,
}

impl DriverFile {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting failures instead of swallowing them.
    pub fn remove(self) -> std::io::Result<()> {
        self.path.close()
    }
}
