// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory host for exercising the workflow without CUPS or PackageKit.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use plugwerk_core::error::{PlugwerkError, Result};
use plugwerk_core::human_errors::UserNotice;
use plugwerk_core::types::DriverCandidate;

use crate::Collaborators;
use crate::traits::*;

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetBestDrivers {
        device_id: String,
        make_and_model: String,
        device_uri: String,
    },
    MissingExecutables,
    SearchFile {
        file: String,
        filter: String,
    },
    InstallPackageNames {
        flags: u32,
        packages: Vec<String>,
        interaction: String,
    },
    InstallPrinterDrivers {
        flags: u32,
        device_ids: Vec<String>,
        interaction: String,
    },
    PrinterAdd {
        name: String,
        device_uri: String,
        driver_id: String,
        info: String,
        location: String,
    },
    PrinterSetEnabled {
        name: String,
        enabled: bool,
    },
    PrinterSetAcceptJobs {
        name: String,
        accepting: bool,
        reason: String,
    },
    PrinterAddOptionDefault {
        name: String,
        option: String,
        values: Vec<String>,
    },
    QueueNames,
    QueueAttribute {
        queue: String,
        attribute: String,
    },
    SubmitCommand {
        queue: String,
        command: String,
        title: String,
    },
    FetchDriverFile {
        queue: String,
    },
    Notice(UserNotice),
}

impl Call {
    /// Remote method name, used to inject failures and delays.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetBestDrivers { .. } => "GetBestDrivers",
            Self::MissingExecutables => "MissingExecutables",
            Self::SearchFile { .. } => "SearchFile",
            Self::InstallPackageNames { .. } => "InstallPackageNames",
            Self::InstallPrinterDrivers { .. } => "InstallPrinterDrivers",
            Self::PrinterAdd { .. } => "PrinterAdd",
            Self::PrinterSetEnabled { .. } => "PrinterSetEnabled",
            Self::PrinterSetAcceptJobs { .. } => "PrinterSetAcceptJobs",
            Self::PrinterAddOptionDefault { .. } => "PrinterAddOptionDefault",
            Self::QueueNames => "QueueNames",
            Self::QueueAttribute { .. } => "QueueAttribute",
            Self::SubmitCommand { .. } => "SubmitCommand",
            Self::FetchDriverFile { .. } => "FetchDriverFile",
            Self::Notice(_) => "Notify",
        }
    }
}

#[derive(Default)]
struct HostState {
    calls: Vec<Call>,
    queues: Vec<String>,
    candidates: Vec<DriverCandidate>,
    missing: Vec<String>,
    providers: HashMap<String, FileProvider>,
    attributes: HashMap<(String, String), String>,
    driver_file: Option<String>,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    silent_add_failure: bool,
}

/// Fake host implementing every collaborator trait.
///
/// Records each call in order.  Queues added through `printer_add` appear in
/// `queue_names` unless [`FakeHost::drop_registrations`] is set.
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(FakeHost::new());
/// host.set_candidates(vec![DriverCandidate::new("acme.ppd", MatchTier::Exact)]).await;
/// let collaborators = host.collaborators();
/// // ... run the workflow ...
/// assert!(host.calls().await.iter().any(|c| c.name() == "PrinterAdd"));
/// ```
#[derive(Default)]
pub struct FakeHost {
    state: RwLock<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this host as the full collaborator set.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            drivers: self.clone(),
            package_query: self.clone(),
            package_modify: self.clone(),
            mechanism: self.clone(),
            spooler: self.clone(),
            notifier: self.clone(),
        }
    }

    /// All calls so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.state.read().await.calls.clone()
    }

    /// Names of the calls so far, in order.
    pub async fn call_names(&self) -> Vec<&'static str> {
        self.state.read().await.calls.iter().map(Call::name).collect()
    }

    /// Notices shown so far.
    pub async fn notices(&self) -> Vec<UserNotice> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn set_queues(&self, queues: &[&str]) {
        self.state.write().await.queues = queues.iter().map(|q| q.to_string()).collect();
    }

    pub async fn queues(&self) -> Vec<String> {
        self.state.read().await.queues.clone()
    }

    pub async fn set_candidates(&self, candidates: Vec<DriverCandidate>) {
        self.state.write().await.candidates = candidates;
    }

    pub async fn set_missing_executables(&self, missing: &[&str]) {
        self.state.write().await.missing = missing.iter().map(|m| m.to_string()).collect();
    }

    pub async fn set_provider(&self, file: &str, package: &str, installed: bool) {
        self.state.write().await.providers.insert(
            file.to_string(),
            FileProvider {
                installed,
                package: package.to_string(),
            },
        );
    }

    pub async fn set_queue_attribute(&self, queue: &str, attribute: &str, value: &str) {
        self.state
            .write()
            .await
            .attributes
            .insert((queue.to_string(), attribute.to_string()), value.to_string());
    }

    /// Text served by `fetch_driver_file`; without it the queue has no file.
    pub async fn set_driver_file(&self, text: &str) {
        self.state.write().await.driver_file = Some(text.to_string());
    }

    /// Make every call to `method` fail.
    pub async fn fail(&self, method: &'static str) {
        self.state.write().await.failing.insert(method);
    }

    /// Make every call to `method` sleep before answering.
    pub async fn delay(&self, method: &'static str, by: Duration) {
        self.state.write().await.delays.insert(method, by);
    }

    /// `printer_add` reports success without registering the queue.
    pub async fn drop_registrations(&self) {
        self.state.write().await.silent_add_failure = true;
    }

    /// Record `call`, apply any injected delay, then any injected failure.
    async fn enter(&self, call: Call) -> Result<()> {
        let name = call.name();
        let (delay, failing) = {
            let mut state = self.state.write().await;
            state.calls.push(call);
            (state.delays.get(name).copied(), state.failing.contains(name))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(PlugwerkError::Remote {
                call: name,
                detail: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DriverService for FakeHost {
    async fn get_best_drivers(
        &self,
        device_id: &str,
        make_and_model: &str,
        device_uri: &str,
    ) -> Result<Vec<DriverCandidate>> {
        self.enter(Call::GetBestDrivers {
            device_id: device_id.into(),
            make_and_model: make_and_model.into(),
            device_uri: device_uri.into(),
        })
        .await?;
        Ok(self.state.read().await.candidates.clone())
    }

    async fn missing_executables(&self, driver_file: &Path) -> Result<Vec<String>> {
        self.enter(Call::MissingExecutables).await?;
        if !driver_file.exists() {
            return Err(PlugwerkError::Remote {
                call: "MissingExecutables",
                detail: format!("{} does not exist", driver_file.display()),
            });
        }
        Ok(self.state.read().await.missing.clone())
    }
}

#[async_trait]
impl PackageQuery for FakeHost {
    async fn search_file(&self, file: &str, filter: &str) -> Result<FileProvider> {
        self.enter(Call::SearchFile {
            file: file.into(),
            filter: filter.into(),
        })
        .await?;
        Ok(self
            .state
            .read()
            .await
            .providers
            .get(file)
            .cloned()
            .unwrap_or(FileProvider {
                installed: false,
                package: String::new(),
            }))
    }
}

#[async_trait]
impl PackageModify for FakeHost {
    async fn install_package_names(
        &self,
        flags: u32,
        packages: &[String],
        interaction: &str,
    ) -> Result<()> {
        self.enter(Call::InstallPackageNames {
            flags,
            packages: packages.to_vec(),
            interaction: interaction.into(),
        })
        .await
    }

    async fn install_printer_drivers(
        &self,
        flags: u32,
        device_ids: &[String],
        interaction: &str,
    ) -> Result<()> {
        self.enter(Call::InstallPrinterDrivers {
            flags,
            device_ids: device_ids.to_vec(),
            interaction: interaction.into(),
        })
        .await
    }
}

#[async_trait]
impl SpoolerMechanism for FakeHost {
    async fn printer_add(
        &self,
        name: &str,
        device_uri: &str,
        driver_id: &str,
        info: &str,
        location: &str,
    ) -> Result<()> {
        self.enter(Call::PrinterAdd {
            name: name.into(),
            device_uri: device_uri.into(),
            driver_id: driver_id.into(),
            info: info.into(),
            location: location.into(),
        })
        .await?;
        let mut state = self.state.write().await;
        if !state.silent_add_failure && !state.queues.iter().any(|q| q == name) {
            state.queues.push(name.to_string());
        }
        Ok(())
    }

    async fn printer_set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.enter(Call::PrinterSetEnabled {
            name: name.into(),
            enabled,
        })
        .await
    }

    async fn printer_set_accept_jobs(&self, name: &str, accepting: bool, reason: &str) -> Result<()> {
        self.enter(Call::PrinterSetAcceptJobs {
            name: name.into(),
            accepting,
            reason: reason.into(),
        })
        .await
    }

    async fn printer_add_option_default(
        &self,
        name: &str,
        option: &str,
        values: &[String],
    ) -> Result<()> {
        self.enter(Call::PrinterAddOptionDefault {
            name: name.into(),
            option: option.into(),
            values: values.to_vec(),
        })
        .await
    }
}

#[async_trait]
impl Spooler for FakeHost {
    async fn queue_names(&self) -> Result<Vec<String>> {
        self.enter(Call::QueueNames).await?;
        Ok(self.state.read().await.queues.clone())
    }

    async fn queue_attribute(&self, queue: &str, attribute: &str) -> Result<Option<String>> {
        self.enter(Call::QueueAttribute {
            queue: queue.into(),
            attribute: attribute.into(),
        })
        .await?;
        Ok(self
            .state
            .read()
            .await
            .attributes
            .get(&(queue.to_string(), attribute.to_string()))
            .cloned())
    }

    async fn submit_command(&self, queue: &str, command: &str, title: &str) -> Result<i32> {
        self.enter(Call::SubmitCommand {
            queue: queue.into(),
            command: command.into(),
            title: title.into(),
        })
        .await?;
        Ok(1)
    }

    async fn fetch_driver_file(&self, queue: &str) -> Result<Option<DriverFile>> {
        self.enter(Call::FetchDriverFile {
            queue: queue.into(),
        })
        .await?;
        let Some(text) = self.state.read().await.driver_file.clone() else {
            return Ok(None);
        };
        let mut file = tempfile::Builder::new()
            .prefix("plugwerk-fake-")
            .suffix(".ppd")
            .tempfile()?;
        file.write_all(text.as_bytes())?;
        Ok(Some(DriverFile::new(file.into_temp_path())))
    }
}

#[async_trait]
impl Notifier for FakeHost {
    async fn show(&self, notice: &UserNotice) -> Result<()> {
        self.enter(Call::Notice(notice.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwerk_core::types::MatchTier;

    #[tokio::test]
    async fn added_queues_become_visible() {
        let host = FakeHost::new();
        host.printer_add("Acme", "usb://Acme", "acme.ppd", "", "").await.expect("add");
        assert_eq!(host.queue_names().await.expect("list"), ["Acme"]);
    }

    #[tokio::test]
    async fn dropped_registrations_stay_invisible() {
        let host = FakeHost::new();
        host.drop_registrations().await;
        host.printer_add("Acme", "usb://Acme", "acme.ppd", "", "").await.expect("add");
        assert!(host.queue_names().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_recorded_and_returned() {
        let host = Arc::new(FakeHost::new());
        host.set_candidates(vec![DriverCandidate::new("acme.ppd", MatchTier::Exact)]).await;
        host.fail("GetBestDrivers").await;

        let collaborators = host.collaborators();
        let err = collaborators.drivers.get_best_drivers("MFG:a;", "", "").await.unwrap_err();
        assert!(matches!(err, PlugwerkError::Remote { call: "GetBestDrivers", .. }));
        assert_eq!(host.call_names().await, ["GetBestDrivers"]);
    }

    #[tokio::test]
    async fn driver_file_is_a_real_temporary_file() {
        let host = FakeHost::new();
        assert!(host.fetch_driver_file("Acme").await.expect("fetch").is_none());

        host.set_driver_file("*PPD-Adobe: \"4.3\"\n").await;
        let file = host.fetch_driver_file("Acme").await.expect("fetch").expect("file");
        let path = file.path().to_path_buf();
        assert!(path.exists());
        file.remove().expect("remove");
        assert!(!path.exists());
    }
}
