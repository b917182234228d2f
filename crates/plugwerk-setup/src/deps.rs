// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver dependency repair.
//
// Best-effort throughout: every failure is logged and the repair carries on
// with what it has.  The driver file is always deleted on return.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use plugwerk_bridge::traits::DriverFile;

use crate::SetupContext;
use crate::call::timed;

/// Interaction hint passed to every install request.
pub const INSTALL_INTERACTION: &str = "hide-finished";

/// What a repair found and did.  Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Executables the driver needs that are not installed.
    pub missing: BTreeSet<String>,
    /// Packages providing them that are not yet installed.
    pub packages: BTreeSet<String>,
    /// Whether an install request was sent and succeeded.
    pub installed: bool,
    /// Whether the driver file was deleted cleanly.
    pub file_removed: bool,
}

/// Install packages for executables `driver_file` needs but the host lacks.
#[instrument(skip(ctx, driver_file), fields(path = %driver_file.path().display()))]
pub async fn repair_dependencies(ctx: &SetupContext, driver_file: DriverFile) -> RepairReport {
    let mut report = repair(ctx, driver_file.path()).await;

    match driver_file.remove() {
        Ok(()) => report.file_removed = true,
        Err(e) => warn!(error = %e, "cannot remove driver file"),
    }
    report
}

async fn repair(ctx: &SetupContext, path: &Path) -> RepairReport {
    let mut report = RepairReport::default();

    let missing = match timed(
        "MissingExecutables",
        ctx.timeouts.query,
        ctx.collaborators.drivers.missing_executables(path),
    )
    .await
    {
        Ok(missing) => missing,
        Err(e) => {
            warn!(error = %e, "cannot list missing executables");
            return report;
        }
    };
    report.missing = missing.into_iter().collect();

    if report.missing.is_empty() {
        debug!("driver has everything it needs");
        return report;
    }

    for executable in &report.missing {
        match timed(
            "SearchFile",
            ctx.timeouts.query,
            ctx.collaborators.package_query.search_file(executable, ""),
        )
        .await
        {
            Ok(provider) if provider.installed || provider.package.is_empty() => {
                debug!(executable, package = %provider.package, "nothing to install");
            }
            Ok(provider) => {
                debug!(executable, package = %provider.package, "provider found");
                report.packages.insert(provider.package);
            }
            Err(e) => warn!(executable, error = %e, "package search failed"),
        }
    }

    if report.packages.is_empty() {
        return report;
    }

    let packages: Vec<String> = report.packages.iter().cloned().collect();
    info!(?packages, "installing driver dependencies");
    match timed(
        "InstallPackageNames",
        ctx.timeouts.install,
        ctx.collaborators
            .package_modify
            .install_package_names(0, &packages, INSTALL_INTERACTION),
    )
    .await
    {
        Ok(()) => report.installed = true,
        Err(e) => warn!(error = %e, "dependency install failed"),
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use plugwerk_bridge::testing::{Call, FakeHost};

    use super::*;
    use crate::call::Timeouts;

    fn driver_file() -> DriverFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        DriverFile::new(file.into_temp_path())
    }

    fn context(host: &Arc<FakeHost>) -> SetupContext {
        SetupContext::new(host.collaborators(), Timeouts::default())
    }

    #[tokio::test]
    async fn installs_uninstalled_providers_in_one_batch() {
        let host = Arc::new(FakeHost::new());
        host.set_missing_executables(&["rastertoacme", "acmeps", "helper"]).await;
        host.set_provider("rastertoacme", "acme-filters", false).await;
        host.set_provider("acmeps", "acme-filters", false).await;
        host.set_provider("helper", "helper-tools", true).await;

        let file = driver_file();
        let path = file.path().to_path_buf();
        let report = repair_dependencies(&context(&host), file).await;

        assert!(report.installed);
        assert!(report.file_removed);
        assert!(!path.exists());
        assert_eq!(report.packages.into_iter().collect::<Vec<_>>(), ["acme-filters"]);

        let installs: Vec<_> = host
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, Call::InstallPackageNames { .. }))
            .collect();
        assert_eq!(
            installs,
            [Call::InstallPackageNames {
                flags: 0,
                packages: vec!["acme-filters".into()],
                interaction: "hide-finished".into(),
            }]
        );
    }

    #[tokio::test]
    async fn searches_use_an_empty_filter() {
        let host = Arc::new(FakeHost::new());
        host.set_missing_executables(&["rastertoacme"]).await;
        repair_dependencies(&context(&host), driver_file()).await;

        assert!(host.calls().await.contains(&Call::SearchFile {
            file: "rastertoacme".into(),
            filter: String::new(),
        }));
    }

    #[tokio::test]
    async fn nothing_missing_means_no_search_or_install() {
        let host = Arc::new(FakeHost::new());
        let report = repair_dependencies(&context(&host), driver_file()).await;

        assert_eq!(host.call_names().await, ["MissingExecutables"]);
        assert!(report.file_removed);
        assert!(!report.installed);
    }

    #[tokio::test]
    async fn failures_never_abort_and_file_is_removed() {
        for failing in ["MissingExecutables", "SearchFile", "InstallPackageNames"] {
            let host = Arc::new(FakeHost::new());
            host.set_missing_executables(&["a", "b"]).await;
            host.set_provider("a", "pkg-a", false).await;
            host.set_provider("b", "pkg-b", false).await;
            host.fail(failing).await;

            let file = driver_file();
            let path = file.path().to_path_buf();
            let report = repair_dependencies(&context(&host), file).await;

            assert!(!report.installed, "{failing}");
            assert!(!path.exists(), "{failing}");
        }
    }

    #[tokio::test]
    async fn every_collaborator_failing_still_removes_the_file() {
        let host = Arc::new(FakeHost::new());
        host.set_missing_executables(&["a"]).await;
        host.set_provider("a", "pkg-a", false).await;
        for method in ["MissingExecutables", "SearchFile", "InstallPackageNames"] {
            host.fail(method).await;
        }

        let file = driver_file();
        let path = file.path().to_path_buf();
        let report = repair_dependencies(&context(&host), file).await;

        assert!(report.missing.is_empty());
        assert!(!report.installed);
        assert!(report.file_removed);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn install_uses_the_long_deadline() {
        let host = Arc::new(FakeHost::new());
        host.set_missing_executables(&["a"]).await;
        host.set_provider("a", "pkg-a", false).await;
        host.delay("InstallPackageNames", Duration::from_millis(50)).await;

        let timeouts = Timeouts {
            query: Duration::from_millis(20),
            install: Duration::from_secs(5),
        };
        let ctx = SetupContext::new(host.collaborators(), timeouts);
        let report = repair_dependencies(&ctx, driver_file()).await;
        assert!(report.installed);
    }
}
