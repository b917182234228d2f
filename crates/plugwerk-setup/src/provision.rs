// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue provisioning: register, enable, auto-configure, then apply defaults
// and repair dependencies from the queue's driver file.
//
// Only registration decides the outcome.  Later steps log their failures
// and carry on.

use tracing::{debug, info, instrument, warn};

use plugwerk_core::error::{PlugwerkError, Result};
use plugwerk_core::types::{DeviceIdentity, ProvisioningResult, QueueName};

use crate::SetupContext;
use crate::call::timed;
use crate::deps::repair_dependencies;
use crate::paper::apply_default_paper_size;

/// Queue attribute listing the maintenance commands a driver understands.
pub const PRINTER_COMMANDS_ATTRIBUTE: &str = "printer-commands";

/// Maintenance command asking the driver to query the device's setup.
pub const AUTO_CONFIGURE_COMMAND: &str = "AutoConfigure";

/// Title of the maintenance job.
pub const AUTO_CONFIGURE_TITLE: &str = "Automatic configuration";

/// Create and configure a queue for the device at `device_uri`.
#[instrument(skip(ctx, identity), fields(queue = %queue_name))]
pub async fn provision(
    ctx: &SetupContext,
    identity: &DeviceIdentity,
    driver_id: &str,
    queue_name: &QueueName,
    device_uri: &str,
) -> ProvisioningResult {
    let name = queue_name.as_str();

    if let Err(e) = register(ctx, name, device_uri, driver_id).await {
        warn!(error = %e, "queue registration failed");
        return ProvisioningResult {
            success: false,
            queue_name: queue_name.clone(),
        };
    }
    info!(driver = driver_id, device_id = %identity.device_id, "queue registered");

    enable(ctx, name).await;
    auto_configure(ctx, name).await;

    match timed(
        "FetchDriverFile",
        ctx.timeouts.query,
        ctx.collaborators.spooler.fetch_driver_file(name),
    )
    .await
    {
        Ok(Some(driver_file)) => {
            apply_default_paper_size(ctx, name, driver_file.path()).await;
            repair_dependencies(ctx, driver_file).await;
        }
        Ok(None) => debug!("queue has no driver file"),
        Err(e) => warn!(error = %e, "cannot fetch driver file"),
    }

    ProvisioningResult {
        success: true,
        queue_name: queue_name.clone(),
    }
}

/// Add the queue, then confirm the spooler actually lists it.
async fn register(ctx: &SetupContext, name: &str, device_uri: &str, driver_id: &str) -> Result<()> {
    timed(
        "PrinterAdd",
        ctx.timeouts.query,
        ctx.collaborators
            .mechanism
            .printer_add(name, device_uri, driver_id, "", ""),
    )
    .await?;

    let queues = timed(
        "QueueNames",
        ctx.timeouts.query,
        ctx.collaborators.spooler.queue_names(),
    )
    .await?;

    if queues.iter().any(|q| q == name) {
        Ok(())
    } else {
        Err(PlugwerkError::RegistrationUnverified(name.to_string()))
    }
}

async fn enable(ctx: &SetupContext, name: &str) {
    if let Err(e) = timed(
        "PrinterSetAcceptJobs",
        ctx.timeouts.query,
        ctx.collaborators
            .mechanism
            .printer_set_accept_jobs(name, true, ""),
    )
    .await
    {
        warn!(error = %e, "cannot make queue accept jobs");
    }

    if let Err(e) = timed(
        "PrinterSetEnabled",
        ctx.timeouts.query,
        ctx.collaborators.mechanism.printer_set_enabled(name, true),
    )
    .await
    {
        warn!(error = %e, "cannot enable queue");
    }
}

/// Whether a `printer-commands` value advertises auto-configuration.
pub fn supports_auto_configure(commands: &str) -> bool {
    commands
        .to_ascii_lowercase()
        .contains(&AUTO_CONFIGURE_COMMAND.to_ascii_lowercase())
}

/// Send the auto-configure maintenance job when the driver supports it.
async fn auto_configure(ctx: &SetupContext, name: &str) {
    let commands = match timed(
        "QueueAttribute",
        ctx.timeouts.query,
        ctx.collaborators
            .spooler
            .queue_attribute(name, PRINTER_COMMANDS_ATTRIBUTE),
    )
    .await
    {
        Ok(Some(commands)) => commands,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "cannot read printer commands");
            return;
        }
    };

    if !supports_auto_configure(&commands) {
        debug!(%commands, "driver has no auto-configuration");
        return;
    }

    match timed(
        "SubmitCommand",
        ctx.timeouts.query,
        ctx.collaborators
            .spooler
            .submit_command(name, AUTO_CONFIGURE_COMMAND, AUTO_CONFIGURE_TITLE),
    )
    .await
    {
        Ok(job_id) => debug!(job_id, "auto-configuration requested"),
        Err(e) => warn!(error = %e, "auto-configuration job failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plugwerk_bridge::testing::{Call, FakeHost};

    use super::*;

    const PPD: &str = r#"*PPD-Adobe: "4.3"
*cupsFilter: "application/vnd.cups-raster 0 rastertoacme"
*OpenUI *PageSize/Media Size: PickOne
*DefaultPageSize: Legal
*PageSize Legal/US Legal: ""
*PageSize Letter/US Letter: ""
*PageSize A4/A4: ""
*CloseUI: *PageSize
"#;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_fields(Some("Acme".into()), Some("Widget".into()), None, None)
    }

    fn queue() -> QueueName {
        QueueName::try_from("Widget").expect("valid")
    }

    #[tokio::test]
    async fn full_provisioning_sequence() {
        let host = Arc::new(FakeHost::new());
        host.set_queue_attribute("Widget", "printer-commands", "Clean,PrintSelfTestPage,AutoConfigure")
            .await;
        host.set_driver_file(PPD).await;
        host.set_missing_executables(&["rastertoacme"]).await;
        host.set_provider("rastertoacme", "acme-filters", false).await;
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://Acme/Widget").await;
        assert!(result.success);
        assert_eq!(result.queue_name, queue());

        let calls = host.calls().await;
        assert_eq!(
            calls[0],
            Call::PrinterAdd {
                name: "Widget".into(),
                device_uri: "usb://Acme/Widget".into(),
                driver_id: "acme.ppd".into(),
                info: String::new(),
                location: String::new(),
            }
        );
        assert!(calls.contains(&Call::PrinterSetAcceptJobs {
            name: "Widget".into(),
            accepting: true,
            reason: String::new(),
        }));
        assert!(calls.contains(&Call::SubmitCommand {
            queue: "Widget".into(),
            command: "AutoConfigure".into(),
            title: "Automatic configuration".into(),
        }));

        let names: Vec<_> = calls.iter().map(Call::name).collect();
        let position = |n: &str| names.iter().position(|c| *c == n).expect(n);
        assert!(position("PrinterSetAcceptJobs") < position("PrinterSetEnabled"));
        assert!(position("PrinterSetEnabled") < position("SubmitCommand"));
        assert!(position("SubmitCommand") < position("FetchDriverFile"));
        assert!(position("FetchDriverFile") < position("MissingExecutables"));
        assert!(names.contains(&"InstallPackageNames"));
    }

    #[tokio::test]
    async fn unverified_registration_stops_everything() {
        let host = Arc::new(FakeHost::new());
        host.drop_registrations().await;
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://Acme/Widget").await;
        assert!(!result.success);
        assert_eq!(host.call_names().await, ["PrinterAdd", "QueueNames"]);
    }

    #[tokio::test]
    async fn add_failure_is_a_failed_provisioning() {
        let host = Arc::new(FakeHost::new());
        host.fail("PrinterAdd").await;
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://x").await;
        assert!(!result.success);
        assert_eq!(host.call_names().await, ["PrinterAdd"]);
    }

    #[tokio::test]
    async fn later_failures_do_not_fail_provisioning() {
        let host = Arc::new(FakeHost::new());
        for method in ["PrinterSetAcceptJobs", "PrinterSetEnabled", "QueueAttribute", "FetchDriverFile"] {
            host.fail(method).await;
        }
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://x").await;
        assert!(result.success);
        assert!(!host.call_names().await.contains(&"SubmitCommand"));
    }

    #[tokio::test]
    async fn no_driver_file_skips_paper_and_repair() {
        let host = Arc::new(FakeHost::new());
        let ctx = SetupContext::new(host.collaborators(), Default::default());

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://x").await;
        assert!(result.success);
        let names = host.call_names().await;
        assert!(!names.contains(&"PrinterAddOptionDefault"));
        assert!(!names.contains(&"MissingExecutables"));
    }

    #[tokio::test]
    async fn letter_locale_sets_page_size_default() {
        let host = Arc::new(FakeHost::new());
        host.set_driver_file(&PPD.replace("*DefaultPageSize: Legal", "*DefaultPageSize: A4"))
            .await;
        let ctx = SetupContext::new(host.collaborators(), Default::default())
            .with_locale("en_US.UTF-8");

        let result = provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://x").await;
        assert!(result.success);
        assert!(host.calls().await.contains(&Call::PrinterAddOptionDefault {
            name: "Widget".into(),
            option: "PageSize-default".into(),
            values: vec!["Letter".into()],
        }));
    }

    #[tokio::test]
    async fn page_size_already_default_is_left_alone() {
        let host = Arc::new(FakeHost::new());
        host.set_driver_file(&PPD.replace("*DefaultPageSize: Legal", "*DefaultPageSize: A4"))
            .await;
        let ctx = SetupContext::new(host.collaborators(), Default::default()).with_locale("de_DE");

        provision(&ctx, &identity(), "acme.ppd", &queue(), "usb://x").await;
        assert!(!host.call_names().await.contains(&"PrinterAddOptionDefault"));
    }

    #[test]
    fn auto_configure_detection_ignores_case() {
        assert!(supports_auto_configure("clean,autoconfigure"));
        assert!(supports_auto_configure("AutoConfigure"));
        assert!(!supports_auto_configure("Clean,PrintSelfTestPage"));
    }
}
