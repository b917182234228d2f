// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound event handling.
//
// Every event is acknowledged as soon as it is accepted; its workflow then
// runs on its own task, with a semaphore bounding how many run at once.
// Events share no state beyond the collaborators, so workflows for
// different printers proceed independently.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use plugwerk_bridge::Collaborators;
use plugwerk_core::ServiceConfig;
use plugwerk_core::error::{PlugwerkError, Result};
use plugwerk_core::human_errors::{UserNotice, configuring_notice, missing_driver_notice};
use plugwerk_core::types::{
    DeviceIdentity, EventId, InboundEvent, QueueName, ReceivedEvent, non_empty,
};

use crate::SetupContext;
use crate::call::{Timeouts, timed};
use crate::deps::{INSTALL_INTERACTION, repair_dependencies};
use crate::naming::allocate_name;
use crate::provision::provision;
use crate::resolver::resolve_best_driver;

/// Lifecycle of a [`PlugwerkService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Stopped,
    Running,
    Draining,
}

impl ServiceStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// The auto-configuration service: owns the collaborators and the pool of
/// running workflows.
pub struct PlugwerkService {
    ctx: Arc<SetupContext>,
    permits: Arc<Semaphore>,
    workflows: Mutex<JoinSet<()>>,
    status: AtomicU8,
    grace: Duration,
}

impl PlugwerkService {
    /// Create a stopped service.  Call [`start`](Self::start) before handing
    /// it events.
    pub fn new(collaborators: Collaborators, config: &ServiceConfig) -> Self {
        Self {
            ctx: Arc::new(SetupContext::new(
                collaborators,
                Timeouts::from_config(config),
            )),
            permits: Arc::new(Semaphore::new(config.max_concurrent_workflows.max(1))),
            workflows: Mutex::new(JoinSet::new()),
            status: AtomicU8::new(ServiceStatus::Stopped as u8),
            grace: config.shutdown_grace(),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Begin accepting events.
    pub fn start(&self) {
        self.status
            .store(ServiceStatus::Running as u8, Ordering::Release);
        info!("auto-configuration service started");
    }

    /// Accept `event` and schedule its workflow.
    ///
    /// Returning `Ok` is the acknowledgement; it never waits for the
    /// workflow itself.
    pub async fn handle(&self, event: InboundEvent) -> Result<EventId> {
        // Checked under the lock so shutdown cannot take the set between the
        // check and the spawn.
        let mut workflows = self.workflows.lock().await;
        if self.status() != ServiceStatus::Running {
            return Err(PlugwerkError::NotRunning);
        }

        let received = ReceivedEvent::new(event);
        let id = received.id;
        let span = info_span!("event", %id, method = received.event.method());
        debug!(parent: &span, at = %received.received_at, "event accepted");

        let ctx = Arc::clone(&self.ctx);
        let permits = Arc::clone(&self.permits);

        while workflows.try_join_next().is_some() {}
        workflows.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                dispatch(&ctx, received.event).await;
            }
            .instrument(span),
        );
        Ok(id)
    }

    /// Number of workflows not yet finished.
    pub async fn in_flight(&self) -> usize {
        let mut workflows = self.workflows.lock().await;
        while workflows.try_join_next().is_some() {}
        workflows.len()
    }

    /// Wait until every accepted workflow has finished.
    pub async fn wait_idle(&self) {
        let mut running = std::mem::take(&mut *self.workflows.lock().await);
        while running.join_next().await.is_some() {}
    }

    /// Stop accepting events, let running workflows finish within the grace
    /// period, then abort the rest.
    pub async fn shutdown(&self) {
        self.status
            .store(ServiceStatus::Draining as u8, Ordering::Release);

        let mut running = std::mem::take(&mut *self.workflows.lock().await);
        let pending = running.len();
        info!(pending, grace_secs = self.grace.as_secs(), "draining workflows");

        let drained = tokio::time::timeout(self.grace, async {
            while running.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(remaining = running.len(), "grace period over; aborting workflows");
            running.shutdown().await;
        }

        self.permits.close();
        self.status
            .store(ServiceStatus::Stopped as u8, Ordering::Release);
        info!("auto-configuration service stopped");
    }
}

/// Run the workflow for one event to completion.
pub async fn dispatch(ctx: &SetupContext, event: InboundEvent) {
    match event {
        InboundEvent::GetReady => notify(ctx, &configuring_notice()).await,
        InboundEvent::NewPrinter {
            status,
            name,
            mfg,
            mdl,
            description,
            command,
        } => {
            debug!(status, "new printer reported");
            let identity = DeviceIdentity::from_fields(mfg, mdl, description, command);
            if name.contains('/') {
                configure_device(ctx, &identity, &name).await;
            } else {
                repair_queue(ctx, &name).await;
            }
        }
        InboundEvent::InstallDrivers { mfg, mdl, command } => {
            install_drivers(ctx, non_empty(mfg), non_empty(mdl), non_empty(command)).await
        }
    }
}

/// A bare device: pick a driver and name, provision, tell the user on
/// failure.
#[instrument(skip(ctx, identity))]
async fn configure_device(ctx: &SetupContext, identity: &DeviceIdentity, device_uri: &str) {
    match try_configure(ctx, identity, device_uri).await {
        Ok(queue) => info!(%queue, "printer configured"),
        Err(e) => {
            warn!(error = %e, "automatic configuration failed");
            notify(ctx, &missing_driver_notice(identity)).await;
        }
    }
}

async fn try_configure(
    ctx: &SetupContext,
    identity: &DeviceIdentity,
    device_uri: &str,
) -> Result<QueueName> {
    let driver = resolve_best_driver(ctx, identity, device_uri)
        .await
        .ok_or(PlugwerkError::NoDriver)?;
    let queue = allocate_name(ctx, identity).await?;
    let result = provision(ctx, identity, &driver, &queue, device_uri).await;
    if result.success {
        Ok(result.queue_name)
    } else {
        Err(PlugwerkError::RegistrationUnverified(result.queue_name.to_string()))
    }
}

/// An existing queue: only make sure its driver's programs are installed.
#[instrument(skip(ctx))]
async fn repair_queue(ctx: &SetupContext, queue: &str) {
    match timed(
        "FetchDriverFile",
        ctx.timeouts.query,
        ctx.collaborators.spooler.fetch_driver_file(queue),
    )
    .await
    {
        Ok(Some(driver_file)) => {
            let report = repair_dependencies(ctx, driver_file).await;
            debug!(?report, "queue repaired");
        }
        Ok(None) => debug!("queue has no driver file"),
        Err(e) => warn!(error = %e, "cannot fetch driver file"),
    }
}

/// Ask the package service for drivers matching make and model.
#[instrument(skip(ctx))]
async fn install_drivers(
    ctx: &SetupContext,
    mfg: Option<String>,
    mdl: Option<String>,
    command: Option<String>,
) {
    let (Some(mfg), Some(mdl)) = (mfg, mdl) else {
        debug!("incomplete device identity; nothing to install");
        return;
    };

    let device_id = format!("MFG:{mfg};MDL:{mdl};");
    info!(%device_id, ?command, "requesting driver installation");
    if let Err(e) = timed(
        "InstallPrinterDrivers",
        ctx.timeouts.install,
        ctx.collaborators.package_modify.install_printer_drivers(
            0,
            std::slice::from_ref(&device_id),
            INSTALL_INTERACTION,
        ),
    )
    .await
    {
        warn!(error = %e, "driver installation failed");
    }
}

async fn notify(ctx: &SetupContext, notice: &UserNotice) {
    if let Err(e) = timed(
        "Notify",
        ctx.timeouts.query,
        ctx.collaborators.notifier.show(notice),
    )
    .await
    {
        warn!(error = %e, primary = %notice.primary, "cannot show notice");
    }
}
