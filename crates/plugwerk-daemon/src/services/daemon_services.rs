// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Daemon wiring: config → host collaborators → workflow service → socket
// listener, and the orderly teardown of all of it.

use std::future::Future;
use std::sync::Arc;

use plugwerk_bridge::{Collaborators, host_collaborators};
use plugwerk_core::ServiceConfig;
use plugwerk_core::error::Result;
use plugwerk_setup::PlugwerkService;
use tracing::{info, warn};

use super::config_dir::{self, load_config, persist_config};
use crate::listener::EventListener;

/// Everything the daemon runs.
pub struct DaemonServices {
    config: ServiceConfig,
    service: Arc<PlugwerkService>,
    listener: EventListener,
}

impl DaemonServices {
    /// Initialise from the persisted configuration.  Call once at startup.
    ///
    /// The first run writes the defaults so they can be edited.
    pub fn init() -> Result<Self> {
        let dir = config_dir::config_dir();
        info!(path = %dir.display(), "initialising daemon services");

        let config = match load_config(&dir) {
            Some(config) => config,
            None => {
                let config = ServiceConfig::default();
                if let Err(e) = persist_config(&dir, &config) {
                    warn!(error = %e, "cannot write default config");
                }
                config
            }
        };

        let collaborators = host_collaborators(&config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Wire a daemon around explicit collaborators.
    pub fn with_collaborators(config: ServiceConfig, collaborators: Collaborators) -> Self {
        let service = Arc::new(PlugwerkService::new(collaborators, &config));
        let listener = EventListener::new(config.socket_path.clone());
        Self {
            config,
            service,
            listener,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve events until `shutdown` completes, then stop the listener and
    /// drain the running workflows.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be bound; the daemon cannot do anything
    /// useful without it.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.service.start();
        if let Err(e) = self.listener.start(Arc::clone(&self.service)) {
            self.service.shutdown().await;
            return Err(e);
        }
        info!(
            socket = %self.listener.path().display(),
            max_workflows = self.config.max_concurrent_workflows,
            "daemon ready"
        );

        shutdown.await;
        info!(
            connections = self.listener.active_connections(),
            "shutdown requested"
        );

        if let Err(e) = self.listener.stop().await {
            warn!(error = %e, "listener did not stop cleanly");
        }
        self.service.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use plugwerk_bridge::testing::FakeHost;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    use super::*;

    #[tokio::test]
    async fn serves_until_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("plugwerk.sock");
        let config = ServiceConfig {
            socket_path: socket.clone(),
            ..ServiceConfig::default()
        };

        let host = Arc::new(FakeHost::new());
        let daemon = DaemonServices::with_collaborators(config, host.collaborators());
        assert_eq!(daemon.config().socket_path, socket);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(daemon.run(async {
            stop_rx.await.ok();
        }));

        let mut stream = None;
        for _ in 0..100 {
            if let Ok(s) = UnixStream::connect(&socket).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let (reader, mut writer) = stream.expect("daemon socket").into_split();
        writer
            .write_all(b"{\"method\":\"GetReady\"}\n")
            .await
            .expect("write");
        let reply = BufReader::new(reader)
            .lines()
            .next_line()
            .await
            .expect("read")
            .expect("reply");
        assert!(reply.contains("\"ok\":true"));

        stop_tx.send(()).expect("signal");
        running.await.expect("join").expect("run");

        assert!(!socket.exists());
        assert_eq!(host.notices().await.len(), 1);
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let config = ServiceConfig {
            socket_path: "/nonexistent/plugwerk/dir/plugwerk.sock".into(),
            ..ServiceConfig::default()
        };
        let host = Arc::new(FakeHost::new());
        let daemon = DaemonServices::with_collaborators(config, host.collaborators());
        assert!(daemon.run(std::future::pending()).await.is_err());
    }
}
