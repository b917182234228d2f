// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound event transport: a Unix socket speaking newline-delimited JSON.
//
// Each line is one request, `{"method":"NewPrinter","params":{...}}`, and
// gets exactly one reply line.  `{"ok":true,"event_id":"..."}` means the
// event was accepted; the workflow runs after the reply is written.
// Unparseable lines get `{"ok":false,"error":"..."}` and the connection
// stays open.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use plugwerk_core::error::{PlugwerkError, Result};
use plugwerk_core::types::{EventId, InboundEvent};
use plugwerk_setup::PlugwerkService;

/// Longest request line accepted, in bytes.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// One reply line.
#[derive(Debug, Serialize)]
struct Reply {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Reply {
    fn accepted(id: EventId) -> Self {
        Self {
            ok: true,
            event_id: Some(id),
            error: None,
        }
    }

    fn rejected(error: impl ToString) -> Self {
        Self {
            ok: false,
            event_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Socket listener feeding events into a [`PlugwerkService`].
pub struct EventListener {
    path: PathBuf,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl EventListener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the socket and spawn the accept loop.
    ///
    /// A stale socket file from an earlier run is replaced.
    pub fn start(&mut self, service: Arc<PlugwerkService>) -> Result<()> {
        if self.task_handle.is_some() {
            debug!(path = %self.path.display(), "listener already running");
            return Ok(());
        }

        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        let listener = UnixListener::bind(&self.path).map_err(|e| PlugwerkError::Transport {
            service: "socket",
            detail: format!("bind {}: {e}", self.path.display()),
        })?;
        info!(path = %self.path.display(), "listening for printer events");

        let shutdown = Arc::clone(&self.shutdown_signal);
        let connections = Arc::clone(&self.active_connections);
        self.task_handle = Some(tokio::spawn(accept_loop(
            listener,
            shutdown,
            connections,
            service,
        )));
        Ok(())
    }

    /// Stop accepting connections and remove the socket file.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };

        self.shutdown_signal.notify_one();
        handle.await.map_err(|e| PlugwerkError::Transport {
            service: "socket",
            detail: format!("task join: {e}"),
        })?;

        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(error = %e, "cannot remove socket file");
        }
        info!("listener stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: UnixListener,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicU32>,
    service: Arc<PlugwerkService>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("accept loop received shutdown signal");
                break;
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let service = Arc::clone(&service);
                        let connections = Arc::clone(&connections);
                        tokio::spawn(async move {
                            connections.fetch_add(1, Ordering::Relaxed);
                            if let Err(e) = handle_connection(stream, service).await {
                                warn!(error = %e, "connection handler error");
                            }
                            connections.fetch_sub(1, Ordering::Relaxed);
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}

/// Serve request lines until the peer hangs up.
///
/// Each read is capped at `MAX_LINE_BYTES + 1`; a longer line gets one
/// rejection and the connection is dropped.
async fn handle_connection(stream: UnixStream, service: Arc<PlugwerkService>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(());
        }

        if buf.len() > MAX_LINE_BYTES {
            warn!(limit = MAX_LINE_BYTES, "request line too large; closing connection");
            write_reply(&mut writer, &Reply::rejected("request too large")).await?;
            return Ok(());
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                write_reply(&mut writer, &Reply::rejected(format!("invalid request: {e}"))).await?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => match service.handle(event).await {
                Ok(id) => Reply::accepted(id),
                Err(e) => Reply::rejected(e),
            },
            Err(e) => {
                debug!(error = %e, "unparseable request");
                Reply::rejected(format!("invalid request: {e}"))
            }
        };
        write_reply(&mut writer, &reply).await?;
    }
}

async fn write_reply(writer: &mut OwnedWriteHalf, reply: &Reply) -> Result<()> {
    let mut out = serde_json::to_vec(reply)?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    Ok(())
}
