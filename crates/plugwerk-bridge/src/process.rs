// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Helper for adapters that drive a command-line tool.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use plugwerk_core::error::{PlugwerkError, Result};

/// Run `program` with `args` and return its stdout.
///
/// A missing binary is a transport failure of `service`; a non-zero exit is
/// a remote failure of `call` carrying the tool's stderr.
pub(crate) async fn run_tool<I, S>(
    program: &Path,
    args: I,
    service: &'static str,
    call: &'static str,
) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlugwerkError::Transport {
                    service,
                    detail: format!("{} not found", program.display()),
                }
            } else {
                PlugwerkError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlugwerkError::Remote {
            call,
            detail: format!("{} exited with {}: {}", program.display(), output.status, stderr.trim()),
        });
    }

    debug!(program = %program.display(), call, "tool finished");
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_transport_error() {
        let err = run_tool(Path::new("/nonexistent/plugwerk-tool"), ["x"], "test", "Run")
            .await
            .unwrap_err();
        assert!(matches!(err, PlugwerkError::Transport { service: "test", .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_exit_is_a_remote_error() {
        let err = run_tool(Path::new("/bin/sh"), ["-c", "echo nope >&2; exit 3"], "test", "Run")
            .await
            .unwrap_err();
        match err {
            PlugwerkError::Remote { call, detail } => {
                assert_eq!(call, "Run");
                assert!(detail.contains("nope"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_returned() {
        let out = run_tool(Path::new("/bin/sh"), ["-c", "echo hello"], "test", "Run")
            .await
            .expect("run");
        assert_eq!(out.trim(), "hello");
    }
}
