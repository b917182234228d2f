// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Plugwerk.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Plugwerk operations.
#[derive(Debug, Error)]
pub enum PlugwerkError {
    // -- Collaborator errors --
    #[error("{service} is unreachable: {detail}")]
    Transport { service: &'static str, detail: String },

    #[error("{call} timed out after {}s", .after.as_secs())]
    Timeout { call: &'static str, after: Duration },

    #[error("{call} failed: {detail}")]
    Remote { call: &'static str, detail: String },

    // -- Workflow outcomes --
    #[error("no driver matches this device")]
    NoDriver,

    #[error("device id carries no usable model tag")]
    NoQueueName,

    #[error("invalid queue name '{0}'")]
    InvalidQueueName(String),

    #[error("queue '{0}' is not registered after PrinterAdd")]
    RegistrationUnverified(String),

    #[error("service is not accepting events")]
    NotRunning,

    // -- Driver files --
    #[error("PPD parse error at line {line}: {detail}")]
    Ppd { line: usize, detail: String },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlugwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_call_and_seconds() {
        let err = PlugwerkError::Timeout {
            call: "GetBestDrivers",
            after: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "GetBestDrivers timed out after 60s");
    }

    #[test]
    fn outcome_messages_name_the_queue() {
        let err = PlugwerkError::RegistrationUnverified("Widget".into());
        assert_eq!(err.to_string(), "queue 'Widget' is not registered after PrinterAdd");
        assert_eq!(
            PlugwerkError::NotRunning.to_string(),
            "service is not accepting events"
        );
    }
}
