// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Plugwerk auto-configuration workflow.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlugwerkError;

/// Unique identifier for one inbound event, used to correlate log lines of a
/// single workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Treat an empty string the same as an absent value.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Identifying attributes of a physical printer.
///
/// `device_id` is the raw IEEE 1284 tag string (`MFG:..;MDL:..;`).  The
/// structured fields are `None` when the device did not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub command_set: Option<String>,
    pub device_id: String,
}

impl DeviceIdentity {
    /// Build an identity from the loose fields of a `NewPrinter` event.
    ///
    /// The device-id string always carries all four tags, absent values
    /// rendered empty, so downstream tag lookups see the same layout the
    /// plug-in detector produced.
    pub fn from_fields(
        manufacturer: Option<String>,
        model: Option<String>,
        description: Option<String>,
        command_set: Option<String>,
    ) -> Self {
        let manufacturer = non_empty(manufacturer);
        let model = non_empty(model);
        let description = non_empty(description);
        let command_set = non_empty(command_set);

        let device_id = format!(
            "MFG:{};MDL:{};DES:{};CMD:{};",
            manufacturer.as_deref().unwrap_or(""),
            model.as_deref().unwrap_or(""),
            description.as_deref().unwrap_or(""),
            command_set.as_deref().unwrap_or(""),
        );

        Self {
            manufacturer,
            model,
            description,
            command_set,
            device_id,
        }
    }

    /// Parse an identity out of a raw device-id string.
    pub fn from_device_id(device_id: &str) -> Self {
        let lookup = |short: &str, long: &str| {
            device_id_tag(device_id, short).or_else(|| device_id_tag(device_id, long))
        };

        Self {
            manufacturer: lookup("mfg", "manufacturer"),
            model: lookup("mdl", "model"),
            description: lookup("des", "description"),
            command_set: lookup("cmd", "command set"),
            device_id: device_id.to_string(),
        }
    }

    /// `"{manufacturer} {model}"`, or `None` unless both are known.
    pub fn make_and_model(&self) -> Option<String> {
        match (&self.manufacturer, &self.model) {
            (Some(mfg), Some(mdl)) => Some(format!("{mfg} {mdl}")),
            _ => None,
        }
    }

    /// Look up a tag in this identity's device-id string.
    pub fn tag(&self, name: &str) -> Option<String> {
        device_id_tag(&self.device_id, name)
    }
}

/// Extract a tag value from a `;`-separated device-id string.
///
/// A field matches when it starts with `name` (ASCII case-insensitive) and is
/// longer than the name plus its `:` separator.  When several fields match,
/// the last one wins.
pub fn device_id_tag(device_id: &str, name: &str) -> Option<String> {
    let skip = name.len() + 1;
    device_id
        .split(';')
        .filter(|field| {
            field.len() > skip
                && field
                    .get(..name.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(name))
        })
        .filter_map(|field| field.get(skip..))
        .last()
        .map(str::to_string)
}

/// How well a candidate driver matches a device, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    ExactCommand,
    Exact,
    Close,
    Generic,
    None,
}

impl MatchTier {
    /// All tiers in the order they are consulted.
    pub const ALL: [MatchTier; 5] = [
        MatchTier::ExactCommand,
        MatchTier::Exact,
        MatchTier::Close,
        MatchTier::Generic,
        MatchTier::None,
    ];

    /// Keyword used by the driver-matching service.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::ExactCommand => "exact-cmd",
            Self::Exact => "exact",
            Self::Close => "close",
            Self::Generic => "generic",
            Self::None => "none",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.keyword() == keyword)
    }
}

/// One entry of a GetBestDrivers response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverCandidate {
    /// Driver identifier understood by the spooler (a PPD name).
    pub driver_id: String,
    pub tier: MatchTier,
}

impl DriverCandidate {
    pub fn new(driver_id: impl Into<String>, tier: MatchTier) -> Self {
        Self {
            driver_id: driver_id.into(),
            tier,
        }
    }
}

/// A spooler queue name: never empty, restricted to ASCII alphanumerics,
/// `-`, `_` and `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Whether `c` may appear in a queue name.
    pub fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/')
    }

    /// Replace every disallowed character with `-`.  Returns `None` for an
    /// empty input.
    pub fn sanitize(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let cleaned = raw
            .chars()
            .map(|c| if Self::is_allowed(c) { c } else { '-' })
            .collect();
        Some(Self(cleaned))
    }

    /// `"{self}-{index}"`, used when the plain name is taken.
    pub fn with_suffix(&self, index: u32) -> Self {
        Self(format!("{}-{index}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueueName {
    type Error = PlugwerkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() || !value.chars().all(Self::is_allowed) {
            return Err(PlugwerkError::InvalidQueueName(value));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for QueueName {
    type Error = PlugwerkError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default paper sizes chosen from the user's locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    Letter,
    A4,
}

impl PaperSize {
    /// Label matched (as a prefix) against PPD `PageSize` choices.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Letter => "Letter",
            Self::A4 => "A4",
        }
    }
}

/// Outcome of provisioning one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub success: bool,
    pub queue_name: QueueName,
}

/// Requests accepted by the service, one per inbound method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InboundEvent {
    GetReady,
    NewPrinter {
        #[serde(default)]
        status: i32,
        name: String,
        #[serde(default)]
        mfg: Option<String>,
        #[serde(default)]
        mdl: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        command: Option<String>,
    },
    InstallDrivers {
        #[serde(default)]
        mfg: Option<String>,
        #[serde(default)]
        mdl: Option<String>,
        #[serde(default)]
        command: Option<String>,
    },
}

impl InboundEvent {
    /// Method name as exposed on the inbound interface.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetReady => "GetReady",
            Self::NewPrinter { .. } => "NewPrinter",
            Self::InstallDrivers { .. } => "InstallDrivers",
        }
    }
}

/// An inbound event stamped on arrival.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub id: EventId,
    pub received_at: DateTime<Utc>,
    pub event: InboundEvent,
}

impl ReceivedEvent {
    pub fn new(event: InboundEvent) -> Self {
        Self {
            id: EventId::new(),
            received_at: Utc::now(),
            event,
        }
    }
}
