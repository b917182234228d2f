// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-facing notice texts.
//
// The service only ever tells the user two things: that a new printer is
// being configured, and that no driver could be set up for it.  Everything
// else stays in the logs.

use crate::types::DeviceIdentity;

/// Application name shown by the notification server.
pub const NOTICE_APP_NAME: &str = "Printers";

/// Icon attached to every notice.
pub const NOTICE_ICON: &str = "printer-symbolic";

/// A transient desktop notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    /// Heading.
    pub primary: String,
    /// Body text, if any.
    pub secondary: Option<String>,
}

/// Shown when a configuration session starts.
pub fn configuring_notice() -> UserNotice {
    UserNotice {
        primary: "Configuring new printer".into(),
        secondary: Some("Please wait...".into()),
    }
}

/// Shown when provisioning a plugged-in device failed.
///
/// Names the device by manufacturer and model when both are known, falling
/// back to the description, then to a generic sentence.
pub fn missing_driver_notice(identity: &DeviceIdentity) -> UserNotice {
    let device = identity
        .make_and_model()
        .or_else(|| identity.description.clone());

    let secondary = match device {
        Some(device) => format!("No printer driver for {device}."),
        None => "No driver for this printer.".into(),
    };

    UserNotice {
        primary: "Missing printer driver".into(),
        secondary: Some(secondary),
    }
}
