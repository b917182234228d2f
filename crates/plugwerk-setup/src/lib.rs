// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugwerk Setup — the printer auto-configuration workflow.  Turns a "new
// printer" event into a working queue: driver selection, queue naming,
// provisioning, locale defaults and driver dependency repair.  All host
// access goes through the collaborators in `plugwerk-bridge`.

pub mod call;
pub mod deps;
pub mod naming;
pub mod orchestrator;
pub mod paper;
pub mod provision;
pub mod resolver;

pub use orchestrator::{PlugwerkService, ServiceStatus};

use plugwerk_bridge::Collaborators;

use crate::call::Timeouts;

/// What every workflow step needs: the collaborators, their deadlines and
/// the locale that picks the default paper size.
pub struct SetupContext {
    pub collaborators: Collaborators,
    pub timeouts: Timeouts,
    pub locale: String,
}

impl SetupContext {
    /// Context using this process's locale.
    pub fn new(collaborators: Collaborators, timeouts: Timeouts) -> Self {
        Self {
            collaborators,
            timeouts,
            locale: paper::current_locale(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}
