// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stand-in notifier for when desktop notices are switched off.

use async_trait::async_trait;
use tracing::debug;

use plugwerk_core::error::Result;
use plugwerk_core::human_errors::UserNotice;

use crate::traits::Notifier;

/// Notifier that drops every notice.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn show(&self, notice: &UserNotice) -> Result<()> {
        debug!(primary = %notice.primary, "notices disabled; dropping");
        Ok(())
    }
}
