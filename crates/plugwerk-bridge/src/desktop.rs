// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop notices through `notify-send`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use plugwerk_core::error::Result;
use plugwerk_core::human_errors::{NOTICE_APP_NAME, NOTICE_ICON, UserNotice};

use crate::process::run_tool;
use crate::traits::Notifier;

pub struct NotifySend {
    program: PathBuf,
}

impl NotifySend {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

/// Arguments for one transient notice.
fn notice_args(notice: &UserNotice) -> Vec<String> {
    let mut args = vec![
        format!("--app-name={NOTICE_APP_NAME}"),
        format!("--icon={NOTICE_ICON}"),
        "--hint=int:transient:1".into(),
        notice.primary.clone(),
    ];
    if let Some(secondary) = &notice.secondary {
        args.push(secondary.clone());
    }
    args
}

#[async_trait]
impl Notifier for NotifySend {
    async fn show(&self, notice: &UserNotice) -> Result<()> {
        debug!(primary = %notice.primary, "showing notice");
        run_tool(&self.program, notice_args(notice), "notifications", "Notify")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwerk_core::human_errors::configuring_notice;

    #[test]
    fn args_carry_summary_and_body() {
        let args = notice_args(&configuring_notice());
        assert_eq!(args[0], "--app-name=Printers");
        assert!(args.contains(&"Configuring new printer".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("Please wait..."));
    }
}
