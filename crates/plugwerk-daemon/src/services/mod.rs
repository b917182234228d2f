// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: configuration storage and the wiring that turns a config
// into a running auto-configuration daemon.

pub mod config_dir;
pub mod daemon_services;
