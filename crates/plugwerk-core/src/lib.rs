// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugwerk — Core types, errors and driver-file parsing shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod ppd;
pub mod types;

pub use config::ServiceConfig;
pub use error::PlugwerkError;
pub use types::*;
