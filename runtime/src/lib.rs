// Copyright 2026 Sitewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! sitewatch — poll web pages and alert when a marker string appears or
//! disappears.
//!
//! The library exposes the change-detection engine for integration testing:
//! fetch strategies, the presence state machine, the notifier and the poll
//! loop that ties them together.

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod fetch;
pub mod notify;
pub mod renderer;
pub mod runner;
pub mod target;
pub mod watch;
