// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Switchyard CLI

pub mod config;
pub mod route;
pub mod simulate;
pub mod sources;

pub use self::config::ConfigCommand;
pub use self::route::RouteCommand;
pub use self::simulate::SimulateCommand;
pub use self::sources::SourcesCommand;
