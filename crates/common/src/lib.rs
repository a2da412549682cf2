// Copyright (C) 2026 EVM Debug Service Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Shared functionality for the EVM debug service.
//!
//! This crate provides the types, on-disk cache, environment variable
//! names, logging setup and error taxonomy shared by the `fork-manager`,
//! `debug-engine` and `server` crates.

pub mod cache;
pub mod env;
pub mod error;
pub mod logging;
pub mod types;

pub use cache::*;
pub use error::DebugError;
