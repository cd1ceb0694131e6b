/*
 * 5D Labs Identity Operator - Workload Identity Sync for Kubernetes
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Identity operator core library
//!
//! Watches UserAssignedIdentity managed resources (across their historical
//! API groups) and converges dependent ServiceAccount annotations and
//! RoleAssignment principal references onto the identity's client/principal
//! IDs, restarting Deployments whose ServiceAccount binding changed.

pub mod sync;

// Re-export commonly used types
pub use sync::config::ControllerConfig;
pub use sync::controller::CycleOutcome;
pub use sync::store::ObjectStore;
pub use sync::types::{Error, IdentityKey, Result};
