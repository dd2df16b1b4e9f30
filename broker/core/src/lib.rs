// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `helm-broker-core`
//!
//! Open Service Broker backed by Helm releases.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | Catalog, release naming and status parsing, parameter policy, engine port, config |
//! | [`application`] | Application | `ServiceBroker` lifecycle orchestrator, offerings |
//! | [`infrastructure`] | Infrastructure | `HelmClient` release adapter, process executor |
//! | [`presentation`] | Presentation | axum router for the OSB v2 endpoints |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
