// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`helm-broker-core`)
//!
//! HTTP surface that translates Open Service Broker requests into
//! [`crate::application::broker::ServiceBroker`] calls. No lifecycle logic
//! lives here; this layer only parses requests, checks credentials and maps
//! results onto status codes.

pub mod api;
