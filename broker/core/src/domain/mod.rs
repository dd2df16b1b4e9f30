// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Catalog, release identity, parameter policy and the engine port.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O apart from config file loading

pub mod catalog;
pub mod config;
pub mod engine;
pub mod parameters;
pub mod release;
