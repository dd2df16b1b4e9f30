// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod broker;
pub mod offering;

pub use broker::{
    BindDetails, Binding, BrokerError, DeprovisionDetails, DeprovisionServiceSpec, LastOperation,
    ProvisionDetails, ProvisionedServiceSpec, ServiceBroker, UnbindDetails, UpdateDetails,
    UpdateServiceSpec,
};
pub use offering::Offering;
