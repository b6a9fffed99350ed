//! Automation Core
//!
//! Core library for the Azure Automation provider: the resource model, typed
//! resource schemas, the provider trait, and the provisioning-state poller
//! used while a resource finishes provisioning.

pub mod differ;
pub mod poller;
pub mod provider;
pub mod resource;
pub mod schema;
