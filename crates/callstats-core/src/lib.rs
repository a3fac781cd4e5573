//! Queue aggregation and extension provisioning for callstats.
//!
//! This crate turns engine responses into the views the HTTP layer serves.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `callstats-config.yaml` into
//!   strongly-typed structs.
//! - [`registry`] -- [`QueueRegistry`] trait: the set of queue names that
//!   commands may be issued for.
//! - [`queues`] -- [`QueueService`]: agent, tier and caller views per queue.
//! - [`monitor`] -- [`MonitorService`]: engine status, calls, channels, hangup.
//! - [`directory`] -- [`DirectoryStore`] trait with XML-file and in-memory
//!   stores.
//! - [`provision`] -- [`Provisioner`]: default template merge and user creation.
//!
//! [`QueueRegistry`]: registry::QueueRegistry
//! [`QueueService`]: queues::QueueService
//! [`MonitorService`]: monitor::MonitorService
//! [`DirectoryStore`]: directory::DirectoryStore
//! [`Provisioner`]: provision::Provisioner

pub mod config;
pub mod directory;
pub mod error;
mod exchange;
pub mod monitor;
pub mod provision;
pub mod queues;
pub mod registry;

pub use error::CoreError;
