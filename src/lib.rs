//! `judge-engine` - rules engine for an automated robot-combat referee
//!
//! The core is a single-writer [`referee::Referee`] that owns a virtual match
//! clock, a namespaced state store, a stage-aware scheduler, a buff ledger
//! and a notification bus. Health, heat, revive and penalty rules are
//! implemented on top of it in [`combat`], driven by a table [`rules`] set
//! loaded from YAML [`config`].
//!
//! Around the core sit a real-time tokio [`driver`], a deterministic
//! [`replay`] runner, and the `judge` CLI.

pub mod buff;
pub mod bus;
pub mod cli;
pub mod combat;
pub mod config;
pub mod driver;
pub mod entity;
pub mod error;
pub mod identity;
pub mod observability;
pub mod referee;
pub mod replay;
pub mod rules;
pub mod scheduler;
pub mod store;
