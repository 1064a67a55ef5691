//! Confab - data-access core for a group-chat backend.
//!
//! All entities live in one table behind the [`store::TableStore`] trait;
//! [`index`] describes the access patterns, [`codec`] maps typed entities to
//! raw records, [`services`] exposes per-entity operations, [`saga`] runs
//! the compound writes, and [`fanout`] pushes messages to live connections.

pub mod codec;
pub mod config;
pub mod fanout;
pub mod index;
pub mod model;
pub mod saga;
pub mod services;
pub mod store;
pub mod telemetry;
