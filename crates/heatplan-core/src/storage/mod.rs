//! # Storage Module
//!
//! Persistent result store for scenario runs using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Values are postcard-encoded and keyed by scenario name.

mod redb_store;

pub use redb_store::{ResultStore, StoreStatus};
