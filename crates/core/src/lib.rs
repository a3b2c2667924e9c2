//! Cushion Core - Shared domain types for the fabric catalog.
//!
//! This crate provides the types used across all catalog components:
//! - `server` - HTTP API, fabric record store, storage sync engine
//! - `storefront` - API client with response cache used by the shop frontend
//! - `cli` - Operator tooling (migrations, manual sync, admin bootstrap)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no key-value
//! access, no HTTP clients. This keeps it lightweight and usable from both the
//! server and the client side.
//!
//! # Modules
//!
//! - [`types`] - Fabric records, categories, filters, roles, emails and string IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
