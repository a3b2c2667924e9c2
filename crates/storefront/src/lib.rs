//! Cushion storefront library.
//!
//! Client side of the fabric catalog API, used by the shop's configurator:
//!
//! - [`client::CatalogClient`] - typed calls for every catalog route, with
//!   reads served from a [`cache::TtlCache`] and invalidated on writes
//! - [`retry::RetryPolicy`] - bounded linear backoff for transient failures
//! - [`resource::Resource`] - `Loading | Ready | Failed` state for the
//!   fabric list and category list

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod resource;
pub mod retry;

pub use cache::TtlCache;
pub use client::CatalogClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use resource::{Resource, ResourceState};
pub use retry::RetryPolicy;
