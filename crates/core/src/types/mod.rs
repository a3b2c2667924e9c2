//! Core types for the fabric catalog.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod fabric;
pub mod id;
pub mod role;

pub use email::{Email, EmailError};
pub use fabric::*;
pub use id::*;
pub use role::{UserRole, UserRoleError};
