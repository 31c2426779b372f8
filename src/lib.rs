//! zesctl - Level Zero sysman control library
//!
//! This library provides a guarded dispatch layer over the Level Zero
//! system management API plus the queries and controls built on it.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`services`]: Inventory and control services
//! - [`sysman`]: Dispatch gate, capability table and loaders

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod sysman;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
