//! spftree Common - Shared types and utilities
//!
//! This crate provides the domain-name type, error taxonomy and
//! configuration shared by the resolver core and the command-line tool.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::DomainName;
