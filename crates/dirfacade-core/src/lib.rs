//! # dirfacade-core
//!
//! Core types shared by the directory object facade.
//!
//! ## Modules
//!
//! - [`error`] - Error type and structured error responses
//! - [`config`] - Directory connection configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{DirectoryConfig, Domain};
pub use error::{Error, ErrorResponse, Result};
