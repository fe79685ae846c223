//! # Recap Common Library
//!
//! Shared code for the Recap services including:
//! - Error types
//! - Configuration and root folder resolution
//! - Database initialization and row models
//! - Plan tier definitions
//! - Database lock-retry helper

pub mod config;
pub mod db;
pub mod error;
pub mod plan;

pub use error::{Error, Result};
pub use plan::Plan;
