//! # Waypoint Domain
//!
//! Business domain types and models for the Waypoint location uplink.
//!
//! This crate contains:
//! - Location and queue data types (Coordinate, QueuedOperation, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Waypoint crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
