//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sentence player core:
//! - Logging and tracing infrastructure
//! - Session configuration and player preferences
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback crates depend on.
//! It establishes the logging conventions, the event broadcasting mechanism,
//! and the fail-fast session configuration used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
