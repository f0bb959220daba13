//! # Core Library Module
//!
//! Sentence playlist data model and persistence:
//! - [`models`] - Track and sample-playlist types
//! - [`import`] - Two-column text import (delimited or line-paired)
//! - [`playlists`] - Named playlist persistence over the settings store
//!
//! The playback crates treat tracks as read-only; only the orchestrator's
//! playlist owner mutates them (duration correction after the first measured
//! playback).

pub mod error;
pub mod import;
pub mod models;
pub mod playlists;

pub use error::{LibraryError, Result};
pub use import::{export_tracks, parse_tracks, ImportOutcome};
pub use models::{sample_tracks, Track};
pub use playlists::PlaylistStore;
