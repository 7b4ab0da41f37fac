//! Armory collection pipeline.
//!
//! Fetches a character's collection data from the armory API, decodes the
//! inconsistent payload into typed records, and builds progress snapshots
//! and two-character attribute comparisons for a rendering layer to consume.

pub mod armory;
pub mod attrs;
pub mod cache;
pub mod collection;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod present;
pub mod snapshot;
