//! geoip_merge: builds one disjoint IP-range → geolocation table from
//! several overlapping, possibly conflicting source tables.
//!
//! Pipeline: [`loader`] reads each source into a [`range::RangeTable`],
//! [`merge::MergeEngine`] sweeps the union of their boundaries and asks
//! [`resolve::ConflictResolver`] for a winner per segment, and [`output`]
//! writes the coalesced result.

pub mod address;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod range;
pub mod resolve;

pub use error::{Error, Result};
