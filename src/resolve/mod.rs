//! Conflict resolution: turns every source's reading at a point into one
//! country and coordinate, labelled with how it was chosen.

pub mod center;
pub mod resolver;
pub mod types;

pub use center::{pick_center, Candidate};
pub use resolver::ConflictResolver;
pub use types::{Decision, Provenance, ProvenanceKind, Reading};
