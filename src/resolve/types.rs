//! Inputs and outputs of conflict resolution.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::range::{Coordinates, Observation, SourceRole};

/// One source's view of the address being resolved.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reading<'a> {
    pub source: &'a str,
    pub role: SourceRole,
    pub observation: Option<&'a Observation>,
}

impl<'a> Reading<'a> {
    pub fn new(source: &'a str, role: SourceRole, observation: Option<&'a Observation>) -> Self {
        Self { source, role, observation }
    }
}

/// Which decision path produced a value, and from which source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// All coordinate sources agreed; `source` supplied the chosen point.
    Unanimous { source: String },
    /// An override rule fired; `source` supplied the coordinates.
    Override { rule: Vec<String>, source: String },
    /// Country chosen by vote; `source` supplied the coordinates.
    Vote { source: String },
    /// No coordinate source had data at all.
    NoCoords,
    /// No coordinate source agreed with any voted country.
    NoMatch,
}

/// Provenance without its source names, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceKind {
    Unanimous,
    Override,
    Vote,
    NoCoords,
    NoMatch,
}

impl Provenance {
    pub fn kind(&self) -> ProvenanceKind {
        match self {
            Self::Unanimous { .. } => ProvenanceKind::Unanimous,
            Self::Override { .. } => ProvenanceKind::Override,
            Self::Vote { .. } => ProvenanceKind::Vote,
            Self::NoCoords => ProvenanceKind::NoCoords,
            Self::NoMatch => ProvenanceKind::NoMatch,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unanimous { source } => write!(f, "unanimous->{}", source),
            Self::Override { rule, source } => write!(f, "{}->{}", rule.join("+"), source),
            Self::Vote { source } => write!(f, "vote->{}", source),
            Self::NoCoords => write!(f, "no_coords"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The resolved value for one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub country: String,
    pub coords: Coordinates,
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_labels() {
        assert_eq!(Provenance::Unanimous { source: "a".into() }.to_string(), "unanimous->a");
        assert_eq!(
            Provenance::Override { rule: vec!["x".into(), "y".into()], source: "c".into() }.to_string(),
            "x+y->c"
        );
        assert_eq!(Provenance::Vote { source: "b".into() }.to_string(), "vote->b");
        assert_eq!(Provenance::NoCoords.to_string(), "no_coords");
        assert_eq!(Provenance::NoMatch.to_string(), "no_match");
    }

    #[test]
    fn test_provenance_serializes_as_label() {
        let json = serde_json::to_string(&Provenance::Vote { source: "b".into() }).unwrap();
        assert_eq!(json, "\"vote->b\"");
    }
}
