//! Payload types held by range tables.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A latitude or longitude as the source wrote it.
///
/// Equality and ordering use the original text so that output and
/// coalescing are faithful to the input; the parsed value is only
/// consulted for distance comparisons.
#[derive(Debug, Clone)]
pub struct Degrees {
    text: Box<str>,
    value: f64,
}

impl Degrees {
    /// Parse a decimal degree value. Non-finite values are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let value: f64 = text.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(Self { text: text.into(), value })
    }

    pub fn zero() -> Self {
        Self { text: "0".into(), value: 0.0 }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Degrees {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Degrees {}

impl PartialOrd for Degrees {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Degrees {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Degrees {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Coordinates {
    pub lat: Degrees,
    pub lon: Degrees,
}

impl Coordinates {
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        Some(Self {
            lat: Degrees::parse(lat)?,
            lon: Degrees::parse(lon)?,
        })
    }

    /// `0`/`0`, emitted when no source can supply coordinates.
    pub fn placeholder() -> Self {
        Self { lat: Degrees::zero(), lon: Degrees::zero() }
    }

    /// Euclidean distance treating lat/lon as a plane. Only meaningful for
    /// comparing how closely sources agree, not as a real distance.
    pub fn planar_distance(&self, other: &Coordinates) -> f64 {
        let dlat = self.lat.value() - other.lat.value();
        let dlon = self.lon.value() - other.lon.value();
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

/// What one source says about an address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    CountryOnly { country: String },
    WithCoords { country: String, coords: Coordinates },
}

impl Observation {
    pub fn country(&self) -> &str {
        match self {
            Self::CountryOnly { country } | Self::WithCoords { country, .. } => country,
        }
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        match self {
            Self::CountryOnly { .. } => None,
            Self::WithCoords { coords, .. } => Some(coords),
        }
    }
}

/// Whether a source supplies coordinates or only a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceRole {
    #[serde(rename = "latlong")]
    LatLong,
    #[serde(rename = "country")]
    CountryOnly,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatLong => write!(f, "latlong"),
            Self::CountryOnly => write!(f, "country"),
        }
    }
}
