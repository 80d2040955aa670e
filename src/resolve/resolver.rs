//! Conflict resolver: decides one segment's country and coordinates.
//!
//! Order of evaluation:
//!   unanimous coordinate agreement → override rules → vote
//!   → vote tie-break by `vote_priority` → first voted country with coordinates
//!   → top-voted country with placeholder coordinates.
//!
//! Every walk is over an ordered list (`coord_priority`, `vote_priority`,
//! `overrides`, or source order), so the result never depends on hashing.

use super::center::{pick_center, Candidate};
use super::types::{Decision, Provenance, Reading};
use crate::config::MergeConfig;
use crate::range::{Coordinates, Observation, SourceRole};

/// A source that both appears in `coord_priority` and carries coordinates.
#[derive(Debug, Clone, Copy)]
struct CoordSource<'a> {
    source: &'a str,
    role: SourceRole,
    country: &'a str,
    coords: &'a Coordinates,
}

pub struct ConflictResolver<'c> {
    config: &'c MergeConfig,
}

impl<'c> ConflictResolver<'c> {
    pub fn new(config: &'c MergeConfig) -> Self {
        Self { config }
    }

    /// Resolve the readings taken at one point. `readings` must be in source
    /// order; `None` when no source has an observation.
    pub fn resolve(&self, readings: &[Reading<'_>]) -> Option<Decision> {
        let present: Vec<(&str, &Observation)> = readings
            .iter()
            .filter_map(|r| r.observation.map(|o| (r.source, o)))
            .collect();
        if present.is_empty() {
            return None;
        }
        let country_of = |name: &str| {
            present.iter().find(|(source, _)| *source == name).map(|(_, o)| o.country())
        };

        let coord_sources = self.coord_sources(readings);
        let find_coords = |country: &str| coord_sources.iter().find(|c| c.country == country);

        // Unanimous agreement among coordinate sources.
        let latlong: Vec<&CoordSource<'_>> =
            coord_sources.iter().filter(|c| c.role == SourceRole::LatLong).collect();
        if latlong.len() >= 2 && latlong.iter().all(|c| c.country == latlong[0].country) {
            let candidates: Vec<Candidate<'_>> = latlong
                .iter()
                .map(|c| Candidate { source: c.source, coords: c.coords })
                .collect();
            if let Some(center) = pick_center(&candidates, self.config.coord_spread_threshold) {
                return Some(Decision {
                    country: latlong[0].country.to_string(),
                    coords: center.coords.clone(),
                    provenance: Provenance::Unanimous { source: center.source.to_string() },
                });
            }
        }

        // Override rules, in configured order.
        for rule in &self.config.overrides {
            let Some((first, rest)) = rule.sources.split_first() else {
                continue;
            };
            let Some(country) = country_of(first.as_str()) else {
                continue;
            };
            let agreed = rest.iter().all(|name| country_of(name.as_str()) == Some(country));
            if !agreed {
                continue;
            }
            if let Some(found) = find_coords(country) {
                return Some(Decision {
                    country: country.to_string(),
                    coords: found.coords.clone(),
                    provenance: Provenance::Override {
                        rule: rule.sources.clone(),
                        source: found.source.to_string(),
                    },
                });
            }
        }

        let ranking = rank_votes(&present);

        if coord_sources.is_empty() {
            return Some(Decision {
                country: ranking[0].0.to_string(),
                coords: Coordinates::placeholder(),
                provenance: Provenance::NoCoords,
            });
        }

        // Tie at the top: let vote_priority choose among the tied countries.
        if ranking.len() >= 2 && ranking[0].1 == ranking[1].1 {
            let top = ranking[0].1;
            let tied: Vec<&str> = ranking.iter().take_while(|(_, n)| *n == top).map(|(c, _)| *c).collect();
            for name in &self.config.vote_priority {
                let Some(country) = country_of(name.as_str()) else {
                    continue;
                };
                if !tied.contains(&country) {
                    continue;
                }
                if let Some(found) = find_coords(country) {
                    return Some(vote_decision(country, found));
                }
            }
        }

        for &(country, _) in &ranking {
            if let Some(found) = find_coords(country) {
                return Some(vote_decision(country, found));
            }
        }

        Some(Decision {
            country: ranking[0].0.to_string(),
            coords: Coordinates::placeholder(),
            provenance: Provenance::NoMatch,
        })
    }

    /// Sources in `coord_priority` order that reported coordinates.
    fn coord_sources<'a>(&self, readings: &[Reading<'a>]) -> Vec<CoordSource<'a>> {
        self.config
            .coord_priority
            .iter()
            .filter_map(|name| readings.iter().find(|r| r.source == name.as_str()))
            .filter_map(|r| match r.observation {
                Some(Observation::WithCoords { country, coords }) => Some(CoordSource {
                    source: r.source,
                    role: r.role,
                    country: country.as_str(),
                    coords,
                }),
                Some(Observation::CountryOnly { .. }) | None => None,
            })
            .collect()
    }
}

fn vote_decision(country: &str, found: &CoordSource<'_>) -> Decision {
    Decision {
        country: country.to_string(),
        coords: found.coords.clone(),
        provenance: Provenance::Vote { source: found.source.to_string() },
    }
}

/// Countries by descending vote count; equal counts keep first-seen order.
fn rank_votes<'a>(present: &[(&str, &'a Observation)]) -> Vec<(&'a str, usize)> {
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    for &(_, observation) in present {
        let country = observation.country();
        match tally.iter_mut().find(|(c, _)| *c == country) {
            Some((_, n)) => *n += 1,
            None => tally.push((country, 1)),
        }
    }
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
}
