//! The merge engine: sweeps every boundary segment, resolves it, and
//! coalesces the result into a disjoint table.
//!
//! Each table's cursor is owned here and only ever sees ascending points,
//! because segments come out of the boundary index in ascending order.
//! This loop must stay sequential while the tables use forward-only cursors.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::address::{self, Address};
use crate::config::MergeConfig;
use crate::loader::LoadedSource;
use crate::range::{BoundaryIndex, Coordinates, Cursor};
use crate::resolve::{ConflictResolver, Decision, Provenance, ProvenanceKind, Reading};

const PROGRESS_INTERVAL: usize = 500_000;

/// A resolved address range. `end` is inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: Address,
    pub end: Address,
    pub country: String,
    pub coords: Coordinates,
    pub provenance: Provenance,
}

impl Segment {
    fn from_decision(start: Address, end: Address, decision: Decision) -> Self {
        Self {
            start,
            end,
            country: decision.country,
            coords: decision.coords,
            provenance: decision.provenance,
        }
    }

    /// Whether `next` continues this segment with the same value.
    fn absorbs(&self, next: &Segment) -> bool {
        self.country == next.country
            && self.coords == next.coords
            && self.end.checked_add(1) == Some(next.start)
    }
}

/// Counters surfaced after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStats {
    pub boundaries: usize,
    pub candidate_segments: usize,
    pub uncovered_segments: usize,
    pub decided_segments: usize,
    pub merged_segments: usize,
    pub decisions: BTreeMap<ProvenanceKind, usize>,
}

/// Final ordered, disjoint output.
#[derive(Debug, Clone, Default)]
pub struct MergedTable {
    pub segments: Vec<Segment>,
    pub stats: MergeStats,
}

/// Every source's reading at one address plus the resulting decision.
#[derive(Debug, Serialize)]
pub struct Explanation<'a> {
    pub address: String,
    pub readings: Vec<Reading<'a>>,
    pub decision: Option<Decision>,
}

pub struct MergeEngine<'s> {
    sources: &'s [LoadedSource],
    config: &'s MergeConfig,
}

impl<'s> MergeEngine<'s> {
    /// `sources` must be in configuration order; it drives vote tie order.
    pub fn new(sources: &'s [LoadedSource], config: &'s MergeConfig) -> Self {
        Self { sources, config }
    }

    pub fn run(&self) -> MergedTable {
        let index = BoundaryIndex::build(self.sources.iter().map(|s| &s.table));
        let resolver = ConflictResolver::new(self.config);
        let mut cursors: Vec<Cursor> = self.sources.iter().map(|s| s.table.cursor()).collect();
        let mut readings: Vec<Reading<'s>> = Vec::with_capacity(self.sources.len());

        let total = index.segment_count();
        let mut stats = MergeStats {
            boundaries: index.len(),
            candidate_segments: total,
            ..MergeStats::default()
        };
        tracing::info!(boundaries = index.len(), segments = total, "sweeping boundary segments");

        let mut decided = Vec::new();
        for (idx, (start, end)) in index.segments().enumerate() {
            if idx > 0 && idx % PROGRESS_INTERVAL == 0 {
                tracing::debug!(done = idx, total, "sweep progress");
            }

            readings.clear();
            for (source, cursor) in self.sources.iter().zip(cursors.iter_mut()) {
                let observation = source.table.sweep(cursor, start);
                readings.push(Reading::new(&source.name, source.role, observation));
            }
            if readings.iter().all(|r| r.observation.is_none()) {
                stats.uncovered_segments += 1;
                continue;
            }

            if let Some(decision) = resolver.resolve(&readings) {
                *stats.decisions.entry(decision.provenance.kind()).or_default() += 1;
                decided.push(Segment::from_decision(start, end, decision));
            }
        }

        stats.decided_segments = decided.len();
        let segments = coalesce(decided);
        stats.merged_segments = segments.len();
        tracing::info!(
            before = stats.decided_segments,
            after = stats.merged_segments,
            "coalesced adjacent segments"
        );

        MergedTable { segments, stats }
    }

    /// Resolve a single address from fresh cursors, for auditing.
    pub fn explain(&self, point: Address) -> Explanation<'s> {
        let readings: Vec<Reading<'s>> = self
            .sources
            .iter()
            .map(|s| Reading::new(&s.name, s.role, s.table.sweep(&mut s.table.cursor(), point)))
            .collect();
        let decision = ConflictResolver::new(self.config).resolve(&readings);
        Explanation {
            address: address::to_hex(point),
            readings,
            decision,
        }
    }
}

/// Merge contiguous neighbours that resolved to the same country and
/// coordinates. The first segment's provenance is kept.
pub fn coalesce<I>(segments: I) -> Vec<Segment>
where
    I: IntoIterator<Item = Segment>,
{
    let mut merged: Vec<Segment> = Vec::new();
    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.absorbs(&segment) => last.end = segment.end,
            _ => merged.push(segment),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverrideRule;
    use crate::loader::SourceStats;
    use crate::range::{Observation, RangeTableBuilder, SourceRole};

    fn source(name: &str, role: SourceRole, ranges: &[(Address, Address, Observation)]) -> LoadedSource {
        let mut builder = RangeTableBuilder::new();
        for (start, end, payload) in ranges {
            builder.add(*start, *end, payload.clone());
        }
        let table = builder.finalize(name);
        let mut stats = SourceStats::new(name, role);
        stats.ranges = table.len();
        LoadedSource {
            name: name.to_string(),
            role,
            table,
            stats,
        }
    }

    fn located(cc: &str, lat: &str, lon: &str) -> Observation {
        Observation::WithCoords {
            country: cc.into(),
            coords: Coordinates::parse(lat, lon).unwrap(),
        }
    }

    fn plain(cc: &str) -> Observation {
        Observation::CountryOnly { country: cc.into() }
    }

    fn merge_config(coord: &[&str], vote: &[&str]) -> MergeConfig {
        MergeConfig {
            coord_priority: coord.iter().map(|s| s.to_string()).collect(),
            vote_priority: vote.iter().map(|s| s.to_string()).collect(),
            ..MergeConfig::default()
        }
    }

    fn segment(start: Address, end: Address, cc: &str, lat: &str, lon: &str) -> Segment {
        Segment {
            start,
            end,
            country: cc.into(),
            coords: Coordinates::parse(lat, lon).unwrap(),
            provenance: Provenance::NoCoords,
        }
    }

    fn rows(table: &MergedTable) -> Vec<String> {
        table
            .segments
            .iter()
            .map(|s| format!("{:x}-{:x} {} {} {}", s.start, s.end, s.country, s.coords.lat, s.coords.lon))
            .collect()
    }

    #[test]
    fn test_single_country_source_without_coordinates() {
        let sources = [source("rir", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("US"))])];
        let config = merge_config(&[], &[]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(rows(&out), vec!["100-1ff US 0 0"]);
        assert_eq!(out.segments[0].provenance, Provenance::NoCoords);
        assert_eq!(out.stats.decisions.get(&ProvenanceKind::NoCoords), Some(&1));
    }

    #[test]
    fn test_two_agreeing_coordinate_sources_use_priority() {
        let sources = [
            source("source1", SourceRole::LatLong, &[(0x100, 0x1ff, located("FR", "48.8", "2.3"))]),
            source("source2", SourceRole::LatLong, &[(0x100, 0x1ff, located("FR", "48.9", "2.4"))]),
        ];
        let config = merge_config(&["source1", "source2"], &[]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(rows(&out), vec!["100-1ff FR 48.8 2.3"]);
        assert_eq!(out.segments[0].provenance.to_string(), "unanimous->source1");
    }

    #[test]
    fn test_override_rule_through_engine() {
        let sources = [
            source("geo", SourceRole::LatLong, &[(0x100, 0x1ff, located("JP", "35.6", "139.7"))]),
            source("X", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("JP"))]),
            source("Y", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("JP"))]),
            source("Z1", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("CN"))]),
            source("Z2", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("CN"))]),
            source("Z3", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("CN"))]),
        ];
        let config = MergeConfig {
            overrides: vec![OverrideRule { sources: vec!["X".into(), "Y".into()] }],
            ..merge_config(&["geo"], &[])
        };
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].country, "JP");
        assert!(out.segments[0].provenance.to_string().starts_with("X+Y->"));
    }

    #[test]
    fn test_vote_tie_through_engine() {
        let sources = [
            source("g1", SourceRole::LatLong, &[(0x100, 0x1ff, located("FR", "48.8", "2.3"))]),
            source("g2", SourceRole::LatLong, &[(0x100, 0x1ff, located("DE", "52.5", "13.4"))]),
            source("rir", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("DE"))]),
            source("lir", SourceRole::CountryOnly, &[(0x100, 0x1ff, plain("FR"))]),
        ];
        let config = merge_config(&["g1", "g2"], &["rir"]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(rows(&out), vec!["100-1ff DE 52.5 13.4"]);
        assert!(out.segments[0].provenance.to_string().starts_with("vote->"));
    }

    #[test]
    fn test_overlapping_sources_split_and_recoalesce() {
        // geo covers 0x100-0x2ff; rir disagrees only on 0x180-0x1ff.
        let sources = [
            source("geo", SourceRole::LatLong, &[(0x100, 0x2ff, located("FR", "48.8", "2.3"))]),
            source("rir", SourceRole::CountryOnly, &[
                (0x100, 0x17f, plain("FR")),
                (0x180, 0x1ff, plain("BE")),
                (0x200, 0x2ff, plain("FR")),
            ]),
        ];
        let config = merge_config(&["geo"], &["rir"]);
        let out = MergeEngine::new(&sources, &config).run();
        // BE ties FR 1-1; rir prefers BE but no coordinates exist for BE, so FR wins
        // everywhere and the three pieces fold back into one.
        assert_eq!(rows(&out), vec!["100-2ff FR 48.8 2.3"]);
        assert_eq!(out.stats.decided_segments, 3);
        assert_eq!(out.stats.merged_segments, 1);
    }

    #[test]
    fn test_gaps_are_skipped_and_not_bridged() {
        let sources = [source("rir", SourceRole::CountryOnly, &[
            (0x100, 0x1ff, plain("US")),
            (0x300, 0x3ff, plain("US")),
        ])];
        let config = merge_config(&[], &[]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.stats.uncovered_segments, 1);
        assert_eq!((out.segments[1].start, out.segments[1].end), (0x300, 0x3ff));
    }

    #[test]
    fn test_disagreeing_neighbours_stay_separate() {
        let sources = [source("geo", SourceRole::LatLong, &[
            (0x100, 0x1ff, located("FR", "48.8", "2.3")),
            (0x200, 0x2ff, located("FR", "43.3", "5.4")),
        ])];
        let config = merge_config(&["geo"], &[]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(out.segments.len(), 2);
    }

    #[test]
    fn test_segment_at_top_of_ipv6_axis() {
        let sources = [source("rir", SourceRole::CountryOnly, &[(Address::MAX - 0xff, Address::MAX, plain("ZZ"))])];
        let config = merge_config(&[], &[]);
        let out = MergeEngine::new(&sources, &config).run();
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].end, Address::MAX);
    }

    #[test]
    fn test_no_sources_gives_empty_table() {
        let config = merge_config(&[], &[]);
        let out = MergeEngine::new(&[], &config).run();
        assert!(out.segments.is_empty());
        assert_eq!(out.stats.candidate_segments, 0);
    }

    #[test]
    fn test_run_is_deterministic() {
        let build = || {
            [
                source("g1", SourceRole::LatLong, &[
                    (0x000, 0x0ff, located("FR", "48.8", "2.3")),
                    (0x100, 0x2ff, located("DE", "52.5", "13.4")),
                ]),
                source("g2", SourceRole::LatLong, &[(0x080, 0x17f, located("NL", "52.3", "4.9"))]),
                source("rir", SourceRole::CountryOnly, &[(0x000, 0x3ff, plain("NL"))]),
            ]
        };
        let config = merge_config(&["g1", "g2"], &["rir"]);
        let first = build();
        let second = build();
        let a = MergeEngine::new(&first, &config).run();
        let b = MergeEngine::new(&second, &config).run();
        assert_eq!(a.segments, b.segments);
    }

    #[test]
    fn test_explain_reports_every_source() {
        let sources = [
            source("geo", SourceRole::LatLong, &[(0x100, 0x1ff, located("FR", "48.8", "2.3"))]),
            source("rir", SourceRole::CountryOnly, &[(0x200, 0x2ff, plain("DE"))]),
        ];
        let config = merge_config(&["geo"], &[]);
        let engine = MergeEngine::new(&sources, &config);

        let hit = engine.explain(0x150);
        assert_eq!(hit.address, "150");
        assert_eq!(hit.readings.len(), 2);
        assert!(hit.readings[1].observation.is_none());
        assert_eq!(hit.decision.unwrap().provenance.to_string(), "vote->geo");

        let miss = engine.explain(0x500);
        assert!(miss.decision.is_none());
    }

    #[test]
    fn test_coalesce_requires_contiguity_and_equal_value() {
        let merged = coalesce(vec![
            segment(0, 9, "US", "1", "1"),
            segment(10, 19, "US", "1", "1"),
            segment(21, 29, "US", "1", "1"),
            segment(30, 39, "US", "1", "2"),
            segment(40, 49, "CA", "1", "2"),
        ]);
        let spans: Vec<(Address, Address)> = merged.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 19), (21, 29), (30, 39), (40, 49)]);
    }

    #[test]
    fn test_coalesce_compares_coordinate_text() {
        let merged = coalesce(vec![segment(0, 9, "US", "1.0", "1"), segment(10, 19, "US", "1", "1")]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_coalesce_keeps_first_provenance() {
        let mut second = segment(10, 19, "US", "1", "1");
        second.provenance = Provenance::Vote { source: "b".into() };
        let merged = coalesce(vec![segment(0, 9, "US", "1", "1"), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].provenance, Provenance::NoCoords);
    }
}
