//! Sorted range table with a forward-only sweep cursor.
//!
//! Records are appended unsorted through [`RangeTableBuilder`] and become
//! queryable only after [`RangeTableBuilder::finalize`]. Lookups go through
//! an explicit [`Cursor`] owned by the caller, which may only move forward:
//! successive `sweep` calls with the same cursor must use non-decreasing
//! points. Breaking that contract gives wrong answers, not an error.

use super::types::Observation;
use crate::address::Address;

/// One source range. `end` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    pub start: Address,
    pub end: Address,
    pub payload: Observation,
}

/// Accumulates records before sorting.
#[derive(Debug, Default)]
pub struct RangeTableBuilder {
    records: Vec<Record>,
}

impl RangeTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Nothing is validated here.
    pub fn add(&mut self, start: Address, end: Address, payload: Observation) {
        self.records.push(Record { start, end, payload });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort by `(start, end, payload)` and count overlapping neighbours.
    ///
    /// Overlaps are reported, never repaired.
    pub fn finalize(mut self, name: &str) -> RangeTable {
        self.records.sort_unstable();

        let overlaps = self
            .records
            .windows(2)
            .filter(|pair| pair[1].start <= pair[0].end)
            .count();
        if overlaps > 0 {
            tracing::warn!(source = name, overlaps, "source has overlapping ranges");
        }

        RangeTable {
            records: self.records,
            overlaps,
        }
    }
}

/// Position of a forward-only sweep through one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
}

impl Cursor {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A point just past a record, as contributed to the boundary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Point(Address),
    /// The record ends at the very top of the 128-bit axis.
    PastTop,
}

/// Finalized, immutable range table.
#[derive(Debug, Default)]
pub struct RangeTable {
    records: Vec<Record>,
    overlaps: usize,
}

impl RangeTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::default()
    }

    /// Payload of the record containing `point`, advancing `cursor`.
    pub fn sweep(&self, cursor: &mut Cursor, point: Address) -> Option<&Observation> {
        let mut c = cursor.index;
        while c < self.records.len() && self.records[c].end < point {
            c += 1;
        }
        cursor.index = c;

        match self.records.get(c) {
            Some(record) if record.start <= point => Some(&record.payload),
            _ => None,
        }
    }

    /// Every record's start and the point just past its end.
    pub fn boundaries(&self) -> impl Iterator<Item = Boundary> + '_ {
        self.records.iter().flat_map(|r| {
            let past_end = match r.end.checked_add(1) {
                Some(p) => Boundary::Point(p),
                None => Boundary::PastTop,
            };
            [Boundary::Point(r.start), past_end]
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adjacent pairs found overlapping at finalize time.
    pub fn overlaps(&self) -> usize {
        self.overlaps
    }
}
