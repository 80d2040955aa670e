//! Global boundary index: the union of every table's endpoints.

use super::table::{Boundary, RangeTable};
use crate::address::Address;

/// Sorted, deduplicated boundary points across all tables.
#[derive(Debug, Default)]
pub struct BoundaryIndex {
    points: Vec<Address>,
    reaches_top: bool,
}

impl BoundaryIndex {
    pub fn build<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a RangeTable>,
    {
        let mut points = Vec::new();
        let mut reaches_top = false;
        for table in tables {
            for boundary in table.boundaries() {
                match boundary {
                    Boundary::Point(p) => points.push(p),
                    Boundary::PastTop => reaches_top = true,
                }
            }
        }
        points.sort_unstable();
        points.dedup();
        Self { points, reaches_top }
    }

    pub fn points(&self) -> &[Address] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Candidate segments `[points[i], points[i + 1] - 1]` in ascending order,
    /// plus `[last, Address::MAX]` when some record ends at the top of the axis.
    pub fn segments(&self) -> impl Iterator<Item = (Address, Address)> + '_ {
        let top = match (self.reaches_top, self.points.last()) {
            (true, Some(&last)) => Some((last, Address::MAX)),
            _ => None,
        };
        self.points
            .windows(2)
            .map(|w| (w[0], w[1] - 1))
            .chain(top)
    }

    /// Number of candidate segments `segments()` will yield.
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1) + usize::from(self.reaches_top && !self.points.is_empty())
    }
}
