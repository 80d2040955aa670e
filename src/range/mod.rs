//! Range tables and the boundary index built over them.

pub mod boundary;
pub mod table;
pub mod types;

pub use boundary::BoundaryIndex;
pub use table::{Boundary, Cursor, RangeTable, RangeTableBuilder, Record};
pub use types::{Coordinates, Degrees, Observation, SourceRole};
