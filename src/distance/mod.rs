pub mod matrix;
pub mod providers;

pub use matrix::{create_segment_table, SegmentSource};
