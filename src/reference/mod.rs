pub mod csv;

pub use self::csv::{load_registry, load_segment_table, load_stops};
