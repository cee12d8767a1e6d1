pub mod osrm;

pub use osrm::{parse_osrm_table, OsrmProvider};
