pub mod construction;
pub mod neighbourhood;
pub mod penalties;
pub mod search;

pub use search::GuidedLocalSearch;
