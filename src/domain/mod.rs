pub mod registry;
pub mod types;

pub use registry::LocationRegistry;
pub use types::*;
