pub mod assembler;
pub mod optimize;
pub mod runner;

pub use assembler::RouteAssembler;
pub use optimize::{CostComparison, OptimizeRequest, OptimizeResponse, RouteOptimizer};
