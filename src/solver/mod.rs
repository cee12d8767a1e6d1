pub mod adapter;
pub mod cost_matrix;
pub mod guided_local_search;

pub use adapter::{CombinatorialSolver, FirstSolutionStrategy, SearchParameters, SolverAdapter};
pub use cost_matrix::{CostMatrix, CostMatrixBuilder};
pub use guided_local_search::GuidedLocalSearch;
