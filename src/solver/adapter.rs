use std::time::{Duration, Instant};

use tracing::{error, info, span, Level};

use crate::config::{Metaheuristic, SolverConfig};
use crate::error::{Result, RouteError};
use crate::solver::cost_matrix::CostMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstSolutionStrategy {
    /// Start at the depot and keep following the cheapest arc to an unvisited node.
    PathCheapestArc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    pub first_solution: FirstSolutionStrategy,
    pub metaheuristic: Metaheuristic,
    pub time_limit: Duration,
    pub max_iterations: Option<usize>,
    pub seed: u64,
}

impl From<&SolverConfig> for SearchParameters {
    fn from(config: &SolverConfig) -> Self {
        Self {
            first_solution: FirstSolutionStrategy::PathCheapestArc,
            metaheuristic: config.metaheuristic,
            time_limit: config.time_limit,
            max_iterations: config.max_iterations,
            seed: config.seed,
        }
    }
}

/// A solver for single-vehicle tours over a static integer cost matrix.
///
/// Returns the visiting order starting and ending at `depot`, or `None` when
/// nothing feasible was found within the parameters.
pub trait CombinatorialSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(
        &self,
        matrix: &CostMatrix,
        depot: usize,
        params: &SearchParameters,
    ) -> Option<Vec<usize>>;
}

/// Translation layer between the pipeline and a [`CombinatorialSolver`].
pub struct SolverAdapter<S> {
    solver: S,
    params: SearchParameters,
}

impl<S: CombinatorialSolver> SolverAdapter<S> {
    pub fn new(solver: S, params: SearchParameters) -> Self {
        Self { solver, params }
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solve(&self, matrix: &CostMatrix, depot: usize) -> Result<Vec<usize>> {
        let solve_span = span!(Level::INFO, "solve", solver = self.solver.name());
        let _guard = solve_span.enter();

        info!(
            "Solving {} nodes with {:?} + {:?} (time limit {:?})",
            matrix.size(),
            self.params.first_solution,
            self.params.metaheuristic,
            self.params.time_limit
        );
        let started = Instant::now();
        let tour = self
            .solver
            .solve(matrix, depot, &self.params)
            .ok_or_else(|| {
                error!("{} returned no solution", self.solver.name());
                RouteError::SolverNoSolution {
                    time_limit: self.params.time_limit,
                }
            })?;

        validate_tour(&tour, matrix.size(), depot)?;
        info!(
            "Solver objective {} after {:?}: {:?}",
            matrix.tour_cost(&tour),
            started.elapsed(),
            tour
        );
        Ok(tour)
    }
}

/// A tour must visit every node exactly once and close at the depot.
fn validate_tour(tour: &[usize], n: usize, depot: usize) -> Result<()> {
    if tour.len() != n + 1 || tour.first() != Some(&depot) || tour.last() != Some(&depot) {
        return Err(RouteError::InvalidRoute(format!(
            "solver tour {:?} is not a closed tour from depot {} over {} nodes",
            tour, depot, n
        )));
    }
    let mut seen = vec![false; n];
    for &node in &tour[..n] {
        if node >= n || seen[node] {
            return Err(RouteError::InvalidRoute(format!(
                "solver tour {:?} repeats or misses node {}",
                tour, node
            )));
        }
        seen[node] = true;
    }
    Ok(())
}
