use std::time::Instant;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, span, trace, Level};

use crate::config::Metaheuristic;
use crate::solver::adapter::{CombinatorialSolver, SearchParameters};
use crate::solver::cost_matrix::CostMatrix;

use super::construction::path_cheapest_arc;
use super::neighbourhood::{find_neighbours, tour_cost, Move};
use super::penalties::ArcPenalties;

const TIE_TOLERANCE: f64 = 1e-9;

/// Single-vehicle tour search: cheapest-arc construction, best-improvement
/// descent over relocate / swap / 2-opt, then guided local search on arc
/// penalties until the time limit or iteration cap is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedLocalSearch;

impl GuidedLocalSearch {
    pub fn new() -> Self {
        Self
    }
}

struct SearchState {
    depot: usize,
    order: Vec<usize>,
    best_order: Vec<usize>,
    best_cost: u64,
    best_iteration: usize,
    best_so_far_updates: Vec<(usize, u64)>,
    penalties: ArcPenalties,
    rng: ChaCha8Rng,
}

impl SearchState {
    fn new(order: Vec<usize>, depot: usize, matrix: &CostMatrix, seed: u64) -> Self {
        let best_cost = order_cost(matrix, depot, &order);
        Self {
            depot,
            best_order: order.clone(),
            order,
            best_cost,
            best_iteration: 0,
            best_so_far_updates: vec![(0, best_cost)],
            penalties: ArcPenalties::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn tour(&self, order: &[usize]) -> Vec<usize> {
        let mut tour = Vec::with_capacity(order.len() + 2);
        tour.push(self.depot);
        tour.extend_from_slice(order);
        tour.push(self.depot);
        tour
    }

    /// Best-improvement descent on the penalized objective. Returns `false`
    /// if the deadline cut it short.
    fn descend(&mut self, matrix: &CostMatrix, deadline: Instant, iteration: usize) -> bool {
        let penalties = &self.penalties;
        let arc = |i: usize, j: usize| penalties.augmented(matrix, i, j);
        let mut current = tour_cost(&self.order, self.depot, &arc);

        loop {
            if Instant::now() >= deadline {
                return false;
            }

            let scored = find_neighbours(&self.order, self.depot, &arc);
            let Some(&(best, _)) = scored.first() else {
                return true;
            };
            if best + TIE_TOLERANCE >= current {
                return true;
            }

            let ties: Vec<Move> = scored
                .iter()
                .take_while(|(cost, _)| *cost <= best + TIE_TOLERANCE)
                .map(|(_, mv)| *mv)
                .collect();
            let Some(chosen) = ties.choose(&mut self.rng).copied() else {
                return true;
            };

            trace!("apply {:?}: {:.2} -> {:.2}", chosen, current, best);
            self.order = chosen.apply(&self.order);
            current = best;

            let raw = order_cost(matrix, self.depot, &self.order);
            if raw < self.best_cost {
                self.best_cost = raw;
                self.best_order = self.order.clone();
                self.best_iteration = iteration;
                self.best_so_far_updates.push((iteration, raw));
                debug!("New best at iteration {}: cost = {}", iteration, raw);
            }
        }
    }
}

fn order_cost(matrix: &CostMatrix, depot: usize, order: &[usize]) -> u64 {
    let mut previous = depot;
    let mut total = 0u64;
    for &node in order {
        total = total.saturating_add(matrix.get(previous, node));
        previous = node;
    }
    total.saturating_add(matrix.get(previous, depot))
}

impl CombinatorialSolver for GuidedLocalSearch {
    fn name(&self) -> &str {
        "guided_local_search"
    }

    fn solve(
        &self,
        matrix: &CostMatrix,
        depot: usize,
        params: &SearchParameters,
    ) -> Option<Vec<usize>> {
        let n = matrix.size();
        if n == 0 || depot >= n {
            return None;
        }
        if n == 1 {
            return Some(vec![depot, depot]);
        }
        if n == 2 {
            // a single feasible tour
            return Some(vec![depot, 1 - depot, depot]);
        }

        let started = Instant::now();
        let deadline = started + params.time_limit;

        let initial = path_cheapest_arc(matrix, depot);
        if initial.len() + 1 != n {
            return None;
        }
        let mut state = SearchState::new(initial, depot, matrix, params.seed);
        info!("First solution cost {}", state.best_cost);

        if params.time_limit.is_zero() {
            return Some(state.tour(&state.best_order));
        }

        state.descend(matrix, deadline, 0);
        if params.metaheuristic == Metaheuristic::None {
            return Some(state.tour(&state.best_order));
        }

        state.penalties.set_lambda(state.best_cost, n);
        debug!("GLS lambda = {:.4}", state.penalties.lambda());

        let loop_span = span!(Level::DEBUG, "gls_loop");
        let _loop_guard = loop_span.enter();

        let within_cap =
            |iteration: usize| params.max_iterations.map_or(true, |max| iteration < max);
        let mut iteration = 0;
        while Instant::now() < deadline && within_cap(iteration) {
            if state.order.len() < 2 {
                break;
            }
            iteration += 1;
            let current_tour = state.tour(&state.order);
            let penalized = state.penalties.penalize(matrix, &current_tour);
            trace!("iteration {}: penalized {:?}", iteration, penalized);

            if !state.descend(matrix, deadline, iteration) {
                break;
            }
        }

        info!(
            "GLS finished after {} iterations in {:?}; best {} at iteration {} ({} improvements)",
            iteration,
            started.elapsed(),
            state.best_cost,
            state.best_iteration,
            state.best_so_far_updates.len() - 1
        );
        Some(state.tour(&state.best_order))
    }
}
