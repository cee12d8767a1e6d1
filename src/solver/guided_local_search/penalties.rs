use std::collections::HashMap;

use crate::solver::cost_matrix::CostMatrix;

/// Penalty counts on arc features plus the weight that turns them into cost.
#[derive(Debug, Clone, Default)]
pub struct ArcPenalties {
    counts: HashMap<(usize, usize), u32>,
    lambda: f64,
}

impl ArcPenalties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Fix the penalty weight from the first local optimum: `0.1 * cost / n`.
    pub fn set_lambda(&mut self, local_optimum_cost: u64, n: usize) {
        if n > 0 {
            self.lambda = 0.1 * local_optimum_cost as f64 / n as f64;
        }
    }

    pub fn count(&self, from: usize, to: usize) -> u32 {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    pub fn augmented(&self, matrix: &CostMatrix, from: usize, to: usize) -> f64 {
        matrix.get(from, to) as f64 + self.lambda * self.count(from, to) as f64
    }

    /// Penalize every arc of `tour` with maximal utility `cost / (1 + penalty)`.
    /// Returns the arcs that were penalized.
    pub fn penalize(&mut self, matrix: &CostMatrix, tour: &[usize]) -> Vec<(usize, usize)> {
        let utilities: Vec<((usize, usize), f64)> = tour
            .windows(2)
            .map(|w| {
                let arc = (w[0], w[1]);
                let penalty = self.count(arc.0, arc.1) as f64;
                let utility = matrix.get(arc.0, arc.1) as f64 / (1.0 + penalty);
                (arc, utility)
            })
            .collect();

        let max_utility = utilities
            .iter()
            .map(|(_, u)| *u)
            .fold(f64::NEG_INFINITY, f64::max);

        let chosen: Vec<(usize, usize)> = utilities
            .into_iter()
            .filter(|(_, u)| *u >= max_utility)
            .map(|(arc, _)| arc)
            .collect();

        for arc in &chosen {
            *self.counts.entry(*arc).or_insert(0) += 1;
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> CostMatrix {
        CostMatrix::from_raw(vec![
            vec![0.0, 10.0, 4.0],
            vec![10.0, 0.0, 10.0],
            vec![4.0, 10.0, 0.0],
        ])
    }

    #[test]
    fn lambda_scales_with_local_optimum() {
        let mut penalties = ArcPenalties::new();
        penalties.set_lambda(300, 3);
        assert!((penalties.lambda() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn most_useful_arcs_are_penalized_together() {
        let matrix = matrix();
        let mut penalties = ArcPenalties::new();
        penalties.set_lambda(24, 3);

        let chosen = penalties.penalize(&matrix, &[0, 1, 2, 0]);
        assert_eq!(chosen, vec![(0, 1), (1, 2)]);
        assert_eq!(penalties.count(0, 1), 1);
        assert_eq!(penalties.count(2, 0), 0);
        assert!((penalties.augmented(&matrix, 0, 1) - 10.8).abs() < 1e-9);

        // utilities now 5, 5, 4: the same two arcs again
        let chosen = penalties.penalize(&matrix, &[0, 1, 2, 0]);
        assert_eq!(chosen, vec![(0, 1), (1, 2)]);
        // utilities now 3.33, 3.33, 4
        let chosen = penalties.penalize(&matrix, &[0, 1, 2, 0]);
        assert_eq!(chosen, vec![(2, 0)]);
    }
}
