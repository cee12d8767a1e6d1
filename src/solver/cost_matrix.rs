use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::types::{MassPolicy, ProblemInstance};
use crate::error::Result;
use crate::evaluation::mass::MassAccumulator;
use crate::evaluation::segment_cost::SegmentCostModel;

/// Static, order-independent arc costs handed to the combinatorial solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    costs: Vec<Vec<u64>>,
    /// Amount added to every raw entry before truncation (0 unless a negative was seen).
    shift: u64,
}

impl CostMatrix {
    /// Shift by `|min|` only when a negative entry is present, then truncate to integers.
    pub fn from_raw(raw: Vec<Vec<f64>>) -> Self {
        let min_value = raw
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let shift = if min_value < 0.0 { min_value.abs() } else { 0.0 };
        if shift > 0.0 {
            debug!("Shifting cost matrix by {:.2} to remove negative entries", shift);
        }

        let costs = raw
            .into_iter()
            .map(|row| row.into_iter().map(|c| (c + shift) as u64).collect())
            .collect();

        Self {
            costs,
            shift: shift as u64,
        }
    }

    pub fn size(&self) -> usize {
        self.costs.len()
    }

    pub fn get(&self, from: usize, to: usize) -> u64 {
        self.costs[from][to]
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.costs
    }

    pub fn shift(&self) -> u64 {
        self.shift
    }

    /// Sum of arc costs along consecutive nodes of `tour`.
    pub fn tour_cost(&self, tour: &[usize]) -> u64 {
        tour.windows(2)
            .fold(0u64, |acc, w| acc.saturating_add(self.get(w[0], w[1])))
    }
}

/// Builds the surrogate matrix: every arc charged with its single-segment
/// representative mass, plus structural arcs that turn the cycle into a
/// Hamiltonian path from the depot (index 0) to the last stop.
pub struct CostMatrixBuilder<'a> {
    instance: &'a ProblemInstance,
    policy: MassPolicy,
    empty_mass_kg: f64,
    sentinel_cost: u64,
    model: SegmentCostModel,
}

impl<'a> CostMatrixBuilder<'a> {
    pub fn new(
        instance: &'a ProblemInstance,
        policy: MassPolicy,
        empty_mass_kg: f64,
        sentinel_cost: u64,
    ) -> Self {
        Self {
            instance,
            policy,
            empty_mass_kg,
            sentinel_cost,
            model: SegmentCostModel::default(),
        }
    }

    /// Raw cost of the ordinary arc `from -> to`: theoretical work plus `w_ext`.
    fn arc_cost(&self, from: usize, to: usize, w_ext: f64) -> Result<f64> {
        let segment = self.instance.segment(from, to)?;
        let start = self.instance.location(from)?;
        let end = self.instance.location(to)?;
        let mass = MassAccumulator::representative(self.empty_mass_kg, start);
        let work = self.model.cost(self.policy, &segment, start, end, mass);
        Ok(work.work_j + w_ext)
    }

    pub fn build(&self, w_ext: f64) -> Result<CostMatrix> {
        let n = self.instance.len();
        let start_index = 0;
        let last_index = n.saturating_sub(1);
        info!("Building {}x{} cost matrix ({:?})", n, n, self.policy);

        let mut raw: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j || j == start_index {
                            Ok(0.0)
                        } else {
                            self.arc_cost(i, j, w_ext)
                        }
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let sentinel = self.sentinel_for(&raw);
        for (i, row) in raw.iter_mut().enumerate() {
            if i == start_index {
                continue;
            }
            row[start_index] = if i == last_index { 0.0 } else { sentinel };
        }

        Ok(CostMatrix::from_raw(raw))
    }

    /// The configured sentinel, raised if a full path of ordinary arcs could reach it.
    fn sentinel_for(&self, raw: &[Vec<f64>]) -> f64 {
        let max_arc = raw
            .iter()
            .flatten()
            .copied()
            .fold(0.0_f64, f64::max);
        let floor = (max_arc * raw.len() as f64).ceil() + 1.0;
        let configured = self.sentinel_cost as f64;
        if floor > configured {
            warn!(
                "Sentinel cost {} too small for max arc {:.0}; raising to {:.0}",
                self.sentinel_cost, max_arc, floor
            );
            floor
        } else {
            configured
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constant::SENTINEL_COST;
    use crate::domain::types::{Location, SegmentTable};
    use crate::error::RouteError;

    fn instance(n: usize) -> ProblemInstance {
        let km: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| (i as f64 - j as f64).abs() * 5.0).collect())
            .collect();
        let hours = vec![vec![0.5; n]; n];
        let locations = (0..n)
            .map(|i| Location::new(format!("s{i}"), (i as i32) * 7, 10.0 * i as f64))
            .collect();
        ProblemInstance::new(locations, SegmentTable::from_km_hours(&km, &hours))
    }

    #[test]
    fn structural_edges_force_a_path_ending_at_last_stop() {
        let instance = instance(5);
        let matrix =
            CostMatrixBuilder::new(&instance, MassPolicy::PerSegment, 1000.0, SENTINEL_COST)
                .build(0.0)
                .unwrap();

        assert_eq!(matrix.get(4, 0), 0);
        for i in 1..4 {
            assert_eq!(matrix.get(i, 0), SENTINEL_COST);
        }
        for i in 0..5 {
            assert_eq!(matrix.get(i, i), 0);
        }
        assert_eq!(matrix.shift(), 0);
    }

    #[test]
    fn ordinary_arcs_use_representative_mass() {
        let instance = instance(3);
        let empty = 1000.0;
        let policy = MassPolicy::CumulativeWithResets;
        let matrix = CostMatrixBuilder::new(&instance, policy, empty, SENTINEL_COST)
            .build(0.0)
            .unwrap();

        // 1 -> 2: 5 km in 0.5 h, climbing 7 m, carrying empty + 10 kg
        let mass = empty + 10.0;
        let v: f64 = 5000.0 / 1800.0;
        let expected = 0.5 * mass * v * v + mass * 9.81 * 7.0;
        assert!((matrix.get(1, 2) as f64 - expected).abs() <= 1.0);

        // 2 -> 1 descends: clamped to kinetic energy
        let mass = empty + 20.0;
        assert!((matrix.get(2, 1) as f64 - 0.5 * mass * v * v).abs() <= 1.0);
    }

    #[test]
    fn external_work_shifts_only_ordinary_arcs() {
        let instance = instance(4);
        let builder =
            CostMatrixBuilder::new(&instance, MassPolicy::PerSegment, 1000.0, SENTINEL_COST);
        let plain = builder.build(0.0).unwrap();
        let shifted = builder.build(500.0).unwrap();
        assert_eq!(shifted.get(1, 2), plain.get(1, 2) + 500);
        assert_eq!(shifted.get(3, 0), 0);
        assert_eq!(shifted.get(2, 0), SENTINEL_COST);
    }

    #[test]
    fn entries_are_never_negative() {
        let matrix = CostMatrix::from_raw(vec![vec![0.0, -4.5], vec![3.2, 0.0]]);
        assert_eq!(matrix.shift(), 4);
        assert_eq!(matrix.get(0, 1), 0);
        assert_eq!(matrix.get(0, 0), 4);
        assert_eq!(matrix.get(1, 0), 7);
    }

    #[test]
    fn non_negative_matrices_are_not_shifted() {
        let matrix = CostMatrix::from_raw(vec![vec![0.0, 2.9], vec![1.1, 0.0]]);
        assert_eq!(matrix.shift(), 0);
        assert_eq!(matrix.get(0, 1), 2);
        assert_eq!(matrix.get(1, 0), 1);
    }

    #[test]
    fn small_sentinel_is_raised_above_any_path() {
        let instance = instance(4);
        let matrix = CostMatrixBuilder::new(&instance, MassPolicy::DistanceOnly, 0.0, 10)
            .build(0.0)
            .unwrap();
        let max_arc = (1..4)
            .flat_map(|i| (1..4).map(move |j| (i, j)))
            .map(|(i, j)| matrix.get(i, j))
            .chain((1..4).map(|j| matrix.get(0, j)))
            .max()
            .unwrap();
        assert!(matrix.get(1, 0) > 4 * max_arc);
    }

    #[test]
    fn missing_segment_aborts_the_build() {
        let mut instance = instance(3);
        instance.segments.remove(1, 2);
        let result = CostMatrixBuilder::new(&instance, MassPolicy::PerSegment, 0.0, SENTINEL_COST)
            .build(0.0);
        assert!(matches!(result, Err(RouteError::MissingSegmentData { .. })));
    }
}
