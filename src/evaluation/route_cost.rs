use itertools::Itertools;
use tracing::{debug, trace};

use crate::domain::types::{MassPolicy, ProblemInstance, RoleMap, Route, WorkRecord};
use crate::error::Result;
use crate::evaluation::mass::MassAccumulator;
use crate::evaluation::segment_cost::SegmentCostModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostUnit {
    Joules,
    Meters,
}

impl From<MassPolicy> for CostUnit {
    fn from(policy: MassPolicy) -> Self {
        match policy {
            MassPolicy::DistanceOnly => CostUnit::Meters,
            MassPolicy::PerSegment | MassPolicy::CumulativeWithResets => CostUnit::Joules,
        }
    }
}

/// True, order-dependent cost of one route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCost {
    pub total_theoretical: f64,
    pub w_ext: f64,
    pub records: Vec<WorkRecord>,
    pub unit: CostUnit,
}

impl RouteCost {
    /// Theoretical total plus the external work constant, added once per route.
    pub fn total(&self) -> f64 {
        self.total_theoretical + self.w_ext
    }
}

pub struct RouteCostEvaluator<'a> {
    instance: &'a ProblemInstance,
    roles: &'a RoleMap,
    policy: MassPolicy,
    empty_mass_kg: f64,
    model: SegmentCostModel,
}

impl<'a> RouteCostEvaluator<'a> {
    pub fn new(
        instance: &'a ProblemInstance,
        roles: &'a RoleMap,
        policy: MassPolicy,
        empty_mass_kg: f64,
    ) -> Self {
        Self {
            instance,
            roles,
            policy,
            empty_mass_kg,
            model: SegmentCostModel::default(),
        }
    }

    pub fn distance_km(&self, route: &Route) -> Result<f64> {
        route
            .nodes()
            .iter()
            .tuple_windows()
            .map(|(&from, &to)| self.instance.segment(from, to).map(|s| s.distance_km))
            .sum()
    }

    /// Walk `route` segment by segment. Any missing segment or non-positive
    /// duration aborts the walk; no partial cost is returned.
    pub fn evaluate(&self, route: &Route, w_ext: f64) -> Result<RouteCost> {
        let mut mass = MassAccumulator::new(self.policy, self.empty_mass_kg, self.roles);
        let mut records = Vec::with_capacity(route.segment_count());
        let mut total_theoretical = 0.0;

        for (position, (&from, &to)) in route.nodes().iter().tuple_windows().enumerate() {
            let segment = self.instance.segment(from, to)?;
            let start = self.instance.location(from)?;
            let end = self.instance.location(to)?;

            let carried = mass.charge(start, position == 0);
            let work = self.model.cost(self.policy, &segment, start, end, carried);
            trace!(
                "{} -> {}: mass {:.1} kg, v {:.2} m/s, dh {} m, W {:.1}",
                start.id,
                end.id,
                carried,
                work.v_avg_mps,
                work.delta_h_m,
                work.work_j
            );

            total_theoretical += work.work_j;
            records.push(WorkRecord {
                start: start.id.clone(),
                end: end.id.clone(),
                segment_mass_kg: mass.added(),
                cumulative_mass_kg: carried,
                v_avg_mps: work.v_avg_mps,
                delta_h_m: work.delta_h_m,
                theoretical_work: work.work_j,
                actual_work: (w_ext != 0.0).then_some(work.work_j + w_ext),
            });
        }

        debug!(
            "Evaluated route {:?}: theoretical {:.2}, w_ext {:.2}",
            route.nodes(),
            total_theoretical,
            w_ext
        );

        Ok(RouteCost {
            total_theoretical,
            w_ext,
            records,
            unit: self.policy.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Location, LocationRole, Segment, SegmentTable};
    use crate::error::RouteError;

    fn instance() -> ProblemInstance {
        let km = vec![
            vec![0.0, 10.0, 20.0],
            vec![10.0, 0.0, 15.0],
            vec![20.0, 15.0, 0.0],
        ];
        let hours = vec![vec![1.0; 3]; 3];
        ProblemInstance::new(
            vec![
                Location::new("a", 0, 50.0),
                Location::new("b", 0, 50.0),
                Location::new("c", 0, 30.0),
            ],
            SegmentTable::from_km_hours(&km, &hours),
        )
    }

    fn kinetic(mass: f64, km: f64) -> f64 {
        let v = km * 1000.0 / 3600.0;
        0.5 * mass * v * v
    }

    #[test]
    fn cumulative_mass_drives_route_work() {
        let instance = instance();
        let roles = RoleMap::new();
        let eval =
            RouteCostEvaluator::new(&instance, &roles, MassPolicy::CumulativeWithResets, 100.0);
        let cost = eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 0.0).unwrap();

        let expected = kinetic(150.0, 10.0) + kinetic(200.0, 15.0) + kinetic(230.0, 20.0);
        assert!((cost.total_theoretical - expected).abs() < 1e-6);
        assert_eq!(cost.total(), cost.total_theoretical);
        let masses: Vec<f64> = cost.records.iter().map(|r| r.cumulative_mass_kg).collect();
        assert_eq!(masses, vec![150.0, 200.0, 230.0]);
        assert!(cost.records.iter().all(|r| r.actual_work.is_none()));
    }

    #[test]
    fn disposal_site_empties_the_vehicle() {
        let instance = instance();
        let roles = RoleMap::new()
            .with("a", LocationRole::OriginDepot)
            .with("b", LocationRole::DisposalSite);
        let eval =
            RouteCostEvaluator::new(&instance, &roles, MassPolicy::CumulativeWithResets, 100.0);

        let round_trip = eval.evaluate(&Route::new(vec![0, 1, 0]).unwrap(), 0.0).unwrap();
        let masses: Vec<f64> = round_trip.records.iter().map(|r| r.cumulative_mass_kg).collect();
        assert_eq!(masses, vec![150.0, 100.0]);

        let cost = eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 0.0).unwrap();
        let masses: Vec<f64> = cost.records.iter().map(|r| r.cumulative_mass_kg).collect();
        assert_eq!(masses, vec![150.0, 100.0, 130.0]);
        let expected = kinetic(150.0, 10.0) + kinetic(100.0, 15.0) + kinetic(130.0, 20.0);
        assert!((cost.total_theoretical - expected).abs() < 1e-6);
    }

    #[test]
    fn same_arc_costs_differ_by_history() {
        let instance = instance();
        let roles = RoleMap::new();
        let eval =
            RouteCostEvaluator::new(&instance, &roles, MassPolicy::CumulativeWithResets, 100.0);
        let forward = eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 0.0).unwrap();
        let backward = eval.evaluate(&Route::new(vec![0, 2, 1, 0]).unwrap(), 0.0).unwrap();

        let fwd_bc = &forward.records[1];
        let bwd_cb = &backward.records[1];
        assert_eq!((fwd_bc.start.as_str(), fwd_bc.end.as_str()), ("b", "c"));
        assert_eq!((bwd_cb.start.as_str(), bwd_cb.end.as_str()), ("c", "b"));
        assert!(fwd_bc.cumulative_mass_kg != bwd_cb.cumulative_mass_kg);
    }

    #[test]
    fn external_work_is_added_once() {
        let instance = instance();
        let roles = RoleMap::new();
        let eval = RouteCostEvaluator::new(&instance, &roles, MassPolicy::PerSegment, 100.0);
        let cost = eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 1000.0).unwrap();

        assert!((cost.total() - cost.total_theoretical - 1000.0).abs() < 1e-9);
        for record in &cost.records {
            assert_eq!(record.actual_work, Some(record.theoretical_work + 1000.0));
        }
    }

    #[test]
    fn distance_only_sums_meters() {
        let instance = instance();
        let roles = RoleMap::new();
        let eval = RouteCostEvaluator::new(&instance, &roles, MassPolicy::DistanceOnly, 100.0);
        let route = Route::new(vec![0, 1, 2, 0]).unwrap();
        let cost = eval.evaluate(&route, 0.0).unwrap();
        assert_eq!(cost.total_theoretical, 45_000.0);
        assert_eq!(cost.unit, CostUnit::Meters);
        assert_eq!(eval.distance_km(&route).unwrap(), 45.0);
    }

    #[test]
    fn missing_segment_is_fatal() {
        let mut instance = instance();
        instance.segments.remove(1, 2);
        let roles = RoleMap::new();
        let eval =
            RouteCostEvaluator::new(&instance, &roles, MassPolicy::CumulativeWithResets, 100.0);
        let err = eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 0.0);
        assert_eq!(
            err,
            Err(RouteError::MissingSegmentData {
                from: "b".into(),
                to: "c".into()
            })
        );
    }

    #[test]
    fn zero_duration_is_fatal() {
        let mut instance = instance();
        instance.segments.insert(
            2,
            0,
            Segment {
                distance_km: 1.0,
                duration_h: 0.0,
            },
        );
        let roles = RoleMap::new();
        let eval = RouteCostEvaluator::new(&instance, &roles, MassPolicy::PerSegment, 100.0);
        assert!(matches!(
            eval.evaluate(&Route::new(vec![0, 1, 2, 0]).unwrap(), 0.0),
            Err(RouteError::InvalidDuration { .. })
        ));
    }
}
