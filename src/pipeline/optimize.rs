use serde::Serialize;
use tracing::{info, span, Level};

use crate::config::constant::MILES_PER_KM;
use crate::config::OptimizerConfig;
use crate::domain::registry::LocationRegistry;
use crate::domain::types::{MassPolicy, ProblemInstance, Route, SegmentTable, Stop, WorkRecord};
use crate::error::Result;
use crate::evaluation::{Calibration, Calibrator, CostUnit, RouteCostEvaluator};
use crate::pipeline::assembler::RouteAssembler;
use crate::solver::{
    CombinatorialSolver, CostMatrix, CostMatrixBuilder, GuidedLocalSearch, SearchParameters,
    SolverAdapter,
};

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    pub stops: Vec<Stop>,
    /// Vehicle fuel economy; enables gallon estimates in the comparison.
    pub mpg: Option<f64>,
    pub maintain_order: bool,
}

/// Naive sequential order against the returned order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComparison {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub savings_pct: f64,
    pub original_distance_km: f64,
    pub optimized_distance_km: f64,
    pub original_gallons: Option<f64>,
    pub optimized_gallons: Option<f64>,
}

impl CostComparison {
    fn new(original: (f64, f64), optimized: (f64, f64), mpg: Option<f64>) -> Self {
        let (original_cost, original_distance_km) = original;
        let (optimized_cost, optimized_distance_km) = optimized;
        let savings = original_cost - optimized_cost;
        let savings_pct = if original_cost > 0.0 {
            savings / original_cost * 100.0
        } else {
            0.0
        };
        let gallons = |km: f64| mpg.filter(|m| *m > 0.0).map(|m| km * MILES_PER_KM / m);
        Self {
            original_cost,
            optimized_cost,
            savings,
            savings_pct,
            original_distance_km,
            optimized_distance_km,
            original_gallons: gallons(original_distance_km),
            optimized_gallons: gallons(optimized_distance_km),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeResponse {
    /// Closed tour over the caller's stops (depot repeated at the end), or the
    /// input unchanged when there were fewer than two stops.
    pub ordered_stops: Vec<Stop>,
    pub route: Option<Route>,
    /// True, order-dependent theoretical cost of `route`.
    pub total_cost: f64,
    /// `total_cost + w_ext`, present only when calibration ran.
    pub calibrated_total: Option<f64>,
    pub unit: CostUnit,
    pub breakdown: Vec<WorkRecord>,
    pub calibration: Option<Calibration>,
    pub comparison: Option<CostComparison>,
    /// Surrogate matrix handed to the solver, indexed like the request stops.
    pub cost_matrix: Option<CostMatrix>,
}

impl OptimizeResponse {
    fn unchanged(stops: &[Stop], unit: CostUnit) -> Self {
        Self {
            ordered_stops: stops.to_vec(),
            route: None,
            total_cost: 0.0,
            calibrated_total: None,
            unit,
            breakdown: Vec::new(),
            calibration: None,
            comparison: None,
            cost_matrix: None,
        }
    }
}

/// One optimization request end to end: registry lookup, calibration, cost
/// matrix, solve, assembly, then the true cost of the chosen order.
pub struct RouteOptimizer<S = GuidedLocalSearch> {
    config: OptimizerConfig,
    registry: LocationRegistry,
    adapter: SolverAdapter<S>,
}

impl<S: CombinatorialSolver> RouteOptimizer<S> {
    pub fn new(config: OptimizerConfig, registry: LocationRegistry, solver: S) -> Self {
        let params = SearchParameters::from(&config.solver);
        Self {
            config,
            registry,
            adapter: SolverAdapter::new(solver, params),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn optimize(
        &self,
        request: &OptimizeRequest,
        segments: &SegmentTable,
    ) -> Result<OptimizeResponse> {
        let policy = self.config.mass_policy;
        let unit = CostUnit::from(policy);
        let n = request.stops.len();
        if n < 2 {
            info!("{} stop(s): nothing to optimize", n);
            return Ok(OptimizeResponse::unchanged(&request.stops, unit));
        }

        let locations = {
            let span = span!(Level::INFO, "registry");
            let _guard = span.enter();
            self.registry.resolve_stops(&request.stops)?
        };
        let instance = ProblemInstance::new(locations, segments.clone());
        let evaluator = RouteCostEvaluator::new(
            &instance,
            &self.config.roles,
            policy,
            self.config.empty_vehicle_mass_kg,
        );
        let sequential = Route::sequential(n)?;

        if request.maintain_order {
            info!("Keeping caller order for {} stops", n);
            let cost = evaluator.evaluate(&sequential, 0.0)?;
            let distance = evaluator.distance_km(&sequential)?;
            let ordered_stops = RouteAssembler::apply(&request.stops, sequential.nodes())?;
            let totals = (cost.total_theoretical, distance);
            return Ok(OptimizeResponse {
                ordered_stops,
                route: Some(sequential),
                total_cost: cost.total_theoretical,
                calibrated_total: None,
                unit,
                breakdown: cost.records,
                calibration: None,
                comparison: Some(CostComparison::new(totals, totals, request.mpg)),
                cost_matrix: None,
            });
        }

        let calibration = if policy == MassPolicy::DistanceOnly {
            None
        } else {
            let span = span!(Level::INFO, "calibration");
            let _guard = span.enter();
            Some(Calibrator::new(&evaluator, self.config.energy).calibrate(&sequential)?)
        };
        let w_ext = calibration.map_or(0.0, |c| c.w_ext());

        let matrix = {
            let span = span!(Level::INFO, "cost_matrix");
            let _guard = span.enter();
            CostMatrixBuilder::new(
                &instance,
                policy,
                self.config.empty_vehicle_mass_kg,
                self.config.sentinel_cost,
            )
            .build(w_ext)?
        };

        let tour = self.adapter.solve(&matrix, 0)?;

        let (route, ordered_stops) = {
            let span = span!(Level::INFO, "assembly");
            let _guard = span.enter();
            let route = Route::new(tour)?;
            let ordered = RouteAssembler::apply(&request.stops, route.nodes())?;
            (route, ordered)
        };

        let cost = evaluator.evaluate(&route, w_ext)?;
        let baseline = evaluator.evaluate(&sequential, w_ext)?;
        let comparison = CostComparison::new(
            (baseline.total_theoretical, evaluator.distance_km(&sequential)?),
            (cost.total_theoretical, evaluator.distance_km(&route)?),
            request.mpg,
        );
        info!(
            "Optimized cost {:.2} vs sequential {:.2} ({:.2}% saved)",
            comparison.optimized_cost, comparison.original_cost, comparison.savings_pct
        );

        Ok(OptimizeResponse {
            ordered_stops,
            route: Some(route),
            total_cost: cost.total_theoretical,
            calibrated_total: calibration.map(|_| cost.total()),
            unit,
            breakdown: cost.records,
            calibration,
            comparison: Some(comparison),
            cost_matrix: Some(matrix),
        })
    }
}
