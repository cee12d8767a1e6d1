use tracing::{info, warn};

use crate::config::EnergyParams;
use crate::domain::types::Route;
use crate::error::Result;
use crate::evaluation::route_cost::RouteCostEvaluator;

/// Outcome of fitting the external work constant against a real fuel baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// `known_real_energy - theoretical_total`, kept for diagnostics.
    pub signed: f64,
    pub theoretical_total: f64,
    pub real_energy_total: f64,
}

impl Calibration {
    /// The value applied downstream: the sign of the difference is discarded.
    pub fn w_ext(&self) -> f64 {
        self.signed.abs()
    }
}

pub struct Calibrator<'a> {
    evaluator: &'a RouteCostEvaluator<'a>,
    energy: EnergyParams,
}

impl<'a> Calibrator<'a> {
    pub fn new(evaluator: &'a RouteCostEvaluator<'a>, energy: EnergyParams) -> Self {
        Self { evaluator, energy }
    }

    pub fn calibrate(&self, reference_route: &Route) -> Result<Calibration> {
        let theoretical_total = self.evaluator.evaluate(reference_route, 0.0)?.total_theoretical;
        let real_energy_total = self.energy.total_energy_j();
        let signed = real_energy_total - theoretical_total;

        if signed < 0.0 {
            warn!(
                "Theoretical work {:.2} J exceeds the fuel baseline {:.2} J; using |w_ext|",
                theoretical_total, real_energy_total
            );
        }
        info!(
            "Calibrated w_ext = {:.4} J (signed {:.4} J) on reference route {:?}",
            signed.abs(),
            signed,
            reference_route.nodes()
        );

        Ok(Calibration {
            signed,
            theoretical_total,
            real_energy_total,
        })
    }
}
