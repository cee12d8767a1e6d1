pub mod calibration;
pub mod mass;
pub mod route_cost;
pub mod segment_cost;

pub use calibration::{Calibration, Calibrator};
pub use mass::MassAccumulator;
pub use route_cost::{CostUnit, RouteCost, RouteCostEvaluator};
pub use segment_cost::{SegmentCostModel, SegmentWork};
