use crate::config::constant::{GRAVITY, METERS_PER_KM, SECONDS_PER_HOUR};
use crate::domain::types::{Location, MassPolicy, Segment};

/// Kinetic + potential energy estimate for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWork {
    pub v_avg_mps: f64,
    pub delta_h_m: i32,
    pub work_j: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentCostModel {
    gravity: f64,
}

impl Default for SegmentCostModel {
    fn default() -> Self {
        Self { gravity: GRAVITY }
    }
}

impl SegmentCostModel {
    pub fn new(gravity: f64) -> Self {
        Self { gravity }
    }

    pub fn average_velocity(segment: &Segment) -> f64 {
        (segment.distance_km * METERS_PER_KM) / (segment.duration_h * SECONDS_PER_HOUR)
    }

    /// `W = ½·m·v² + m·g·Δh`. A negative result drops the potential term:
    /// downhill segments coast, they never generate energy.
    ///
    /// The caller guarantees `segment.duration_h > 0`.
    pub fn work(
        &self,
        segment: &Segment,
        start: &Location,
        end: &Location,
        mass_kg: f64,
    ) -> SegmentWork {
        let v_avg_mps = Self::average_velocity(segment);
        let delta_h_m = end.elevation_m - start.elevation_m;

        let kinetic = 0.5 * mass_kg * v_avg_mps.powi(2);
        let potential = mass_kg * self.gravity * f64::from(delta_h_m);
        let mut work_j = kinetic + potential;
        if work_j < 0.0 {
            work_j = kinetic;
        }

        SegmentWork {
            v_avg_mps,
            delta_h_m,
            work_j,
        }
    }

    /// Segment cost under `policy`: work in joules, or meters driven for `DistanceOnly`.
    pub fn cost(
        &self,
        policy: MassPolicy,
        segment: &Segment,
        start: &Location,
        end: &Location,
        mass_kg: f64,
    ) -> SegmentWork {
        match policy {
            MassPolicy::DistanceOnly => SegmentWork {
                v_avg_mps: Self::average_velocity(segment),
                delta_h_m: end.elevation_m - start.elevation_m,
                work_j: segment.distance_km * METERS_PER_KM,
            },
            MassPolicy::PerSegment | MassPolicy::CumulativeWithResets => {
                self.work(segment, start, end, mass_kg)
            }
        }
    }
}
