use crate::domain::types::{Location, LocationRole, MassPolicy, RoleMap};

/// Carried mass while walking an ordered route.
///
/// Under `CumulativeWithResets` the same arc costs differently depending on
/// what was visited before it; the other policies are history-free.
#[derive(Debug, Clone)]
pub struct MassAccumulator<'a> {
    policy: MassPolicy,
    empty_mass_kg: f64,
    roles: &'a RoleMap,
    cumulative_kg: f64,
    added_kg: f64,
}

impl<'a> MassAccumulator<'a> {
    pub fn new(policy: MassPolicy, empty_mass_kg: f64, roles: &'a RoleMap) -> Self {
        Self {
            policy,
            empty_mass_kg,
            roles,
            cumulative_kg: empty_mass_kg,
            added_kg: 0.0,
        }
    }

    /// Mass of a single segment departing `start`, independent of route history.
    pub fn representative(empty_mass_kg: f64, start: &Location) -> f64 {
        empty_mass_kg + start.added_weight_kg
    }

    pub fn cumulative(&self) -> f64 {
        self.cumulative_kg
    }

    /// Mass picked up at the start of the last charged segment.
    pub fn added(&self) -> f64 {
        self.added_kg
    }

    /// Mass to charge for the segment departing `start`; advances the running total.
    pub fn charge(&mut self, start: &Location, is_route_start: bool) -> f64 {
        match self.policy {
            MassPolicy::DistanceOnly => {
                self.added_kg = 0.0;
                0.0
            }
            MassPolicy::PerSegment => {
                self.added_kg = start.added_weight_kg;
                self.cumulative_kg = Self::representative(self.empty_mass_kg, start);
                self.cumulative_kg
            }
            MassPolicy::CumulativeWithResets => {
                match self.roles.resolve(&start.id, is_route_start) {
                    LocationRole::OriginDepot => {
                        self.added_kg = start.added_weight_kg;
                        self.cumulative_kg = self.empty_mass_kg + start.added_weight_kg;
                    }
                    // unloaded here: leaves empty and stays empty for the next step
                    LocationRole::DisposalSite => {
                        self.added_kg = 0.0;
                        self.cumulative_kg = self.empty_mass_kg;
                    }
                    LocationRole::Normal => {
                        self.added_kg = start.added_weight_kg;
                        self.cumulative_kg += start.added_weight_kg;
                    }
                }
                self.cumulative_kg
            }
        }
    }
}
