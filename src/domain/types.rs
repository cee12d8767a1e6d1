use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::constant::{METERS_PER_KM, SECONDS_PER_HOUR};
use crate::error::{Result, RouteError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A caller-supplied stop. `location` is the external identifier (often a street address).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub location: String,
    pub coords: Coordinates,
}

/// Canonical reference record for a place the vehicle can visit.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub elevation_m: i32,
    /// Typical mass picked up when departing this location.
    pub added_weight_kg: f64,
}

impl Location {
    pub fn new(id: impl Into<String>, elevation_m: i32, added_weight_kg: f64) -> Self {
        Self {
            id: id.into(),
            elevation_m,
            added_weight_kg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationRole {
    OriginDepot,
    DisposalSite,
    Normal,
}

/// Deployment-specific roles keyed by canonical location id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleMap {
    roles: HashMap<String, LocationRole>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, role: LocationRole) -> Self {
        self.insert(id, role);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, role: LocationRole) {
        self.roles.insert(id.into(), role);
    }

    /// Explicit role if configured. Otherwise the first node of a route is its origin depot.
    pub fn resolve(&self, id: &str, is_route_start: bool) -> LocationRole {
        match self.roles.get(id) {
            Some(role) => *role,
            None if is_route_start => LocationRole::OriginDepot,
            None => LocationRole::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassPolicy {
    /// Each segment carries the empty vehicle plus its start location's added weight.
    PerSegment,
    /// Mass accumulates along the route and resets at depots and disposal sites.
    CumulativeWithResets,
    /// Ignore mass entirely and charge distance in meters.
    DistanceOnly,
}

impl FromStr for MassPolicy {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_segment" => Ok(MassPolicy::PerSegment),
            "cumulative" | "cumulative_with_resets" => Ok(MassPolicy::CumulativeWithResets),
            "distance" | "distance_only" => Ok(MassPolicy::DistanceOnly),
            other => Err(RouteError::Config(format!("unknown mass policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub distance_km: f64,
    pub duration_h: f64,
}

/// Measured travel between every ordered pair of the current request's locations.
/// Indices are positions in the request, not in the reference registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTable {
    size: usize,
    segments: HashMap<(usize, usize), Segment>,
}

impl SegmentTable {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            segments: HashMap::new(),
        }
    }

    pub fn insert(&mut self, from: usize, to: usize, segment: Segment) {
        self.size = self.size.max(from + 1).max(to + 1);
        self.segments.insert((from, to), segment);
    }

    pub fn get(&self, from: usize, to: usize) -> Option<&Segment> {
        self.segments.get(&(from, to))
    }

    pub fn remove(&mut self, from: usize, to: usize) -> Option<Segment> {
        self.segments.remove(&(from, to))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Square km/hours table from rows of kilometers and hours.
    pub fn from_km_hours(distances_km: &[Vec<f64>], durations_h: &[Vec<f64>]) -> Self {
        let mut table = SegmentTable::new(distances_km.len());
        for (i, (dist_row, dur_row)) in distances_km.iter().zip(durations_h).enumerate() {
            for (j, (&distance_km, &duration_h)) in dist_row.iter().zip(dur_row).enumerate() {
                if i != j {
                    table.insert(
                        i,
                        j,
                        Segment {
                            distance_km,
                            duration_h,
                        },
                    );
                }
            }
        }
        table
    }

    /// Convert a provider matrix (meters, seconds) into km and hours.
    pub fn from_travel_matrix(matrix: &TravelMatrix) -> Self {
        let to_km = |row: &Vec<f64>| row.iter().map(|m| m / METERS_PER_KM).collect::<Vec<_>>();
        let to_h = |row: &Vec<f64>| {
            row.iter()
                .map(|s| s / SECONDS_PER_HOUR)
                .collect::<Vec<_>>()
        };
        let km: Vec<Vec<f64>> = matrix.distances_m.iter().map(to_km).collect();
        let hours: Vec<Vec<f64>> = matrix.durations_s.iter().map(to_h).collect();
        SegmentTable::from_km_hours(&km, &hours)
    }
}

/// Raw output of a distance/duration provider, indexed in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelMatrix {
    pub distances_m: Vec<Vec<f64>>,
    pub durations_s: Vec<Vec<f64>>,
}

/// Closed tour over request indices: at least two nodes, first equals last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    nodes: Vec<usize>,
}

impl Route {
    pub fn new(nodes: Vec<usize>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(RouteError::InvalidRoute(format!(
                "a route needs at least 2 nodes, got {}",
                nodes.len()
            )));
        }
        if nodes.first() != nodes.last() {
            return Err(RouteError::InvalidRoute(format!(
                "route must return to its start: {:?}",
                nodes
            )));
        }
        Ok(Self { nodes })
    }

    /// Naive visiting order `0, 1, ..., n-1, 0`.
    pub fn sequential(n: usize) -> Result<Self> {
        Route::new((0..n).chain(std::iter::once(0)).collect())
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn start(&self) -> usize {
        self.nodes[0]
    }

    pub fn segment_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

/// Per-segment result of walking a route. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkRecord {
    pub start: String,
    pub end: String,
    pub segment_mass_kg: f64,
    pub cumulative_mass_kg: f64,
    pub v_avg_mps: f64,
    pub delta_h_m: i32,
    pub theoretical_work: f64,
    pub actual_work: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemInstance {
    pub locations: Vec<Location>,
    pub segments: SegmentTable,
}

impl ProblemInstance {
    pub fn new(locations: Vec<Location>, segments: SegmentTable) -> Self {
        Self {
            locations,
            segments,
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn location(&self, index: usize) -> Result<&Location> {
        self.locations.get(index).ok_or(RouteError::IndexOutOfBounds {
            index,
            len: self.locations.len(),
        })
    }

    /// Segment between two request indices, validated for use in a cost computation.
    pub fn segment(&self, from: usize, to: usize) -> Result<Segment> {
        let start = self.location(from)?;
        let end = self.location(to)?;
        let segment = self
            .segments
            .get(from, to)
            .copied()
            .ok_or_else(|| RouteError::MissingSegmentData {
                from: start.id.clone(),
                to: end.id.clone(),
            })?;
        if !(segment.duration_h > 0.0) {
            return Err(RouteError::InvalidDuration {
                from: start.id.clone(),
                to: end.id.clone(),
                duration_h: segment.duration_h,
            });
        }
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_must_be_closed() {
        assert!(Route::new(vec![0, 1, 2, 0]).is_ok());
        assert!(matches!(
            Route::new(vec![0, 1, 2]),
            Err(RouteError::InvalidRoute(_))
        ));
        assert!(matches!(Route::new(vec![0]), Err(RouteError::InvalidRoute(_))));
    }

    #[test]
    fn sequential_route_returns_to_start() {
        let route = Route::sequential(3).unwrap();
        assert_eq!(route.nodes(), &[0, 1, 2, 0]);
        assert_eq!(route.segment_count(), 3);
    }

    #[test]
    fn travel_matrix_converts_to_km_and_hours() {
        let matrix = TravelMatrix {
            distances_m: vec![vec![0.0, 1500.0], vec![2000.0, 0.0]],
            durations_s: vec![vec![0.0, 1800.0], vec![3600.0, 0.0]],
        };
        let table = SegmentTable::from_travel_matrix(&matrix);
        let seg = table.get(0, 1).unwrap();
        assert!((seg.distance_km - 1.5).abs() < 1e-12);
        assert!((seg.duration_h - 0.5).abs() < 1e-12);
        assert!(table.get(0, 0).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn roles_default_to_depot_only_at_route_start() {
        let roles = RoleMap::new().with("dump", LocationRole::DisposalSite);
        assert_eq!(roles.resolve("garage", true), LocationRole::OriginDepot);
        assert_eq!(roles.resolve("garage", false), LocationRole::Normal);
        assert_eq!(roles.resolve("dump", true), LocationRole::DisposalSite);
    }

    #[test]
    fn segment_lookup_reports_names() {
        let instance = ProblemInstance::new(
            vec![Location::new("a", 0, 0.0), Location::new("b", 0, 0.0)],
            SegmentTable::new(2),
        );
        assert_eq!(
            instance.segment(0, 1),
            Err(RouteError::MissingSegmentData {
                from: "a".into(),
                to: "b".into()
            })
        );
    }
}
