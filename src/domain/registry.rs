use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::types::{Location, Stop};
use crate::error::{Result, RouteError};

/// Immutable lookup from external stop identifiers to canonical location records.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    locations: HashMap<String, Location>,
    aliases: HashMap<String, String>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<Location>, aliases: HashMap<String, String>) -> Self {
        let locations = locations
            .into_iter()
            .map(|loc| (loc.id.clone(), loc))
            .collect::<HashMap<_, _>>();
        for (alias, id) in &aliases {
            if !locations.contains_key(id) {
                warn!("Alias '{}' points at unknown location '{}'", alias, id);
            }
        }
        Self { locations, aliases }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    /// Canonical record for an external identifier: alias first, then the id itself.
    pub fn lookup(&self, identifier: &str) -> Result<&Location> {
        let canonical = self
            .aliases
            .get(identifier)
            .map(String::as_str)
            .unwrap_or(identifier);
        self.locations
            .get(canonical)
            .ok_or_else(|| RouteError::UnknownLocation(identifier.to_string()))
    }

    /// Locations for the request, in stop order. Each canonical location may appear once.
    pub fn resolve_stops(&self, stops: &[Stop]) -> Result<Vec<Location>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(stops.len());
        for stop in stops {
            let location = self.lookup(&stop.location)?;
            if !seen.insert(location.id.as_str()) {
                return Err(RouteError::DuplicateStop(location.id.clone()));
            }
            resolved.push(location.clone());
        }
        debug!("Resolved {} stops against the registry", resolved.len());
        Ok(resolved)
    }
}
