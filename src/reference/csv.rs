use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::domain::registry::LocationRegistry;
use crate::domain::types::{Coordinates, Location, Segment, SegmentTable, Stop};
use crate::error::{Result, RouteError};

#[derive(Debug, Deserialize)]
struct ElevationRow {
    name: String,
    elevation_in_m: f64,
}

#[derive(Debug, Deserialize)]
struct WeightRow {
    start: String,
    #[serde(rename = "weight average")]
    weight_average: f64,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    address: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SegmentRow {
    start: String,
    end: String,
    #[serde(rename = "DIST_KM")]
    dist_km: f64,
    #[serde(rename = "DURATION_H")]
    duration_h: f64,
}

#[derive(Debug, Deserialize)]
struct StopRow {
    location: String,
    lat: f64,
    lng: f64,
}

fn read_rows<T: DeserializeOwned, R: Read>(reader: R, source: &str) -> Result<Vec<T>> {
    ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(|e| RouteError::upstream(format!("csv:{source}"), e))
}

fn open(path: &str) -> Result<File> {
    File::open(path).map_err(|e| RouteError::upstream(format!("csv:{path}"), e))
}

/// Request stops as `location,lat,lng` rows.
pub fn read_stops<R: Read>(reader: R, source: &str) -> Result<Vec<Stop>> {
    let rows: Vec<StopRow> = read_rows(reader, source)?;
    Ok(rows
        .into_iter()
        .map(|row| Stop {
            location: row.location,
            coords: Coordinates {
                lat: row.lat,
                lng: row.lng,
            },
        })
        .collect())
}

/// Build the registry from the elevation, weight and alias tables.
///
/// A location known to only one of the elevation / weight tables gets 0 for
/// the missing attribute. Later rows override earlier ones.
pub fn read_registry<E: Read, W: Read, A: Read>(
    elevation: E,
    weight: W,
    aliases: A,
) -> Result<LocationRegistry> {
    let elevations: HashMap<String, i32> = read_rows::<ElevationRow, _>(elevation, "elevation")?
        .into_iter()
        .map(|row| (row.name, row.elevation_in_m.round() as i32))
        .collect();
    let weights: HashMap<String, f64> = read_rows::<WeightRow, _>(weight, "weight")?
        .into_iter()
        .map(|row| (row.start, row.weight_average))
        .collect();
    let aliases: HashMap<String, String> = read_rows::<AliasRow, _>(aliases, "aliases")?
        .into_iter()
        .map(|row| (row.address, row.name))
        .collect();

    let names: BTreeSet<&String> = elevations.keys().chain(weights.keys()).collect();
    let locations: Vec<Location> = names
        .into_iter()
        .map(|name| {
            let elevation = elevations.get(name).copied().unwrap_or_else(|| {
                debug!("No elevation for '{}', using 0 m", name);
                0
            });
            let weight = weights.get(name).copied().unwrap_or(0.0);
            Location::new(name.clone(), elevation, weight)
        })
        .collect();

    info!(
        "Loaded {} reference locations and {} aliases",
        locations.len(),
        aliases.len()
    );
    Ok(LocationRegistry::new(locations, aliases))
}

pub fn load_registry(config: &RunnerConfig) -> Result<LocationRegistry> {
    read_registry(
        open(&config.elevation_csv)?,
        open(&config.weight_csv)?,
        open(&config.alias_csv)?,
    )
}

/// Offline `start,end,DIST_KM,DURATION_H` table restricted to `locations`,
/// indexed by position in that slice.
pub fn read_segment_table<R: Read>(reader: R, locations: &[Location]) -> Result<SegmentTable> {
    let index: HashMap<&str, usize> = locations
        .iter()
        .enumerate()
        .map(|(i, loc)| (loc.id.as_str(), i))
        .collect();

    let mut table = SegmentTable::new(locations.len());
    let mut skipped = 0usize;
    for row in read_rows::<SegmentRow, _>(reader, "segments")? {
        match (index.get(row.start.as_str()), index.get(row.end.as_str())) {
            (Some(&from), Some(&to)) if from != to => table.insert(
                from,
                to,
                Segment {
                    distance_km: row.dist_km,
                    duration_h: row.duration_h,
                },
            ),
            _ => skipped += 1,
        }
    }

    let expected = locations.len() * locations.len().saturating_sub(1);
    if table.len() < expected {
        warn!(
            "Offline segment table covers {} of {} pairs",
            table.len(),
            expected
        );
    }
    debug!("Kept {} segments, skipped {} rows", table.len(), skipped);
    Ok(table)
}

pub fn load_segment_table(path: &str, locations: &[Location]) -> Result<SegmentTable> {
    read_segment_table(open(path)?, locations)
}

pub fn load_stops(path: &str) -> Result<Vec<Stop>> {
    read_stops(open(path)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELEVATION: &str = "name,elevation_in_m\ndepot,250\nschool,271.6\n";
    const WEIGHT: &str = "start,weight average\ndepot,0\nschool,120.5\nlandfill,0\n";
    const ALIASES: &str = "address,name\n\"555 Warren Road, Ithaca\",depot\n";

    #[test]
    fn registry_joins_the_three_tables() {
        let registry =
            read_registry(ELEVATION.as_bytes(), WEIGHT.as_bytes(), ALIASES.as_bytes()).unwrap();

        assert_eq!(registry.len(), 3);
        let depot = registry.lookup("555 Warren Road, Ithaca").unwrap();
        assert_eq!(depot.id, "depot");
        assert_eq!(depot.elevation_m, 250);

        let school = registry.lookup("school").unwrap();
        assert_eq!(school.elevation_m, 272);
        assert_eq!(school.added_weight_kg, 120.5);

        assert_eq!(registry.lookup("landfill").unwrap().elevation_m, 0);
    }

    #[test]
    fn malformed_rows_name_the_table() {
        let err = read_registry(
            "name,elevation_in_m\ndepot,high\n".as_bytes(),
            WEIGHT.as_bytes(),
            ALIASES.as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RouteError::UpstreamDataUnavailable { ref provider, .. } if provider == "csv:elevation"
        ));
    }

    #[test]
    fn segment_table_keeps_only_requested_pairs() {
        let csv = "start,end,DIST_KM,DURATION_H\n\
                   depot,school,4.2,0.1\n\
                   school,depot,4.4,0.12\n\
                   school,landfill,9.0,0.3\n\
                   depot,depot,0,0\n";
        let locations = vec![Location::new("depot", 0, 0.0), Location::new("school", 0, 0.0)];
        let table = read_segment_table(csv.as_bytes(), &locations).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, 1).map(|s| s.distance_km), Some(4.2));
        assert_eq!(table.get(1, 0).map(|s| s.duration_h), Some(0.12));
    }

    #[test]
    fn stops_are_read_in_file_order() {
        let csv = "location,lat,lng\n\"555 Warren Road, Ithaca\",42.47,-76.47\nschool,42.45,-76.50\n";
        let stops = read_stops(csv.as_bytes(), "stops").unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].location, "555 Warren Road, Ithaca");
        assert_eq!(stops[1].coords.lng, -76.50);
    }
}
