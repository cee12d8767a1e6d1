use tracing::{info, info_span, Instrument};

use crate::domain::types::{Coordinates, Location, SegmentTable, Stop};
use crate::error::{Result, RouteError};
use crate::reference::csv::load_segment_table;

use super::providers::OsrmProvider;

/// Where per-pair distance and duration come from.
pub enum SegmentSource<'a> {
    Osrm(&'a OsrmProvider),
    /// Precomputed `start,end,DIST_KM,DURATION_H` table keyed by canonical names.
    Offline { path: &'a str },
}

/// Segment table for `stops`, indexed by stop position. `locations` must be the
/// registry records of `stops` in the same order.
pub async fn create_segment_table(
    source: SegmentSource<'_>,
    stops: &[Stop],
    locations: &[Location],
) -> Result<SegmentTable> {
    if stops.len() != locations.len() {
        return Err(RouteError::IndexOutOfBounds {
            index: locations.len(),
            len: stops.len(),
        });
    }

    let table = match source {
        SegmentSource::Osrm(provider) => {
            let coords: Vec<Coordinates> = stops.iter().map(|s| s.coords).collect();
            let matrix = provider
                .fetch_table(&coords)
                .instrument(info_span!("osrm_table", stops = stops.len()))
                .await?;
            SegmentTable::from_travel_matrix(&matrix)
        }
        SegmentSource::Offline { path } => load_segment_table(path, locations)?,
    };

    info!(
        "Segment table ready: {} segments for {} stops",
        table.len(),
        stops.len()
    );
    Ok(table)
}
