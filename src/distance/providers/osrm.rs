use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::domain::types::{Coordinates, TravelMatrix};
use crate::error::{Result, RouteError};

const PROVIDER: &str = "osrm";
const MAX_URL_LEN: usize = 8000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "ecoroute-solver/0.1";

/// Pairwise road distances and durations from an OSRM `table` service.
pub struct OsrmProvider {
    client: Client,
    base_url: String,
}

impl OsrmProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn is_public(&self) -> bool {
        self.base_url.contains("router.project-osrm.org")
    }

    /// `{base}/{lon,lat;lon,lat;...}?annotations=distance,duration`
    pub fn table_url(&self, coords: &[Coordinates]) -> String {
        let coord_str = coords
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<String>>()
            .join(";");
        trace!("Formatted coordinate string: {}", coord_str);
        format!(
            "{}/{}?annotations=distance,duration",
            self.base_url.trim_end_matches('/'),
            coord_str
        )
    }

    pub async fn fetch_table(&self, coords: &[Coordinates]) -> Result<TravelMatrix> {
        if coords.is_empty() {
            return Err(RouteError::upstream(PROVIDER, "no coordinates to route"));
        }

        let url = self.table_url(coords);
        if url.len() > MAX_URL_LEN {
            warn!(
                "OSRM URL too long ({} chars), consider self-hosted OSRM or batching",
                url.len()
            );
            return Err(RouteError::upstream(
                PROVIDER,
                format!("request URL of {} chars exceeds {}", url.len(), MAX_URL_LEN),
            ));
        }
        debug!("Built OSRM URL: {} ({} chars)", url, url.len());

        let mut request = self.client.get(&url).timeout(REQUEST_TIMEOUT);
        if self.is_public() {
            request = request.header("User-Agent", USER_AGENT);
            info!("Using public OSRM with User-Agent {}", USER_AGENT);
        }

        info!("Sending GET request to OSRM ({} locations)", coords.len());
        let response = request.send().await.map_err(|e| {
            error!("OSRM request failed: {}", e);
            RouteError::upstream(PROVIDER, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "OSRM returned HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(RouteError::upstream(PROVIDER, format!("HTTP {status}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RouteError::upstream(PROVIDER, e))?;
        let matrix = parse_osrm_table(&json, coords.len())?;
        info!(
            "Retrieved {}x{} travel matrix from OSRM",
            matrix.distances_m.len(),
            matrix.distances_m.len()
        );
        Ok(matrix)
    }
}

/// Pull the `distances` (m) and `durations` (s) arrays out of a table response.
/// Unreachable pairs (`null`) are an error rather than a silent large value.
pub fn parse_osrm_table(json: &Value, expected: usize) -> Result<TravelMatrix> {
    if let Some(code) = json["code"].as_str() {
        if code != "Ok" {
            let message = json["message"].as_str().unwrap_or("");
            return Err(RouteError::upstream(PROVIDER, format!("{code}: {message}")));
        }
    }

    let distances_m = parse_square(json, "distances", expected)?;
    let durations_s = parse_square(json, "durations", expected)?;
    Ok(TravelMatrix {
        distances_m,
        durations_s,
    })
}

fn parse_square(json: &Value, key: &str, expected: usize) -> Result<Vec<Vec<f64>>> {
    let rows = json[key].as_array().ok_or_else(|| {
        error!(
            "No '{}' array in OSRM response. Keys: {:?}",
            key,
            json.as_object().map(|o| o.keys().collect::<Vec<_>>())
        );
        RouteError::upstream(PROVIDER, format!("response has no '{key}' array"))
    })?;

    if rows.len() != expected {
        return Err(RouteError::upstream(
            PROVIDER,
            format!("'{key}' has {} rows, expected {expected}", rows.len()),
        ));
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = row
                .as_array()
                .filter(|cells| cells.len() == expected)
                .ok_or_else(|| {
                    RouteError::upstream(PROVIDER, format!("'{key}' row {i} is malformed"))
                })?;
            cells
                .iter()
                .enumerate()
                .map(|(j, cell)| {
                    cell.as_f64().ok_or_else(|| {
                        RouteError::upstream(
                            PROVIDER,
                            format!("'{key}' has no value for {i} -> {j}"),
                        )
                    })
                })
                .collect()
        })
        .collect()
}
