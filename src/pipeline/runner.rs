use std::error::Error;

use tracing::{info, info_span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{OptimizerConfig, ReferenceSource, RunnerConfig};
use crate::database::sqlx::{db_connection, load_registry as load_sqlite_registry};
use crate::distance::matrix::{create_segment_table, SegmentSource};
use crate::distance::providers::OsrmProvider;
use crate::domain::registry::LocationRegistry;
use crate::domain::types::{SegmentTable, Stop};
use crate::pipeline::optimize::{OptimizeRequest, RouteOptimizer};
use crate::reference::csv::{load_registry as load_csv_registry, load_stops};
use crate::report::{print_summary, save_cost_matrix, save_work_records};
use crate::solver::GuidedLocalSearch;

/// Initialize tracing and environment
fn init_tracing_and_env() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .try_init()?;

    dotenv::dotenv().ok();
    Ok(())
}

async fn load_reference(config: &RunnerConfig) -> Result<LocationRegistry, Box<dyn Error>> {
    let registry = match config.reference_source {
        ReferenceSource::Csv => load_csv_registry(config)?,
        ReferenceSource::Sqlite => {
            let pool = db_connection().await?;
            load_sqlite_registry(&pool).await?
        }
    };
    Ok(registry)
}

/// Registry and segment table for `stops`. Fewer than two stops have nothing
/// to route, so no reference data or provider is touched.
async fn load_inputs(
    config: &RunnerConfig,
    stops: &[Stop],
) -> Result<(LocationRegistry, SegmentTable), Box<dyn Error>> {
    if stops.len() < 2 {
        info!("{} stop(s): skipping reference data and segments", stops.len());
        return Ok((LocationRegistry::default(), SegmentTable::new(stops.len())));
    }

    let registry = load_reference(config).await?;
    let locations = registry.resolve_stops(stops)?;

    let provider = OsrmProvider::new(config.osrm_base_url.clone());
    let source = if config.use_offline_segments {
        SegmentSource::Offline {
            path: &config.segment_csv,
        }
    } else {
        SegmentSource::Osrm(&provider)
    };
    let segments = create_segment_table(source, stops, &locations).await?;
    Ok((registry, segments))
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    init_tracing_and_env()?;
    let runner_config = RunnerConfig::from_env()?;
    let optimizer_config = OptimizerConfig::from_env()?;

    let stops = load_stops(&runner_config.stops_csv)?;
    info!("Loaded {} stops from {}", stops.len(), runner_config.stops_csv);

    let (registry, segments) = load_inputs(&runner_config, &stops).await?;
    let labels: Vec<String> = stops.iter().map(|s| s.location.clone()).collect();

    let request = OptimizeRequest {
        stops,
        mpg: runner_config.mpg,
        maintain_order: runner_config.maintain_order,
    };
    let optimizer = RouteOptimizer::new(optimizer_config, registry, GuidedLocalSearch::new());

    let optimize_span = info_span!("optimize", stops = request.stops.len());
    let response = tokio::task::spawn_blocking(move || {
        let _guard = optimize_span.enter();
        optimizer.optimize(&request, &segments)
    })
    .await??;

    print_summary(&response);
    save_work_records(&response.breakdown, &runner_config.work_records_csv)?;
    info!(
        "Saved {} work records to {}",
        response.breakdown.len(),
        runner_config.work_records_csv
    );
    if let Some(matrix) = &response.cost_matrix {
        save_cost_matrix(matrix, &labels, &runner_config.cost_matrix_csv)?;
        info!("Saved cost matrix to {}", runner_config.cost_matrix_csv);
    }
    Ok(())
}
