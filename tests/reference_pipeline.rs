use std::time::Duration;

use ecoroute::config::{Metaheuristic, OptimizerConfig, SolverConfig};
use ecoroute::domain::types::MassPolicy;
use ecoroute::pipeline::{OptimizeRequest, RouteOptimizer};
use ecoroute::reference::csv::{read_registry, read_segment_table, read_stops};
use ecoroute::report::write_work_records;
use ecoroute::solver::GuidedLocalSearch;

const ELEVATION: &str = "\
name,elevation_in_m
tst boces tompkins,250
1. dewitt middle school,262
2. northeast elementary,281
3. cayuga heights elementary,240
";

const WEIGHT: &str = "\
start,weight average
tst boces tompkins,0
1. dewitt middle school,85.2
2. northeast elementary,40.7
3. cayuga heights elementary,61.0
";

const ALIASES: &str = "\
address,name
\"TST BOCES, 555 Warren Road, Northeast Ithaca, NY 14850\",tst boces tompkins
\"Dewitt Middle School, 560 Warren Road, Ithaca, NY 14850\",1. dewitt middle school
";

const STOPS: &str = "\
location,lat,lng
\"TST BOCES, 555 Warren Road, Northeast Ithaca, NY 14850\",42.476,-76.465
\"Dewitt Middle School, 560 Warren Road, Ithaca, NY 14850\",42.478,-76.467
2. northeast elementary,42.480,-76.478
3. cayuga heights elementary,42.466,-76.488
";

fn segments_csv() -> String {
    let names = [
        "tst boces tompkins",
        "1. dewitt middle school",
        "2. northeast elementary",
        "3. cayuga heights elementary",
        "99. elsewhere",
    ];
    let mut csv = String::from("start,end,DIST_KM,DURATION_H\n");
    for (i, from) in names.iter().enumerate() {
        for (j, to) in names.iter().enumerate() {
            if i != j {
                let km = 1.0 + ((i * 3 + j * 7) % 5) as f64;
                csv.push_str(&format!("{from},{to},{km},{}\n", km / 40.0));
            }
        }
    }
    csv
}

#[test]
fn csv_reference_data_drives_an_optimization() {
    let registry =
        read_registry(ELEVATION.as_bytes(), WEIGHT.as_bytes(), ALIASES.as_bytes()).unwrap();
    let stops = read_stops(STOPS.as_bytes(), "stops").unwrap();
    let locations = registry.resolve_stops(&stops).unwrap();
    let segments = read_segment_table(segments_csv().as_bytes(), &locations).unwrap();
    assert_eq!(segments.len(), 12);

    let config = OptimizerConfig {
        solver: SolverConfig {
            time_limit: Duration::from_secs(2),
            metaheuristic: Metaheuristic::GuidedLocalSearch,
            max_iterations: Some(10),
            seed: 7,
        },
        ..OptimizerConfig::default()
    };
    let optimizer = RouteOptimizer::new(config, registry, GuidedLocalSearch);
    let response = optimizer
        .optimize(
            &OptimizeRequest {
                stops: stops.clone(),
                mpg: Some(6.5),
                maintain_order: false,
            },
            &segments,
        )
        .unwrap();

    assert_eq!(response.ordered_stops.first(), stops.first());
    assert_eq!(response.ordered_stops.last(), stops.first());
    assert_eq!(response.breakdown.len(), 4);
    assert_eq!(response.breakdown[0].start, "tst boces tompkins");

    let comparison = response.comparison.unwrap();
    assert!(comparison.original_gallons.is_some());
    let difference = comparison.original_cost - comparison.optimized_cost;
    assert!((difference - comparison.savings).abs() < 1e-6);

    let mut out = Vec::new();
    write_work_records(&response.breakdown, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 5);
}

#[test]
fn distance_policy_ranks_by_meters() {
    let registry =
        read_registry(ELEVATION.as_bytes(), WEIGHT.as_bytes(), ALIASES.as_bytes()).unwrap();
    let stops = read_stops(STOPS.as_bytes(), "stops").unwrap();
    let locations = registry.resolve_stops(&stops).unwrap();
    let segments = read_segment_table(segments_csv().as_bytes(), &locations).unwrap();

    let config = OptimizerConfig {
        mass_policy: MassPolicy::DistanceOnly,
        solver: SolverConfig {
            time_limit: Duration::from_secs(2),
            metaheuristic: Metaheuristic::None,
            max_iterations: None,
            seed: 7,
        },
        ..OptimizerConfig::default()
    };
    let optimizer = RouteOptimizer::new(config, registry, GuidedLocalSearch);
    let response = optimizer
        .optimize(
            &OptimizeRequest {
                stops,
                mpg: None,
                maintain_order: false,
            },
            &segments,
        )
        .unwrap();

    let comparison = response.comparison.unwrap();
    assert!(response.calibration.is_none());
    assert!((response.total_cost - comparison.optimized_distance_km * 1000.0).abs() < 1e-6);
    assert!(comparison.optimized_cost <= comparison.original_cost + 1e-6);
}
