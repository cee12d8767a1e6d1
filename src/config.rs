use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{debug, info};

use crate::domain::types::{LocationRole, MassPolicy, RoleMap};
use crate::error::{Result, RouteError};

pub mod constant {
    pub const GRAVITY: f64 = 9.81;
    pub const EMPTY_VEHICLE_MASS_KG: f64 = 18325.1317;
    pub const FUEL_VOLUME_LITERS: f64 = 246.052 / 5.0;
    pub const DIESEL_TO_J: f64 = 38_290_000.0;
    pub const SENTINEL_COST: u64 = 100_000_000_000;
    pub const SOLVER_TIME_LIMIT_SECS: u64 = 10;
    pub const SEED: u64 = 64;
    pub const METERS_PER_KM: f64 = 1000.0;
    pub const SECONDS_PER_HOUR: f64 = 3600.0;
    pub const MILES_PER_KM: f64 = 0.621371;
    pub const OSRM_BASE_URL: &str = "https://router.project-osrm.org/table/v1/driving";
    pub const STOPS_CSV_PATH: &str = "data/stops.csv";
    pub const ELEVATION_CSV_PATH: &str = "data/elevation_matrix.csv";
    pub const WEIGHT_CSV_PATH: &str = "data/weight_matrix.csv";
    pub const ALIAS_CSV_PATH: &str = "data/addresses.csv";
    pub const SEGMENT_CSV_PATH: &str = "data/distance_time_matrix.csv";
    pub const WORK_RECORDS_CSV_PATH: &str = "work_for_opt_route.csv";
    pub const COST_MATRIX_CSV_PATH: &str = "work_matrix.csv";
}

/// Escape strategy once plain local search stalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metaheuristic {
    None,
    GuidedLocalSearch,
}

impl FromStr for Metaheuristic {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Metaheuristic::None),
            "gls" | "guided_local_search" => Ok(Metaheuristic::GuidedLocalSearch),
            other => Err(RouteError::Config(format!("unknown metaheuristic '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Csv,
    Sqlite,
}

impl FromStr for ReferenceSource {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReferenceSource::Csv),
            "sqlite" => Ok(ReferenceSource::Sqlite),
            other => Err(RouteError::Config(format!(
                "unknown reference source '{other}'"
            ))),
        }
    }
}

/// Fuel baseline for one full operational cycle, converted to joules by the calibrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyParams {
    pub fuel_volume_liters: f64,
    pub energy_per_liter_j: f64,
}

impl EnergyParams {
    pub fn total_energy_j(&self) -> f64 {
        self.fuel_volume_liters * self.energy_per_liter_j
    }
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            fuel_volume_liters: constant::FUEL_VOLUME_LITERS,
            energy_per_liter_j: constant::DIESEL_TO_J,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub time_limit: Duration,
    pub metaheuristic: Metaheuristic,
    pub max_iterations: Option<usize>,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(constant::SOLVER_TIME_LIMIT_SECS),
            metaheuristic: Metaheuristic::GuidedLocalSearch,
            max_iterations: None,
            seed: constant::SEED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub mass_policy: MassPolicy,
    pub empty_vehicle_mass_kg: f64,
    pub energy: EnergyParams,
    pub roles: RoleMap,
    pub sentinel_cost: u64,
    pub solver: SolverConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            mass_policy: MassPolicy::CumulativeWithResets,
            empty_vehicle_mass_kg: constant::EMPTY_VEHICLE_MASS_KG,
            energy: EnergyParams::default(),
            roles: RoleMap::default(),
            sentinel_cost: constant::SENTINEL_COST,
            solver: SolverConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Defaults overridden by `.env` / process environment.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut config = OptimizerConfig::default();

        if let Some(policy) = env_parse::<MassPolicy>("MASS_POLICY")? {
            config.mass_policy = policy;
        }
        if let Some(mass) = env_parse::<f64>("EMPTY_VEHICLE_MASS_KG")? {
            config.empty_vehicle_mass_kg = mass;
        }
        if let Some(liters) = env_parse::<f64>("FUEL_VOLUME_LITERS")? {
            config.energy.fuel_volume_liters = liters;
        }
        if let Some(joules) = env_parse::<f64>("ENERGY_PER_LITER_J")? {
            config.energy.energy_per_liter_j = joules;
        }
        if let Some(sentinel) = env_parse::<u64>("SENTINEL_COST")? {
            config.sentinel_cost = sentinel;
        }
        if let Some(secs) = env_parse::<u64>("SOLVER_TIME_LIMIT_SECS")? {
            config.solver.time_limit = Duration::from_secs(secs);
        }
        if let Some(meta) = env_parse::<Metaheuristic>("SOLVER_METAHEURISTIC")? {
            config.solver.metaheuristic = meta;
        }
        if let Some(max_iterations) = env_parse::<usize>("SOLVER_MAX_ITERATIONS")? {
            config.solver.max_iterations = Some(max_iterations);
        }

        assign_roles(
            &mut config.roles,
            env_list("ORIGIN_DEPOTS"),
            env_list("DISPOSAL_SITES"),
        );

        config.validate()?;
        info!(
            "Loaded optimizer config: policy={:?}, empty mass={} kg, time limit={:?}",
            config.mass_policy, config.empty_vehicle_mass_kg, config.solver.time_limit
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.empty_vehicle_mass_kg.is_finite() && self.empty_vehicle_mass_kg >= 0.0) {
            return Err(RouteError::Config(format!(
                "empty vehicle mass must be a non-negative number, got {}",
                self.empty_vehicle_mass_kg
            )));
        }
        if !self.energy.total_energy_j().is_finite() || self.energy.total_energy_j() < 0.0 {
            return Err(RouteError::Config(
                "fuel baseline must be a non-negative energy".to_string(),
            ));
        }
        if self.sentinel_cost == 0 {
            return Err(RouteError::Config("sentinel cost must be positive".to_string()));
        }
        Ok(())
    }
}

/// Settings only the binary needs: where data lives and which providers to call.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub reference_source: ReferenceSource,
    pub osrm_base_url: String,
    pub use_offline_segments: bool,
    pub stops_csv: String,
    pub elevation_csv: String,
    pub weight_csv: String,
    pub alias_csv: String,
    pub segment_csv: String,
    pub work_records_csv: String,
    pub cost_matrix_csv: String,
    pub mpg: Option<f64>,
    pub maintain_order: bool,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let config = Self {
            reference_source: env_parse("REFERENCE_SOURCE")?.unwrap_or(ReferenceSource::Csv),
            osrm_base_url: env_or("OSRM_BASE_URL", constant::OSRM_BASE_URL),
            use_offline_segments: env_parse("OFFLINE_SEGMENTS")?.unwrap_or(false),
            stops_csv: env_or("STOPS_CSV", constant::STOPS_CSV_PATH),
            elevation_csv: env_or("ELEVATION_CSV", constant::ELEVATION_CSV_PATH),
            weight_csv: env_or("WEIGHT_CSV", constant::WEIGHT_CSV_PATH),
            alias_csv: env_or("ALIAS_CSV", constant::ALIAS_CSV_PATH),
            segment_csv: env_or("SEGMENT_CSV", constant::SEGMENT_CSV_PATH),
            work_records_csv: env_or("WORK_RECORDS_CSV", constant::WORK_RECORDS_CSV_PATH),
            cost_matrix_csv: env_or("COST_MATRIX_CSV", constant::COST_MATRIX_CSV_PATH),
            mpg: env_parse("MPG")?,
            maintain_order: env_parse("MAINTAIN_ORDER")?.unwrap_or(false),
        };
        debug!("Runner config: {:?}", config);
        Ok(config)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// A location listed as both depot and disposal site ends up a disposal site.
fn assign_roles(roles: &mut RoleMap, depots: Vec<String>, disposal_sites: Vec<String>) {
    for id in depots {
        roles.insert(id, LocationRole::OriginDepot);
    }
    for id in disposal_sites {
        roles.insert(id, LocationRole::DisposalSite);
    }
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RouteError::Config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}
