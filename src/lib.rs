pub mod config;
pub mod database;
pub mod distance;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod solver;

pub use error::{Result, RouteError};
