use std::io::Write;

use colored::*;
use csv::Writer;

use crate::domain::types::WorkRecord;
use crate::error::{Result, RouteError};
use crate::evaluation::CostUnit;
use crate::pipeline::optimize::OptimizeResponse;
use crate::solver::CostMatrix;

fn unit_label(unit: CostUnit) -> &'static str {
    match unit {
        CostUnit::Joules => "J",
        CostUnit::Meters => "m",
    }
}

pub fn write_work_records<W: Write>(records: &[WorkRecord], writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)
            .map_err(|e| RouteError::upstream("csv:work_records", e))?;
    }
    wtr.flush()
        .map_err(|e| RouteError::upstream("csv:work_records", e))?;
    Ok(())
}

pub fn save_work_records(records: &[WorkRecord], filename: &str) -> Result<()> {
    let file = std::fs::File::create(filename)
        .map_err(|e| RouteError::upstream(format!("csv:{filename}"), e))?;
    write_work_records(records, file)
}

/// Square CSV of solver arc costs, one labelled row per origin.
pub fn write_cost_matrix<W: Write>(
    matrix: &CostMatrix,
    labels: &[String],
    writer: W,
) -> Result<()> {
    if labels.len() != matrix.size() {
        return Err(RouteError::Config(format!(
            "{} labels for a {}x{} cost matrix",
            labels.len(),
            matrix.size(),
            matrix.size()
        )));
    }
    let mut wtr = Writer::from_writer(writer);
    let header = std::iter::once("").chain(labels.iter().map(String::as_str));
    wtr.write_record(header)
        .map_err(|e| RouteError::upstream("csv:cost_matrix", e))?;
    for (i, label) in labels.iter().enumerate() {
        let mut row = vec![label.clone()];
        row.extend((0..matrix.size()).map(|j| matrix.get(i, j).to_string()));
        wtr.write_record(&row)
            .map_err(|e| RouteError::upstream("csv:cost_matrix", e))?;
    }
    wtr.flush()
        .map_err(|e| RouteError::upstream("csv:cost_matrix", e))?;
    Ok(())
}

pub fn save_cost_matrix(matrix: &CostMatrix, labels: &[String], filename: &str) -> Result<()> {
    let file = std::fs::File::create(filename)
        .map_err(|e| RouteError::upstream(format!("csv:{filename}"), e))?;
    write_cost_matrix(matrix, labels, file)
}

/// Human-readable summary lines; savings in green, regressions in red.
pub fn summary_lines(response: &OptimizeResponse) -> Vec<String> {
    let unit = unit_label(response.unit);
    let order = response
        .ordered_stops
        .iter()
        .map(|s| s.location.as_str())
        .collect::<Vec<_>>()
        .join(" -> ");

    let mut lines = vec![
        format!("Route: {}", order),
        format!("Total cost: {:.2} {}", response.total_cost, unit),
    ];
    if let (Some(calibrated), Some(calibration)) = (response.calibrated_total, response.calibration)
    {
        lines.push(format!(
            "Calibrated total: {:.2} {} (w_ext {:.2}, signed {:.2})",
            calibrated,
            unit,
            calibration.w_ext(),
            calibration.signed
        ));
    }

    if let Some(cmp) = &response.comparison {
        lines.push(format!(
            "Sequential: {:.2} {} over {:.2} km | Optimized: {:.2} {} over {:.2} km",
            cmp.original_cost,
            unit,
            cmp.original_distance_km,
            cmp.optimized_cost,
            unit,
            cmp.optimized_distance_km
        ));
        let savings = format!("Savings: {:.2} {} ({:.2}%)", cmp.savings, unit, cmp.savings_pct);
        lines.push(if cmp.savings >= 0.0 {
            savings.green().to_string()
        } else {
            savings.red().to_string()
        });
        if let (Some(before), Some(after)) = (cmp.original_gallons, cmp.optimized_gallons) {
            lines.push(format!("Fuel: {:.3} gal -> {:.3} gal", before, after));
        }
    }
    lines
}

pub fn print_summary(response: &OptimizeResponse) {
    for line in summary_lines(response) {
        println!("{}", line);
    }
}
