//! CSV report adapter implementing ReportPort.
//!
//! One row per (window, strategy, parameters). Empty cells mark values that
//! do not apply, e.g. test metrics of a rejected candidate.

use std::path::Path;

use crate::domain::error::ForwardtestError;
use crate::domain::walk_forward::ReportRecord;
use crate::ports::report_port::ReportPort;

pub const HEADER: [&str; 14] = [
    "window",
    "period",
    "train_start",
    "test_start",
    "test_end",
    "strategy",
    "params",
    "train_score",
    "sharpe_ratio",
    "total_return",
    "max_drawdown",
    "num_trades",
    "status",
    "note",
];

pub struct CsvReportAdapter;

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

fn row(record: &ReportRecord) -> Vec<String> {
    vec![
        record.window.to_string(),
        record.period.clone(),
        record.train_start.format("%Y-%m-%d").to_string(),
        record.test_start.format("%Y-%m-%d").to_string(),
        record.test_end.format("%Y-%m-%d").to_string(),
        record.strategy.clone(),
        record.params.clone(),
        cell(record.train_score),
        cell(record.sharpe_ratio),
        cell(record.total_return),
        cell(record.max_drawdown),
        record.num_trades.map(|n| n.to_string()).unwrap_or_default(),
        record.status.clone(),
        record.note.clone(),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, records: &[ReportRecord], output_path: &str) -> Result<(), ForwardtestError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ForwardtestError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        for record in records {
            writer.write_record(row(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}
