//! CSV export of every per-period series, plus the priced trade list.

use std::fs;
use std::path::PathBuf;

use crate::domain::error::VoltraderError;
use crate::ports::report_port::{Report, ReportSink};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn csv_error(e: csv::Error) -> VoltraderError {
    VoltraderError::Io(std::io::Error::other(e.to_string()))
}

/// Undefined values are written as empty cells.
fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Writes `{symbol}_series.csv` and `{symbol}_trades.csv` under `output_dir`.
pub struct CsvSeriesReportAdapter {
    output_dir: PathBuf,
}

impl CsvSeriesReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn series_path(&self, symbol: &str) -> PathBuf {
        self.output_dir.join(format!("{}_series.csv", symbol))
    }

    pub fn trades_path(&self, symbol: &str) -> PathBuf {
        self.output_dir.join(format!("{}_trades.csv", symbol))
    }

    fn write_series(&self, report: &Report) -> Result<(), VoltraderError> {
        let mut wtr = csv::Writer::from_path(self.series_path(&report.symbol)).map_err(csv_error)?;

        let mut header = vec!["timestamp".to_string()];
        header.extend(report.series.iter().map(|(name, _)| name.clone()));
        wtr.write_record(&header).map_err(csv_error)?;

        for (i, ts) in report.timestamps.iter().enumerate() {
            let mut row = vec![ts.format(TIMESTAMP_FORMAT).to_string()];
            row.extend(
                report
                    .series
                    .iter()
                    .map(|(_, values)| cell(values.get(i).copied().unwrap_or(f64::NAN))),
            );
            wtr.write_record(&row).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(&self, report: &Report) -> Result<(), VoltraderError> {
        let mut wtr = csv::Writer::from_path(self.trades_path(&report.symbol)).map_err(csv_error)?;
        wtr.write_record([
            "period",
            "timestamp",
            "contract_diff",
            "direction",
            "execution_price",
            "notional_traded",
            "fees_paid",
            "slippage_paid",
        ])
        .map_err(csv_error)?;

        for trade in &report.trades {
            wtr.write_record([
                trade.period.to_string(),
                trade.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.contract_diff.to_string(),
                trade.direction.to_string(),
                trade.execution_price.to_string(),
                trade.notional_traded.to_string(),
                trade.fees_paid.to_string(),
                trade.slippage_paid.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportSink for CsvSeriesReportAdapter {
    fn write(&self, report: &Report) -> Result<(), VoltraderError> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_series(report)?;
        self.write_trades(report)?;
        tracing::info!(
            dir = %self.output_dir.display(),
            rows = report.timestamps.len(),
            trades = report.trades.len(),
            "series exported"
        );
        Ok(())
    }
}
