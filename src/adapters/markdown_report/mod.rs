//! Markdown report generation.
//!
//! Reads a template (either the built-in default or a custom file), resolves
//! all `{{PLACEHOLDER}}` markers with tables from `tables`, and writes the
//! final `.md` file.

pub mod default_template;
pub mod tables;

use std::fs;
use std::path::PathBuf;

use crate::domain::error::VoltraderError;
use crate::ports::report_port::{Report, ReportSink};

/// Resolve all `{{PLACEHOLDER}}`s in the given template string.
pub fn resolve(template: &str, report: &Report) -> String {
    let mut output = template.to_string();

    output = output.replace("{{RUN_SUMMARY}}", &tables::render_run_summary(report));
    output = output.replace(
        "{{METRICS_TABLE}}",
        &tables::render_metrics_table(&report.snapshot),
    );
    output = output.replace("{{COST_TABLE}}", &tables::render_cost_table(&report.snapshot));
    output = output.replace("{{TRADE_LOG}}", &tables::render_trade_log(&report.trades));

    let returns = report.series("pct_return").unwrap_or_default();
    output = output.replace(
        "{{MONTHLY_RETURNS}}",
        &tables::render_monthly_returns(&report.timestamps, returns),
    );

    output
}

/// Writes `{output_dir}/{symbol}_report.md`.
pub struct MarkdownReportAdapter {
    output_dir: PathBuf,
    template_path: Option<PathBuf>,
}

impl MarkdownReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            template_path: None,
        }
    }

    pub fn with_template(mut self, path: PathBuf) -> Self {
        self.template_path = Some(path);
        self
    }

    pub fn report_path(&self, symbol: &str) -> PathBuf {
        self.output_dir.join(format!("{}_report.md", symbol))
    }
}

impl ReportSink for MarkdownReportAdapter {
    fn write(&self, report: &Report) -> Result<(), VoltraderError> {
        let template = match &self.template_path {
            Some(path) => fs::read_to_string(path)?,
            None => default_template::template().to_string(),
        };
        let markdown = resolve(&template, report);

        fs::create_dir_all(&self.output_dir)?;
        let path = self.report_path(&report.symbol);
        fs::write(&path, markdown)?;
        tracing::info!(path = %path.display(), "markdown report written");
        Ok(())
    }
}
