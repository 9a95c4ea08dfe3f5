//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_series_report::CsvSeriesReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::adapters::price_reader::PriceReader;
use crate::adapters::synthetic_adapter::{SyntheticAdapter, SyntheticModel};
use crate::domain::backtest::{Backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    DataSource, ReportConfig, build_backtest_config, build_data_source, build_report_config,
};
use crate::domain::error::VoltraderError;
use crate::domain::instrument::Instrument;
use crate::domain::price_series::Frequency;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{FundingRateSource, PriceSeriesSource, PriceStore};
use crate::ports::report_port::{Report, ReportSink};

/// Sections the config reader understands.
pub const KNOWN_SECTIONS: &[&str] = &["data", "instrument", "account", "strategy", "costs", "report"];

const DEFAULT_REPORT_DIR: &str = "reports";

/// Synthetic series start here so repeated runs share timestamps.
pub fn synthetic_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

#[derive(Parser, Debug)]
#[command(
    name = "voltrader",
    about = "Volatility-targeted position sizing and rebalancing backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [instrument] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Report directory, overriding [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write a seeded synthetic price series as CSV
    Synth {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 1000)]
        periods: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Directory for `{symbol}.csv`
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "1D")]
        frequency: String,
        #[arg(long, value_enum, default_value_t = ModelKind::Gbm)]
        model: ModelKind,
        /// Also write a constant-rate `{symbol}_funding.csv`
        #[arg(long)]
        funding_rate: Option<f64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Gbm,
    Trend,
}

impl ModelKind {
    fn model(self, periods_per_year: f64) -> SyntheticModel {
        match self {
            ModelKind::Gbm => SyntheticModel::Gbm {
                initial_price: 100.0,
                mu: 0.1,
                sigma: 0.6,
                periods_per_year,
            },
            ModelKind::Trend => SyntheticModel::Trend {
                initial_price: 100.0,
                cycle: 120,
                amplitude: 1.0,
                sigma: 0.02,
            },
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest(&config, symbol.as_deref(), output.as_ref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Synth {
            symbol,
            periods,
            seed,
            output,
            frequency,
            model,
            funding_rate,
        } => run_synth(&symbol, periods, seed, &output, &frequency, model, funding_rate),
    }
}

fn fail(err: VoltraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Everything a run needs, resolved from one config file.
pub struct RunPlan {
    pub backtest: BacktestConfig,
    pub source: DataSource,
    pub report: ReportConfig,
}

pub fn build_run_plan(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<RunPlan, VoltraderError> {
    let mut backtest = build_backtest_config(config)?;
    if let Some(symbol) = symbol_override {
        backtest.instrument.symbol = symbol.to_string();
    }
    Ok(RunPlan {
        backtest,
        source: build_data_source(config)?,
        report: build_report_config(config),
    })
}

/// Fetch prices and funding, then run the pipeline.
pub fn execute<S>(store: S, config: &BacktestConfig) -> Result<BacktestResult, VoltraderError>
where
    S: PriceStore + FundingRateSource,
{
    let backtest = Backtest::new(config.clone())?;
    let symbol = &config.instrument.symbol;
    let reader = PriceReader::new(store);
    let prices = reader.fetch_price_series(symbol, config.frequency)?;
    let funding = reader.fetch_funding_series(symbol)?;
    let instrument = Instrument::new(config.instrument.clone(), prices)?;
    backtest.run(&instrument, &funding)
}

/// Dispatch on the configured source; SQLite needs the `sqlite` feature.
pub fn execute_from_source(
    source: &DataSource,
    config: &BacktestConfig,
) -> Result<BacktestResult, VoltraderError> {
    match source {
        DataSource::Csv { dir } => execute(CsvAdapter::new(dir.clone()), config),
        DataSource::Synthetic { seed, periods } => {
            let store = SyntheticAdapter::new(
                &config.instrument.symbol,
                ModelKind::Gbm.model(config.instrument.trading_days_per_year as f64),
                *seed,
                *periods,
                synthetic_start(),
                config.frequency,
            );
            execute(store, config)
        }
        #[cfg(feature = "sqlite")]
        DataSource::Sqlite { path } => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            if !path.exists() {
                return Err(VoltraderError::Source {
                    reason: format!("sqlite database not found: {}", path.display()),
                });
            }
            execute(SqliteAdapter::open(path, 1)?, config)
        }
        #[cfg(not(feature = "sqlite"))]
        DataSource::Sqlite { .. } => Err(VoltraderError::Source {
            reason: "sqlite feature is required for source = sqlite".into(),
        }),
    }
}

fn list_symbols_from_source(source: &DataSource, symbol: &str) -> Result<Vec<String>, VoltraderError> {
    match source {
        DataSource::Csv { dir } => CsvAdapter::new(dir.clone()).list_symbols(),
        DataSource::Synthetic { .. } => Ok(vec![symbol.to_string()]),
        #[cfg(feature = "sqlite")]
        DataSource::Sqlite { path } => {
            crate::adapters::sqlite_adapter::SqliteAdapter::open(path, 1)?.list_symbols()
        }
        #[cfg(not(feature = "sqlite"))]
        DataSource::Sqlite { .. } => Err(VoltraderError::Source {
            reason: "sqlite feature is required for source = sqlite".into(),
        }),
    }
}

/// Write the Markdown summary and, when enabled, the series CSVs.
pub fn write_reports(
    report: &Report,
    settings: &ReportConfig,
    output_override: Option<&PathBuf>,
) -> Result<PathBuf, VoltraderError> {
    let dir = output_override
        .cloned()
        .or_else(|| settings.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR));

    let mut markdown = MarkdownReportAdapter::new(dir.clone());
    if let Some(template) = &settings.template_path {
        markdown = markdown.with_template(template.clone());
    }
    markdown.write(report)?;

    if settings.export_series {
        CsvSeriesReportAdapter::new(dir.clone()).write(report)?;
    }
    Ok(dir)
}

fn print_summary(result: &BacktestResult) {
    let m = &result.snapshot;
    eprintln!("\n=== Results: {} / {} ===", result.symbol, result.rule_name);
    eprintln!("Periods:          {}", m.periods);
    eprintln!("Total Return:     {:.2}%", m.total_return);
    eprintln!("Annualized:       {:.2}%", m.annualized_return);
    eprintln!("Volatility:       {:.2}%", m.annualized_volatility);
    eprintln!("Sharpe (pre):     {:.2}", m.sharpe_pre_cost);
    eprintln!("Sharpe (post):    {:.2}", m.sharpe_post_cost);
    eprintln!("Instrument SR:    {:.2}", m.instrument_sharpe);
    eprintln!("Turnover:         {:.1}x", m.turnover);
    eprintln!("Skew:             {:.2}", m.skew);
    eprintln!("Max Drawdown:     {:.2} pp", m.max_drawdown);
    eprintln!("Trades:           {}", m.trade_count);
    eprintln!(
        "Costs:            fees ${:.2}, slippage ${:.2}, funding ${:.2}",
        m.total_fees, m.total_slippage, m.total_funding
    );
}

fn run_backtest(config_path: &PathBuf, symbol: Option<&str>, output: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate typed config
    let plan = match build_run_plan(&adapter, symbol) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 3: Fetch data and run
    eprintln!(
        "Running backtest: {} at {} ({})",
        plan.backtest.instrument.symbol, plan.backtest.frequency, plan.backtest.rule
    );
    let result = match execute_from_source(&plan.source, &plan.backtest) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 4: Console summary
    print_summary(&result);

    // Stage 5: Reports
    match write_reports(&Report::from_result(&result), &plan.report, output) {
        Ok(dir) => {
            eprintln!("\nReport written to: {}", dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn describe_plan(plan: &RunPlan) {
    let c = &plan.backtest;
    eprintln!("\nInstrument:");
    eprintln!("  symbol: {}", c.instrument.symbol);
    eprintln!("  contract_unit: {}", c.instrument.contract_unit);
    eprintln!("  trading_days_per_year: {}", c.instrument.trading_days_per_year);
    eprintln!("  frequency: {}", c.frequency);
    eprintln!("\nData source: {:?}", plan.source);
    eprintln!("\nAccount:");
    eprintln!("  trading_capital: {}", c.risk.trading_capital);
    eprintln!("  annual_risk_target: {}", c.risk.annual_risk_target);
    eprintln!("\nStrategy:");
    eprintln!("  rule: {}", c.rule);
    eprintln!("  vol_span: {} (min periods {})", c.vol_span, c.vol_min_periods);
    eprintln!("  forecast target/cap: {} / {}", c.forecast_target, c.forecast_cap);
    match c.min_calibration_periods {
        Some(n) => eprintln!("  min_calibration_periods: {}", n),
        None => eprintln!(
            "  min_calibration_periods: {} (default)",
            2 * c.instrument.trading_days_per_year
        ),
    }
    eprintln!("  rebalance_threshold: {}", c.rebalance_threshold);
    eprintln!("\nCosts:");
    eprintln!("  fee: {}", c.fee_fraction);
    eprintln!("  slippage: {}", c.slippage_fraction);
}

pub fn run_dry_run(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let plan = match build_run_plan(&adapter, symbol) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    if let Err(e) = Backtest::new(plan.backtest.clone()) {
        return fail(e);
    }
    eprintln!("Config validated successfully");
    describe_plan(&plan);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    for section in adapter.sections() {
        if !KNOWN_SECTIONS.contains(&section.as_str()) {
            eprintln!("warning: unknown section [{}] ignored", section);
        }
    }

    let plan = match build_run_plan(&adapter, None) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let backtest = match Backtest::new(plan.backtest) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };

    eprintln!("  Rule: {}", backtest.rule_name());
    eprintln!("\nConfig is valid");
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let source = match build_data_source(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let symbol = adapter
        .get_string("instrument", "symbol")
        .unwrap_or_default();

    match list_symbols_from_source(&source, &symbol) {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found");
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for s in &symbols {
                println!("{}", s);
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Write `{dir}/{symbol}.csv` (and optionally the funding file) in the
/// layout `CsvAdapter` reads.
pub fn write_synthetic_csv(
    adapter: &SyntheticAdapter,
    symbol: &str,
    dir: &Path,
) -> Result<usize, VoltraderError> {
    let to_io = |e: csv::Error| VoltraderError::Io(std::io::Error::other(e.to_string()));
    fs::create_dir_all(dir)?;

    let points = adapter.fetch_raw(symbol)?;
    let mut wtr = csv::Writer::from_path(dir.join(format!("{}.csv", symbol))).map_err(to_io)?;
    wtr.write_record(["timestamp", "close"]).map_err(to_io)?;
    for p in &points {
        wtr.write_record([
            p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            p.close.to_string(),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;

    let funding = adapter.fetch_funding_series(symbol)?;
    if !funding.is_empty() {
        let path = dir.join(format!("{}_funding.csv", symbol));
        let mut wtr = csv::Writer::from_path(path).map_err(to_io)?;
        wtr.write_record(["timestamp", "funding_rate"]).map_err(to_io)?;
        for f in &funding {
            wtr.write_record([
                f.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                f.rate.to_string(),
            ])
            .map_err(to_io)?;
        }
        wtr.flush()?;
    }
    Ok(points.len())
}

fn run_synth(
    symbol: &str,
    periods: usize,
    seed: u64,
    output: &Path,
    frequency: &str,
    model: ModelKind,
    funding_rate: Option<f64>,
) -> ExitCode {
    let frequency: Frequency = match frequency.parse() {
        Ok(f) => f,
        Err(e) => {
            return fail(VoltraderError::invalid(
                "synth",
                "frequency",
                format!("{e}"),
            ));
        }
    };
    if periods < 2 {
        return fail(VoltraderError::invalid(
            "synth",
            "periods",
            "periods must be at least 2",
        ));
    }

    let periods_per_year = (365.0 * 86_400.0) / frequency.seconds() as f64;
    let mut adapter = SyntheticAdapter::new(
        symbol,
        model.model(periods_per_year),
        seed,
        periods,
        synthetic_start(),
        frequency,
    );
    if let Some(rate) = funding_rate {
        adapter = adapter.with_funding_rate(rate);
    }

    match write_synthetic_csv(&adapter, symbol, output) {
        Ok(rows) => {
            eprintln!(
                "Wrote {} {} periods for {} to {}",
                rows,
                frequency,
                symbol,
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
