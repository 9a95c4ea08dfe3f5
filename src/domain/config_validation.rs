//! Configuration validation.
//!
//! Reads the INI sections through [`ConfigPort`] and builds typed configs.
//! Values that are present but unparseable are rejected rather than
//! silently replaced by their defaults.

use std::path::PathBuf;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::VoltraderError;
use crate::domain::instrument::InstrumentSpec;
use crate::domain::price_series::Frequency;
use crate::domain::rule::{Emac, RuleSpec};
use crate::domain::sizing::RiskBudget;
use crate::ports::config_port::ConfigPort;

/// Where the price (and funding) history comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv { dir: PathBuf },
    Sqlite { path: PathBuf },
    Synthetic { seed: u64, periods: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub output_dir: Option<PathBuf>,
    /// Custom Markdown template; the built-in one is used when absent.
    pub template_path: Option<PathBuf>,
    pub export_series: bool,
}

/// Read the typed backtest configuration. Range checks happen in
/// [`Backtest::new`](crate::domain::backtest::Backtest::new).
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, VoltraderError> {
    let defaults = BacktestConfig::default();

    let symbol = required_string(config, "instrument", "symbol")?;
    let instrument = InstrumentSpec {
        symbol,
        contract_unit: read_f64(
            config,
            "instrument",
            "contract_unit",
            defaults.instrument.contract_unit,
        )?,
        trading_days_per_year: read_usize(
            config,
            "instrument",
            "trading_days_per_year",
            defaults.instrument.trading_days_per_year as usize,
        )? as u32,
    };

    let frequency = match config.get_string("data", "frequency") {
        Some(s) => s
            .parse::<Frequency>()
            .map_err(|e| VoltraderError::invalid("data", "frequency", e.to_string()))?,
        None => defaults.frequency,
    };

    let risk = RiskBudget {
        trading_capital: read_f64(
            config,
            "account",
            "trading_capital",
            defaults.risk.trading_capital,
        )?,
        annual_risk_target: read_f64(
            config,
            "account",
            "annual_risk_target",
            defaults.risk.annual_risk_target,
        )?,
    };

    let rule = build_rule(config)?;

    let rebalance_threshold = read_f64(
        config,
        "strategy",
        "rebalance_threshold",
        defaults.rebalance_threshold,
    )?;

    let min_calibration_periods = match config.get_string("strategy", "min_calibration_periods") {
        Some(_) => Some(read_usize(config, "strategy", "min_calibration_periods", 0)?),
        None => None,
    };

    Ok(BacktestConfig {
        instrument,
        frequency,
        risk,
        rule,
        vol_span: read_usize(config, "strategy", "vol_span", defaults.vol_span)?,
        vol_min_periods: read_usize(
            config,
            "strategy",
            "vol_min_periods",
            defaults.vol_min_periods,
        )?,
        forecast_target: read_f64(
            config,
            "strategy",
            "forecast_target",
            defaults.forecast_target,
        )?,
        forecast_cap: read_f64(config, "strategy", "forecast_cap", defaults.forecast_cap)?,
        min_calibration_periods,
        rebalance_threshold,
        fee_fraction: read_percent(config, "costs", "fee_pct", defaults.fee_fraction * 100.0)?,
        slippage_fraction: read_percent(
            config,
            "costs",
            "slippage_pct",
            defaults.slippage_fraction * 100.0,
        )?,
    })
}

fn build_rule(config: &dyn ConfigPort) -> Result<RuleSpec, VoltraderError> {
    let name = config
        .get_string("strategy", "rule")
        .unwrap_or_else(|| "emac".to_string());
    match name.trim().to_ascii_lowercase().as_str() {
        "emac" => {
            let fast = read_usize(config, "strategy", "fast_span", Emac::DEFAULT_FAST_SPAN)?;
            let slow = match config.get_string("strategy", "slow_span") {
                Some(_) => Some(read_usize(config, "strategy", "slow_span", 0)?),
                None => None,
            };
            let emac = Emac::new(fast, slow)?;
            Ok(RuleSpec::Emac {
                fast_span: emac.fast_span(),
                slow_span: emac.slow_span(),
            })
        }
        other => Err(VoltraderError::invalid(
            "strategy",
            "rule",
            format!("unknown rule '{other}' (expected emac)"),
        )),
    }
}

/// Resolve the `[data]` section.
pub fn build_data_source(config: &dyn ConfigPort) -> Result<DataSource, VoltraderError> {
    let kind = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match kind.trim().to_ascii_lowercase().as_str() {
        "csv" => Ok(DataSource::Csv {
            dir: PathBuf::from(required_string(config, "data", "csv_dir")?),
        }),
        "sqlite" => Ok(DataSource::Sqlite {
            path: PathBuf::from(required_string(config, "data", "sqlite_path")?),
        }),
        "synthetic" => {
            let periods = read_usize(config, "data", "periods", 1000)?;
            if periods < 2 {
                return Err(VoltraderError::invalid(
                    "data",
                    "periods",
                    "periods must be at least 2",
                ));
            }
            Ok(DataSource::Synthetic {
                seed: read_usize(config, "data", "seed", 42)? as u64,
                periods,
            })
        }
        other => Err(VoltraderError::invalid(
            "data",
            "source",
            format!("unknown source '{other}' (expected csv, sqlite or synthetic)"),
        )),
    }
}

pub fn build_report_config(config: &dyn ConfigPort) -> ReportConfig {
    ReportConfig {
        output_dir: config
            .get_string("report", "output_dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from),
        template_path: config.get_string("report", "template_path").map(PathBuf::from),
        export_series: config.get_bool("report", "export_series", false),
    }
}

fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, VoltraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(VoltraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, VoltraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| VoltraderError::invalid(section, key, format!("'{s}' is not a number"))),
    }
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, VoltraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse::<usize>().map_err(|_| {
            VoltraderError::invalid(
                section,
                key,
                format!("'{s}' is not a non-negative integer"),
            )
        }),
    }
}

/// Percent in the file, fraction in the config.
fn read_percent(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default_pct: f64,
) -> Result<f64, VoltraderError> {
    let pct = read_f64(config, section, key, default_pct)?;
    if pct < 0.0 {
        return Err(VoltraderError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::backtest::Backtest;
    use crate::domain::rebalance::Rebalancer;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const FULL: &str = r#"
[data]
source = csv
csv_dir = ./data
frequency = 4H

[instrument]
symbol = ETHUSDT
contract_unit = 0.1
trading_days_per_year = 365

[account]
trading_capital = 50000
annual_risk_target = 0.25

[strategy]
rule = emac
fast_span = 16
vol_span = 25
forecast_target = 10
forecast_cap = 20
rebalance_threshold = 0.2

[costs]
fee_pct = 0.1
slippage_pct = 0.05

[report]
output_dir = ./out
export_series = true
"#;

    #[test]
    fn valid_config_builds() {
        let config = build_backtest_config(&make_config(FULL)).unwrap();
        assert_eq!(config.instrument.symbol, "ETHUSDT");
        assert_eq!(config.instrument.contract_unit, 0.1);
        assert_eq!(config.frequency, "4H".parse().unwrap());
        assert_eq!(config.risk.trading_capital, 50_000.0);
        assert_eq!(
            config.rule,
            RuleSpec::Emac {
                fast_span: 16,
                slow_span: 64
            }
        );
        assert_eq!(config.vol_span, 25);
        assert_eq!(config.vol_min_periods, 10);
        assert_eq!(config.min_calibration_periods, None);
        assert!((config.fee_fraction - 0.001).abs() < 1e-15);
        assert!((config.slippage_fraction - 0.0005).abs() < 1e-15);
        assert_eq!(config.rebalance_threshold, 0.2);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = build_backtest_config(&make_config("[instrument]\nsymbol = BTC\n")).unwrap();
        let defaults = BacktestConfig::default();
        assert_eq!(config.instrument.symbol, "BTC");
        assert_eq!(config.risk, defaults.risk);
        assert_eq!(config.rule, defaults.rule);
        assert_eq!(config.fee_fraction, defaults.fee_fraction);
        assert_eq!(config.frequency, Frequency::DAILY);
    }

    #[test]
    fn missing_symbol_fails() {
        let err = build_backtest_config(&make_config("[account]\ntrading_capital = 100\n"))
            .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigMissing { key, .. } if key == "symbol"));
    }

    fn built(content: &str) -> Result<Backtest, VoltraderError> {
        build_backtest_config(&make_config(content)).and_then(Backtest::new)
    }

    #[test]
    fn negative_capital_fails() {
        let err = built("[instrument]\nsymbol = BTC\n[account]\ntrading_capital = -5\n")
            .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "trading_capital"));
    }

    #[test]
    fn non_numeric_value_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[account]\nannual_risk_target = lots\n",
        ))
        .unwrap_err();
        assert!(
            matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "annual_risk_target")
        );
    }

    #[test]
    fn threshold_out_of_range_is_left_to_backtest() {
        let content = "[instrument]\nsymbol = BTC\n[strategy]\nrebalance_threshold = 10\n";
        let config = build_backtest_config(&make_config(content)).unwrap();
        assert_eq!(config.rebalance_threshold, 10.0);

        let err = built(content).unwrap_err();
        assert_eq!(err.to_string(), Rebalancer::new(10.0).unwrap_err().to_string());
        assert!(
            matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "rebalance_threshold")
        );
    }

    #[test]
    fn negative_fee_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[costs]\nfee_pct = -0.1\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "fee_pct"));
    }

    #[test]
    fn zero_span_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[strategy]\nfast_span = 0\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "fast_span"));
    }

    #[test]
    fn fast_not_below_slow_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[strategy]\nfast_span = 20\nslow_span = 10\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "slow_span"));
    }

    #[test]
    fn unknown_rule_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[strategy]\nrule = breakout\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "rule"));
    }

    #[test]
    fn bad_frequency_fails() {
        let err = build_backtest_config(&make_config(
            "[instrument]\nsymbol = BTC\n[data]\nfrequency = fortnightly\n",
        ))
        .unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "frequency"));
    }

    #[test]
    fn data_sources() {
        assert_eq!(
            build_data_source(&make_config(FULL)).unwrap(),
            DataSource::Csv {
                dir: PathBuf::from("./data")
            }
        );
        assert_eq!(
            build_data_source(&make_config("[data]\nsource = synthetic\nseed = 7\n")).unwrap(),
            DataSource::Synthetic {
                seed: 7,
                periods: 1000
            }
        );
        let err = build_data_source(&make_config("[data]\nsource = sqlite\n")).unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigMissing { key, .. } if key == "sqlite_path"));
        assert!(build_data_source(&make_config("[data]\nsource = ftp\n")).is_err());
    }

    #[test]
    fn report_config() {
        let report = build_report_config(&make_config(FULL));
        assert_eq!(report.output_dir, Some(PathBuf::from("./out")));
        assert!(report.export_series);

        let empty = build_report_config(&make_config("[report]\n"));
        assert_eq!(empty.output_dir, None);
        assert_eq!(empty.template_path, None);
        assert!(!empty.export_series);
    }
}
