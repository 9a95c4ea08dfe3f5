//! Markdown table rendering for reports.

use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeMap;

use crate::domain::costs::TradeEvent;
use crate::domain::performance::PerformanceSnapshot;
use crate::ports::report_port::Report;

/// Trades shown in the log before it is truncated.
pub const MAX_TRADE_ROWS: usize = 200;

fn fmt_currency(value: f64) -> String {
    if value >= 0.0 {
        format!("${:.2}", value)
    } else {
        format!("-${:.2}", value.abs())
    }
}

/// Undefined statistics render as `n/a` rather than `NaN`.
fn fmt_num(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "n/a".to_string()
    }
}

pub fn render_run_summary(report: &Report) -> String {
    let mut output = String::from("| Property | Value |\n| --- | --- |\n");
    output.push_str(&format!("| Symbol | {} |\n", report.symbol));
    output.push_str(&format!("| Rule | {} |\n", report.rule_name));
    output.push_str(&format!("| Periods | {} |\n", report.snapshot.periods));
    if let (Some(first), Some(last)) = (report.timestamps.first(), report.timestamps.last()) {
        output.push_str(&format!("| Start | {} |\n", first));
        output.push_str(&format!("| End | {} |\n", last));
    }
    output
}

pub fn render_metrics_table(m: &PerformanceSnapshot) -> String {
    let mut output = String::from("| Metric | Value |\n| --- | --- |\n");
    output.push_str(&format!("| Total Return | {}% |\n", fmt_num(m.total_return, 2)));
    output.push_str(&format!(
        "| Annualized Return | {}% |\n",
        fmt_num(m.annualized_return, 2)
    ));
    output.push_str(&format!(
        "| Annualized Volatility | {}% |\n",
        fmt_num(m.annualized_volatility, 2)
    ));
    output.push_str(&format!(
        "| Sharpe (pre-cost) | {} |\n",
        fmt_num(m.sharpe_pre_cost, 2)
    ));
    output.push_str(&format!(
        "| Sharpe (post-cost) | {} |\n",
        fmt_num(m.sharpe_post_cost, 2)
    ));
    output.push_str(&format!("| Cost Drag (SR) | {} |\n", fmt_num(m.cost_drag, 3)));
    output.push_str(&format!(
        "| Instrument Sharpe | {} |\n",
        fmt_num(m.instrument_sharpe, 2)
    ));
    output.push_str(&format!("| Turnover | {}x / year |\n", fmt_num(m.turnover, 1)));
    output.push_str(&format!("| Skew | {} |\n", fmt_num(m.skew, 2)));
    output.push_str(&format!("| Left Tail Ratio | {} |\n", fmt_num(m.left_tail, 2)));
    output.push_str(&format!("| Right Tail Ratio | {} |\n", fmt_num(m.right_tail, 2)));
    output.push_str(&format!(
        "| Max Drawdown | {} pp |\n",
        fmt_num(m.max_drawdown, 2)
    ));
    output.push_str(&format!(
        "| Max Drawdown Duration | {} periods |\n",
        m.max_drawdown_duration
    ));
    output.push_str(&format!("| Trades | {} |\n", m.trade_count));
    output
}

pub fn render_cost_table(m: &PerformanceSnapshot) -> String {
    let mut output = String::from("| Cost | Amount |\n| --- | --- |\n");
    output.push_str(&format!("| Fees | {} |\n", fmt_currency(m.total_fees)));
    output.push_str(&format!("| Slippage | {} |\n", fmt_currency(m.total_slippage)));
    output.push_str(&format!("| Funding | {} |\n", fmt_currency(m.total_funding)));
    output.push_str(&format!(
        "| Total | {} |\n",
        fmt_currency(m.total_fees + m.total_slippage + m.total_funding)
    ));
    output
}

pub fn render_trade_log(trades: &[TradeEvent]) -> String {
    if trades.is_empty() {
        return String::from("No trades executed.\n");
    }

    let mut output = String::from(
        "| # | Time | Side | Contracts | Exec Price | Notional | Fees | Slippage |\n",
    );
    output.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for (i, trade) in trades.iter().take(MAX_TRADE_ROWS).enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} | {:.4} | {:.2} | {} | {} | {} |\n",
            i + 1,
            trade.timestamp,
            if trade.contract_diff >= 0.0 { "BUY" } else { "SELL" },
            trade.contract_diff.abs(),
            trade.execution_price,
            fmt_currency(trade.notional_traded.abs()),
            fmt_currency(trade.fees_paid),
            fmt_currency(trade.slippage_paid),
        ));
    }
    if trades.len() > MAX_TRADE_ROWS {
        output.push_str(&format!(
            "\n_{} more trades omitted._\n",
            trades.len() - MAX_TRADE_ROWS
        ));
    }
    output
}

/// Monthly sums of per-period percent returns (additive, like the drawdown).
pub fn compute_monthly_returns(
    timestamps: &[NaiveDateTime],
    returns: &[f64],
) -> BTreeMap<(i32, u32), f64> {
    let mut monthly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (ts, r) in timestamps.iter().zip(returns) {
        if r.is_nan() {
            continue;
        }
        *monthly.entry((ts.year(), ts.month())).or_insert(0.0) += r;
    }
    monthly
}

pub fn render_monthly_returns(timestamps: &[NaiveDateTime], returns: &[f64]) -> String {
    let monthly = compute_monthly_returns(timestamps, returns);
    if monthly.is_empty() {
        return String::from("_Insufficient data for monthly returns._\n");
    }

    let mut output = String::from("| Year | Month | Return |\n| --- | --- | --- |\n");
    for ((year, month), ret) in monthly {
        output.push_str(&format!(
            "| {} | {} | {:.2}% |\n",
            year,
            month_to_name(month),
            ret
        ));
    }
    output
}

fn month_to_name(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "???",
    }
}
