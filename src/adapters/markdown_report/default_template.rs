//! Default Markdown report template.
//!
//! Built-in report markup with `{{PLACEHOLDER}}` substitution. A custom
//! template may use any subset of the placeholders.

pub const PLACEHOLDERS: &[&str] = &[
    "{{RUN_SUMMARY}}",
    "{{METRICS_TABLE}}",
    "{{COST_TABLE}}",
    "{{TRADE_LOG}}",
    "{{MONTHLY_RETURNS}}",
];

pub fn template() -> &'static str {
    r#"# Backtest Report

## Run Summary

{{RUN_SUMMARY}}

## Performance Metrics

{{METRICS_TABLE}}

## Costs

{{COST_TABLE}}

## Trade Log

{{TRADE_LOG}}

## Monthly Returns

{{MONTHLY_RETURNS}}
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_every_placeholder() {
        for placeholder in PLACEHOLDERS {
            assert!(template().contains(placeholder), "missing {placeholder}");
        }
    }
}
