//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use std::ops::RangeInclusive;

use super::Config;
use crate::error::ConfigError;

/// Allowed conservative base budgets.
pub const CONSERVATIVE_RANGE: RangeInclusive<u32> = 2000..=3000;

/// Allowed balanced base budgets.
pub const BALANCED_RANGE: RangeInclusive<u32> = 3000..=5000;

/// Allowed aggressive base budgets.
pub const AGGRESSIVE_RANGE: RangeInclusive<u32> = 5000..=8000;

/// Smallest provider ceiling accepted.
pub const MIN_CEILING: u32 = 1024;

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.into(),
        reason: reason.into(),
    }
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `TOKEN_SAFETY_MARGIN` must be within (0, 1]
/// - Base budgets must sit in their ranges and strictly increase
/// - Ratio bounds must satisfy `0 < min <= base <= max < 1`
/// - `PROVIDER_MAX_TOKENS` must be at least [`MIN_CEILING`]
/// - Search iterations and expansion width must be nonzero
/// - Depth bounds must satisfy `min <= max` with nonzero tokens per step
#[must_use = "validation result should be checked"]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let budget = &config.budget;

    // NaN fails both comparisons
    if !(budget.safety_margin > 0.0 && budget.safety_margin <= 1.0) {
        return Err(invalid("TOKEN_SAFETY_MARGIN", "must be within (0, 1]"));
    }

    for (var, value, range) in [
        (
            "BUDGET_CONSERVATIVE_BASE",
            budget.conservative_base,
            CONSERVATIVE_RANGE,
        ),
        ("BUDGET_BALANCED_BASE", budget.balanced_base, BALANCED_RANGE),
        (
            "BUDGET_AGGRESSIVE_BASE",
            budget.aggressive_base,
            AGGRESSIVE_RANGE,
        ),
    ] {
        if !range.contains(&value) {
            return Err(invalid(
                var,
                format!("must be between {} and {}", range.start(), range.end()),
            ));
        }
    }

    if budget.conservative_base >= budget.balanced_base
        || budget.balanced_base >= budget.aggressive_base
    {
        return Err(invalid(
            "BUDGET_BALANCED_BASE",
            "base budgets must strictly increase from conservative to aggressive",
        ));
    }

    if !(budget.ratio_min > 0.0
        && budget.ratio_min <= budget.base_ratio
        && budget.base_ratio <= budget.ratio_max
        && budget.ratio_max < 1.0)
    {
        return Err(invalid(
            "reasoning_ratio",
            "bounds must satisfy 0 < min <= base <= max < 1",
        ));
    }

    if budget.provider_max_tokens < MIN_CEILING {
        return Err(invalid(
            "PROVIDER_MAX_TOKENS",
            format!("must be at least {MIN_CEILING}"),
        ));
    }

    if budget.floor_tokens == 0 {
        return Err(invalid("floor_tokens", "must be positive"));
    }

    if config.search.max_iterations == 0 {
        return Err(invalid("SEARCH_MAX_ITERATIONS", "must be at least 1"));
    }

    if config.search.expansion_width == 0 {
        return Err(invalid("SEARCH_EXPANSION_WIDTH", "must be at least 1"));
    }

    let depth = &config.depth;
    if depth.deliberate_min > depth.deliberate_max || depth.hybrid_min > depth.hybrid_max {
        return Err(invalid("depth", "minimum steps must not exceed maximum"));
    }

    if depth.deliberate_tokens_per_step == 0 || depth.hybrid_tokens_per_step == 0 {
        return Err(invalid("depth", "tokens per step must be positive"));
    }

    Ok(())
}
