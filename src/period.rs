//! Lookback periods: `"7d"`-style strings resolved to a capped day count.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Bounded lookback window in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    days: u32,
}

impl Period {
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Canonical cache key component, e.g. `"7d"`.
    pub fn key(&self) -> String {
        format!("{}d", self.days)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days)
    }
}

/// Strict parse of `"<n>d"` (after trim + lowercase). Zero days is rejected.
fn parse_days(input: &str) -> Option<u32> {
    let normalized = input.trim().to_lowercase();
    let digits = normalized.strip_suffix('d')?;
    match digits.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(days) => Some(days),
    }
}

/// Resolves user-supplied period strings against the configured default/max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodPolicy {
    default_days: u32,
    max_days: u32,
}

impl PeriodPolicy {
    pub fn new(default_days: u32, max_days: u32) -> Self {
        let max_days = max_days.max(1);
        Self {
            default_days: default_days.clamp(1, max_days),
            max_days,
        }
    }

    /// Built from the `analysis` config section. Unparsable configured values
    /// fall back to the built-in `7d` / `14d`.
    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        let max_days = parse_days(&cfg.max_period).unwrap_or_else(|| {
            tracing::warn!(value = %cfg.max_period, "Invalid max_period, using 14d");
            14
        });
        let default_days = parse_days(&cfg.default_period).unwrap_or_else(|| {
            tracing::warn!(value = %cfg.default_period, "Invalid default_period, using 7d");
            7
        });
        Self::new(default_days, max_days)
    }

    pub fn max_days(&self) -> u32 {
        self.max_days
    }

    pub fn default_period(&self) -> Period {
        Period {
            days: self.default_days,
        }
    }

    /// Resolve raw input. Absent, blank or malformed input gives the default
    /// period; valid input is capped at the maximum.
    pub fn resolve(&self, input: Option<&str>) -> Period {
        let Some(raw) = input.filter(|s| !s.trim().is_empty()) else {
            return self.default_period();
        };

        match parse_days(raw) {
            Some(days) => Period {
                days: days.min(self.max_days),
            },
            None => {
                tracing::warn!(input = %raw, "Unrecognized period format, using default");
                self.default_period()
            }
        }
    }
}

impl Default for PeriodPolicy {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
