//! AI ratio arithmetic shared by every mutator.
//!
//! All injected counts come from one rule: `ai = floor(total * r)` and
//! `human = total - ai`. Percentages are `r * 100` exactly and are never
//! recomputed from the rounded counts.

use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_AI_RATIO;
use crate::error::{InjectError, Result};

/// Fraction of a unit of work attributed to AI, within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AiRatio(f64);

impl AiRatio {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InjectError::InvalidRatio(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percentage(self) -> f64 {
        self.0 * 100.0
    }

    /// Number of AI lines out of `total`, rounded down.
    pub fn ai_count(self, total: u64) -> u64 {
        // f64 rounding can push the product past total for huge counts
        ((total as f64 * self.0).floor() as u64).min(total)
    }

    pub fn split(self, total: u64) -> Split {
        let ai = self.ai_count(total);
        Split {
            ai,
            human: total - ai,
        }
    }
}

impl Default for AiRatio {
    fn default() -> Self {
        Self(DEFAULT_AI_RATIO)
    }
}

impl fmt::Display for AiRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.percentage())
    }
}

impl FromStr for AiRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", s))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}

/// AI/human partition of a line count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Split {
    pub ai: u64,
    pub human: u64,
}

impl Split {
    pub fn total(&self) -> u64 {
        self.ai + self.human
    }

    /// Share of AI lines in percent, 0 when there is nothing to share.
    pub fn ai_percentage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.ai as f64 / total as f64 * 100.0,
        }
    }
}

impl std::ops::Add for Split {
    type Output = Split;

    fn add(self, other: Split) -> Split {
        Split {
            ai: self.ai + other.ai,
            human: self.human + other.human,
        }
    }
}
