use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTION: &str = "hold";

const MEDIUM_THRESHOLD: f64 = 40.0;
const HIGH_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    pub fn label(self) -> &'static str {
        match self {
            RiskClass::Low => "🟢 Low Risk",
            RiskClass::Medium => "🟡 Medium Risk",
            RiskClass::High => "🔴 High Risk",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RiskClass::Low => "Portfolio healthy — minimal exposure.",
            RiskClass::Medium => "Moderate exposure — monitor closely.",
            RiskClass::High => "High liquidation risk detected!",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: RiskClass,
    pub message: &'static str,
}

/// Maps a probability in percent to a risk tier. Lower bounds are inclusive.
pub fn classify(probability: f64) -> Classification {
    // NaN compares false everywhere and lands in High
    let class = if probability < MEDIUM_THRESHOLD {
        RiskClass::Low
    } else if probability < HIGH_THRESHOLD {
        RiskClass::Medium
    } else {
        RiskClass::High
    };

    Classification {
        class,
        message: class.message(),
    }
}
