use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Decides which incoming fields count as "present" when merging a payload
/// into an existing row.
///
/// Absent fields never overwrite stored values under either policy. Empty or
/// whitespace-only strings are always absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Any supplied value is applied, zero included. Deployments that still
    /// expect zero to mean "not sent" select `truthy`.
    #[default]
    PresentValues,
    /// Zero numbers are treated like missing values (legacy clients).
    TruthyValues,
}

impl MergePolicy {
    pub fn int(self, value: Option<i32>) -> Option<i32> {
        match self {
            MergePolicy::PresentValues => value,
            MergePolicy::TruthyValues => value.filter(|v| *v != 0),
        }
    }

    pub fn float(self, value: Option<f64>) -> Option<f64> {
        match self {
            MergePolicy::PresentValues => value,
            MergePolicy::TruthyValues => value.filter(|v| *v != 0.0),
        }
    }

    pub fn text(self, value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    /// Enumerated codes (gender, prediction labels) are present whenever supplied.
    pub fn code(self, value: Option<i32>) -> Option<i32> {
        value
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::PresentValues => write!(f, "present"),
            MergePolicy::TruthyValues => write!(f, "truthy"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "present_values" => Ok(MergePolicy::PresentValues),
            "truthy" | "truthy_values" | "legacy" => Ok(MergePolicy::TruthyValues),
            other => Err(format!("unknown merge policy '{}'", other)),
        }
    }
}
