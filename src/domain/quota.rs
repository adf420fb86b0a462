use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
    #[serde(other)]
    Unknown,
}

/// One metered resource: how much was consumed against the tier limit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub used: u64,
    pub limit: u64,
}

impl Usage {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// A zero limit with nothing used is not exhausted, matching `percent_used`.
    pub fn is_exhausted(&self) -> bool {
        if self.limit == 0 {
            return self.used > 0;
        }
        self.used >= self.limit
    }

    pub fn percent_used(&self) -> f64 {
        if self.limit == 0 {
            return if self.used == 0 { 0.0 } else { 100.0 };
        }
        (self.used as f64 / self.limit as f64 * 100.0).min(100.0)
    }
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{} ({:.0}%)", self.used, self.limit, self.percent_used())
    }
}

/// Read-only snapshot of the account limits served by `/quota`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Quota {
    #[serde(default)]
    pub tier: Tier,
    pub conversions: Usage,
    pub exports: Usage,
    pub api_calls: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
}

impl Quota {
    /// Name and usage of every metered resource, in display order.
    pub fn entries(&self) -> [(&'static str, Usage); 3] {
        [
            ("conversions", self.conversions),
            ("exports", self.exports),
            ("api_calls", self.api_calls),
        ]
    }

    pub fn any_exhausted(&self) -> bool {
        self.entries().iter().any(|(_, usage)| usage.is_exhausted())
    }
}
