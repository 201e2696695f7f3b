use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// Wealth goal, either as a multiple of one year's contributions or as an
/// absolute portfolio value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SavingsTarget {
    MultipleOfAnnual(f64),
    AbsoluteValue(f64),
}

impl SavingsTarget {
    /// Resolves the goal to an absolute value given the monthly contribution.
    pub fn resolve(self, monthly_contribution: f64) -> f64 {
        match self {
            SavingsTarget::MultipleOfAnnual(multiple) => monthly_contribution * 12.0 * multiple,
            SavingsTarget::AbsoluteValue(value) => value,
        }
    }
}

/// Coarse asset-class percentages as entered in the form. Validated upstream
/// to sum to exactly 100.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AssetMix {
    pub stocks_pct: f64,
    pub bonds_pct: f64,
    pub cash_pct: f64,
    pub crypto_pct: f64,
}

impl AssetMix {
    pub fn total(self) -> f64 {
        self.stocks_pct + self.bonds_pct + self.cash_pct + self.crypto_pct
    }
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub monthly_contribution: f64,
    pub horizon_years: u32,
    pub target: SavingsTarget,
    pub current_mix: AssetMix,
    pub risk_tolerance: RiskTolerance,
    pub seed: u64,
}

/// Percentage allocation across instrument symbols. Keys are ordered so
/// serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightVector(pub BTreeMap<String, f64>);

impl WeightVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds `pct` to the weight held under `symbol`.
    pub fn add(&mut self, symbol: &str, pct: f64) {
        *self.0.entry(symbol.to_string()).or_insert(0.0) += pct;
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(symbol, pct)| (symbol.as_str(), *pct))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub expected_return: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub crisis_impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub year: u32,
    pub expected_value: f64,
    pub optimistic_value: f64,
    pub pessimistic_value: f64,
    pub severe_downside_value: f64,
    pub target_value: f64,
}

/// Crisis-scenario summary. `recovery_years` is `None` when the expected
/// return is zero or negative and recovery time is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestResult {
    pub crisis_impact: f64,
    pub recovery_years: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub target_value: f64,
    pub recommended_allocation: WeightVector,
    pub current_metrics: MetricsSummary,
    pub optimized_metrics: MetricsSummary,
    pub current_stress: StressTestResult,
    pub optimized_stress: StressTestResult,
    pub current_projection: Vec<ProjectionPoint>,
    pub optimized_projection: Vec<ProjectionPoint>,
}
