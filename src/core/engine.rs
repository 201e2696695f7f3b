use std::f64::consts::PI;

use super::instruments::{Instrument, instrument};
use super::types::{
    AssetMix, Inputs, MetricsSummary, PlanResult, ProjectionPoint, RiskTolerance, StressTestResult,
    WeightVector,
};

/// Sub-split of the coarse "stocks" percentage between world and US equity.
const STOCKS_WORLD_SHARE: f64 = 0.40;
const STOCKS_US_SHARE: f64 = 0.60;
/// Sub-split of the coarse "bonds" percentage between short and long duration.
const BONDS_SHORT_SHARE: f64 = 0.50;
const BONDS_LONG_SHARE: f64 = 0.50;

const OPTIMISTIC_BAND_FACTOR: f64 = 0.5;
const PESSIMISTIC_BAND_FACTOR: f64 = 1.5;
const SEVERE_BAND_FACTOR: f64 = 2.5;

/// Degrees of freedom of the Student's-t-like annual shock.
const SHOCK_DEGREES_OF_FREEDOM: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A weight vector referenced a symbol missing from the instrument table.
    /// Contract violation; never treated as a zero weight.
    UnknownInstrument(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownInstrument(symbol) => {
                write!(f, "unknown instrument symbol '{symbol}' in weight vector")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Maps the user's coarse asset-class mix onto the instrument universe with
/// fixed proportional sub-splits. Deterministic; preserves the mix total.
pub fn map_current_mix(mix: &AssetMix) -> WeightVector {
    let mut weights = WeightVector::new();
    weights.add("SWDA", mix.stocks_pct * STOCKS_WORLD_SHARE);
    weights.add("SPY", mix.stocks_pct * STOCKS_US_SHARE);
    weights.add("SHY", mix.bonds_pct * BONDS_SHORT_SHARE);
    weights.add("TLT", mix.bonds_pct * BONDS_LONG_SHARE);
    weights.add("CASH", mix.cash_pct);
    weights.add("CRYPTO", mix.crypto_pct);
    weights
}

/// Hand-authored target allocation per risk tier. Each table sums to 100;
/// there is no interpolation between tiers.
pub fn recommend_allocation(risk_tolerance: RiskTolerance) -> WeightVector {
    let table: [(&str, f64); 6] = match risk_tolerance {
        RiskTolerance::Low => [
            ("SWDA", 20.0),
            ("SPY", 10.0),
            ("SHY", 35.0),
            ("TLT", 20.0),
            ("CASH", 15.0),
            ("CRYPTO", 0.0),
        ],
        RiskTolerance::Medium => [
            ("SWDA", 40.0),
            ("SPY", 30.0),
            ("SHY", 15.0),
            ("TLT", 10.0),
            ("CASH", 3.0),
            ("CRYPTO", 2.0),
        ],
        RiskTolerance::High => [
            ("SWDA", 45.0),
            ("SPY", 35.0),
            ("SHY", 5.0),
            ("TLT", 5.0),
            ("CASH", 2.0),
            ("CRYPTO", 8.0),
        ],
    };

    let mut weights = WeightVector::new();
    for (symbol, pct) in table {
        weights.add(symbol, pct);
    }
    weights
}

/// Blends per-instrument statistics into a portfolio summary.
///
/// Two deliberate simplifications are preserved from the reference model and
/// must not be "corrected" without re-pinning expected outputs:
/// - volatility is the weighted sum of standalone volatilities, not a
///   covariance-aware portfolio volatility;
/// - max drawdown is the single largest weighted per-instrument drawdown
///   term, not a portfolio-level drawdown statistic.
pub fn aggregate_metrics(weights: &WeightVector) -> Result<MetricsSummary, EngineError> {
    let mut expected_return = 0.0;
    let mut volatility = 0.0;
    let mut max_drawdown = 0.0_f64;
    let mut crisis_impact = 0.0;

    for (symbol, pct) in weights.iter() {
        let inst: &Instrument =
            instrument(symbol).ok_or_else(|| EngineError::UnknownInstrument(symbol.to_string()))?;
        let weight = pct / 100.0;

        expected_return += inst.mean_return() * weight;
        volatility += inst.volatility * weight;
        if pct > 0.0 {
            max_drawdown = max_drawdown.max(inst.max_drawdown * weight);
        }
        crisis_impact += inst.crisis_shock.unwrap_or(0.0) * weight;
    }

    Ok(MetricsSummary {
        expected_return,
        volatility,
        max_drawdown,
        crisis_impact,
    })
}

/// Applies the crisis shock and estimates years to recover at the expected
/// return. Recovery is undefined when the expected return is not positive.
pub fn run_stress_test(metrics: &MetricsSummary) -> StressTestResult {
    let recovery_years = if metrics.expected_return > 0.0 {
        let years = metrics.crisis_impact.abs() / metrics.expected_return;
        years.is_finite().then(|| years.ceil() as u32)
    } else {
        None
    };

    StressTestResult {
        crisis_impact: metrics.crisis_impact,
        recovery_years,
    }
}

/// Simulates one stochastic growth path: an annual lump of twelve monthly
/// contributions, then one t-distributed return shock per year. The
/// optimistic/pessimistic/severe bands are deterministic offsets of the same
/// realized value, not independent draws.
pub fn project_growth(
    metrics: &MetricsSummary,
    horizon_years: u32,
    monthly_contribution: f64,
    target_value: f64,
    rng: &mut Rng,
) -> Vec<ProjectionPoint> {
    let mut points = Vec::with_capacity(horizon_years as usize + 1);
    points.push(ProjectionPoint {
        year: 0,
        expected_value: 0.0,
        optimistic_value: 0.0,
        pessimistic_value: 0.0,
        severe_downside_value: 0.0,
        target_value,
    });

    let mut current_value = 0.0_f64;
    for year in 1..=horizon_years {
        current_value += monthly_contribution * 12.0;

        let shock = rng.student_t_shock();
        let annual_return = metrics.expected_return + metrics.volatility * shock;
        current_value *= 1.0 + annual_return;

        let vol = metrics.volatility;
        points.push(ProjectionPoint {
            year,
            expected_value: current_value.round(),
            optimistic_value: (current_value * (1.0 + vol * OPTIMISTIC_BAND_FACTOR)).round(),
            pessimistic_value: (current_value * (1.0 - vol * PESSIMISTIC_BAND_FACTOR)).round(),
            severe_downside_value: (current_value * (1.0 - vol * SEVERE_BAND_FACTOR)).round(),
            target_value,
        });
    }

    points
}

/// Full pipeline: resolve the target, derive both weight vectors, aggregate
/// and stress-test each, then project each on its own RNG stream.
pub fn run_plan(inputs: &Inputs) -> Result<PlanResult, EngineError> {
    let target_value = inputs.target.resolve(inputs.monthly_contribution);

    let current_weights = map_current_mix(&inputs.current_mix);
    let recommended_allocation = recommend_allocation(inputs.risk_tolerance);

    let current_metrics = aggregate_metrics(&current_weights)?;
    let optimized_metrics = aggregate_metrics(&recommended_allocation)?;

    let current_stress = run_stress_test(&current_metrics);
    let optimized_stress = run_stress_test(&optimized_metrics);

    let mut current_rng = Rng::new(derive_seed(inputs.seed, 0));
    let mut optimized_rng = Rng::new(derive_seed(inputs.seed, 1));
    let current_projection = project_growth(
        &current_metrics,
        inputs.horizon_years,
        inputs.monthly_contribution,
        target_value,
        &mut current_rng,
    );
    let optimized_projection = project_growth(
        &optimized_metrics,
        inputs.horizon_years,
        inputs.monthly_contribution,
        target_value,
        &mut optimized_rng,
    );

    Ok(PlanResult {
        target_value,
        recommended_allocation,
        current_metrics,
        optimized_metrics,
        current_stress,
        optimized_stress,
        current_projection,
        optimized_projection,
    })
}

fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    splitmix64(base_seed ^ (stream << 32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seedable non-cryptographic uniform source (xorshift64*). Each normal draw
/// consumes exactly two uniforms; nothing is cached between draws.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    fn standard_normal(&mut self) -> f64 {
        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        r * theta.cos()
    }

    /// Approximate Student's-t draw with 5 degrees of freedom: one normal
    /// scaled by a chi-square statistic built from 5 further normals.
    fn student_t_shock(&mut self) -> f64 {
        let z = self.standard_normal();
        let mut chi_square = 0.0;
        for _ in 0..SHOCK_DEGREES_OF_FREEDOM {
            let n = self.standard_normal();
            chi_square += n * n;
        }
        z * (SHOCK_DEGREES_OF_FREEDOM as f64 / chi_square.max(1e-12)).sqrt()
    }
}
