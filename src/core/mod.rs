mod engine;
mod instruments;
mod types;

pub use engine::{
    EngineError, Rng, aggregate_metrics, map_current_mix, project_growth, recommend_allocation,
    run_plan, run_stress_test,
};
pub use instruments::{INSTRUMENTS, Instrument, instrument};
pub use types::{
    AssetMix, Inputs, MetricsSummary, PlanResult, ProjectionPoint, RiskTolerance, SavingsTarget,
    StressTestResult, WeightVector,
};
