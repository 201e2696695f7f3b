use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::core::{
    AssetMix, Inputs, MetricsSummary, PlanResult, ProjectionPoint, RiskTolerance, SavingsTarget,
    StressTestResult, WeightVector, run_plan,
};

/// Fixed pause before each optimization runs, mirroring the form's
/// "calculating" state. Has no effect on the computation itself.
const CALCULATION_DELAY: Duration = Duration::from_millis(600);

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRiskTolerance {
    Low,
    Medium,
    High,
}

impl From<CliRiskTolerance> for RiskTolerance {
    fn from(value: CliRiskTolerance) -> Self {
        match value {
            CliRiskTolerance::Low => RiskTolerance::Low,
            CliRiskTolerance::Medium => RiskTolerance::Medium,
            CliRiskTolerance::High => RiskTolerance::High,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTargetKind {
    Multiple,
    Absolute,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRiskTolerance {
    Low,
    Medium,
    High,
}

impl From<ApiRiskTolerance> for CliRiskTolerance {
    fn from(value: ApiRiskTolerance) -> Self {
        match value {
            ApiRiskTolerance::Low => CliRiskTolerance::Low,
            ApiRiskTolerance::Medium => CliRiskTolerance::Medium,
            ApiRiskTolerance::High => CliRiskTolerance::High,
        }
    }
}

impl From<RiskTolerance> for ApiRiskTolerance {
    fn from(value: RiskTolerance) -> Self {
        match value {
            RiskTolerance::Low => ApiRiskTolerance::Low,
            RiskTolerance::Medium => ApiRiskTolerance::Medium,
            RiskTolerance::High => ApiRiskTolerance::High,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTargetKind {
    #[serde(alias = "multipleOfAnnual", alias = "multiple-of-annual")]
    Multiple,
    #[serde(alias = "absoluteValue", alias = "absolute-value")]
    Absolute,
}

impl From<ApiTargetKind> for CliTargetKind {
    fn from(value: ApiTargetKind) -> Self {
        match value {
            ApiTargetKind::Multiple => CliTargetKind::Multiple,
            ApiTargetKind::Absolute => CliTargetKind::Absolute,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OptimizePayload {
    monthly_contribution: Option<f64>,
    horizon_years: Option<u32>,
    target_kind: Option<ApiTargetKind>,
    target_multiple: Option<f64>,
    target_absolute: Option<f64>,
    stocks_pct: Option<f64>,
    bonds_pct: Option<f64>,
    cash_pct: Option<f64>,
    crypto_pct: Option<f64>,
    risk_tolerance: Option<ApiRiskTolerance>,
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Savings-goal allocation and stochastic projection engine"
)]
struct Cli {
    #[arg(long, default_value_t = 1000.0)]
    monthly_contribution: f64,
    #[arg(long, default_value_t = 30)]
    horizon_years: u32,
    #[arg(long, value_enum, default_value_t = CliTargetKind::Multiple)]
    target_kind: CliTargetKind,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Goal as a multiple of one year's contributions"
    )]
    target_multiple: f64,
    #[arg(long, help = "Goal as an absolute portfolio value")]
    target_absolute: Option<f64>,
    #[arg(long, default_value_t = 60.0)]
    stocks_pct: f64,
    #[arg(long, default_value_t = 30.0)]
    bonds_pct: f64,
    #[arg(long, default_value_t = 10.0)]
    cash_pct: f64,
    #[arg(long, default_value_t = 0.0)]
    crypto_pct: f64,
    #[arg(long, value_enum, default_value_t = CliRiskTolerance::Medium)]
    risk_tolerance: CliRiskTolerance,
    #[arg(long, help = "RNG seed; defaults to a time-derived value")]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeResponse {
    risk_tolerance: ApiRiskTolerance,
    monthly_contribution: f64,
    horizon_years: u32,
    target_value: f64,
    recommended_allocation: WeightVector,
    current_metrics: MetricsSummary,
    optimized_metrics: MetricsSummary,
    current_stress: StressTestResult,
    optimized_stress: StressTestResult,
    current_projection: Vec<ProjectionPoint>,
    optimized_projection: Vec<ProjectionPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<Inputs, String> {
    if !cli.monthly_contribution.is_finite() || cli.monthly_contribution < 1.0 {
        return Err("--monthly-contribution must be >= 1".to_string());
    }

    if !(1..=50).contains(&cli.horizon_years) {
        return Err("--horizon-years must be between 1 and 50".to_string());
    }

    for (name, pct) in [
        ("--stocks-pct", cli.stocks_pct),
        ("--bonds-pct", cli.bonds_pct),
        ("--cash-pct", cli.cash_pct),
        ("--crypto-pct", cli.crypto_pct),
    ] {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    let current_mix = AssetMix {
        stocks_pct: cli.stocks_pct,
        bonds_pct: cli.bonds_pct,
        cash_pct: cli.cash_pct,
        crypto_pct: cli.crypto_pct,
    };
    if (current_mix.total() - 100.0).abs() > 1e-9 {
        return Err("asset mix percentages must sum to exactly 100".to_string());
    }

    let target = match cli.target_kind {
        CliTargetKind::Multiple => {
            if !cli.target_multiple.is_finite() || cli.target_multiple <= 0.0 {
                return Err("--target-multiple must be > 0".to_string());
            }
            SavingsTarget::MultipleOfAnnual(cli.target_multiple)
        }
        CliTargetKind::Absolute => {
            let Some(value) = cli.target_absolute else {
                return Err(
                    "--target-absolute is required when --target-kind is absolute".to_string()
                );
            };
            if !value.is_finite() || value <= 0.0 {
                return Err("--target-absolute must be > 0".to_string());
            }
            SavingsTarget::AbsoluteValue(value)
        }
    };

    Ok(Inputs {
        monthly_contribution: cli.monthly_contribution,
        horizon_years: cli.horizon_years,
        target,
        current_mix,
        risk_tolerance: cli.risk_tolerance.into(),
        seed: cli.seed.unwrap_or_else(entropy_seed),
    })
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<OptimizePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: OptimizePayload) -> Result<Inputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.target_kind {
        cli.target_kind = v.into();
    }
    if let Some(v) = payload.target_multiple {
        cli.target_multiple = v;
    }
    if let Some(v) = payload.target_absolute {
        cli.target_absolute = Some(v);
    }
    if let Some(v) = payload.stocks_pct {
        cli.stocks_pct = v;
    }
    if let Some(v) = payload.bonds_pct {
        cli.bonds_pct = v;
    }
    if let Some(v) = payload.cash_pct {
        cli.cash_pct = v;
    }
    if let Some(v) = payload.crypto_pct {
        cli.crypto_pct = v;
    }
    if let Some(v) = payload.risk_tolerance {
        cli.risk_tolerance = v.into();
    }
    if let Some(v) = payload.seed {
        cli.seed = Some(v);
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_contribution: 1_000.0,
        horizon_years: 30,
        target_kind: CliTargetKind::Multiple,
        target_multiple: 10.0,
        target_absolute: None,
        stocks_pct: 60.0,
        bonds_pct: 30.0,
        cash_pct: 10.0,
        crypto_pct: 0.0,
        risk_tolerance: CliRiskTolerance::Medium,
        seed: None,
    }
}

fn entropy_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E3779B97F4A7C15)
}

fn build_optimize_response(inputs: &Inputs, result: PlanResult) -> OptimizeResponse {
    OptimizeResponse {
        risk_tolerance: inputs.risk_tolerance.into(),
        monthly_contribution: inputs.monthly_contribution,
        horizon_years: inputs.horizon_years,
        target_value: result.target_value,
        recommended_allocation: result.recommended_allocation,
        current_metrics: result.current_metrics,
        optimized_metrics: result.optimized_metrics,
        current_stress: result.current_stress,
        optimized_stress: result.optimized_stress,
        current_projection: result.current_projection,
        optimized_projection: result.optimized_projection,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/optimize",
            get(optimize_get_handler).post(optimize_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("nestegg HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/optimize");

    axum::serve(listener, app).await
}

pub fn run_plan_cli(args: &[String]) -> Result<(), String> {
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let inputs = build_inputs(cli)?;
    let result = run_plan(&inputs).map_err(|e| e.to_string())?;
    let response = build_optimize_response(&inputs, result);
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("failed to serialize plan: {e}"))?;
    println!("{rendered}");
    Ok(())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn optimize_get_handler(Query(payload): Query<OptimizePayload>) -> Response {
    optimize_handler_impl(payload).await
}

async fn optimize_post_handler(Json(payload): Json<OptimizePayload>) -> Response {
    optimize_handler_impl(payload).await
}

async fn optimize_handler_impl(payload: OptimizePayload) -> Response {
    let inputs = match api_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    tokio::time::sleep(CALCULATION_DELAY).await;

    match run_plan(&inputs) {
        Ok(result) => json_response(StatusCode::OK, build_optimize_response(&inputs, result)),
        // Unreachable with the compiled-in tables; kept loud for contract
        // violations.
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_accepts_the_defaults() {
        let inputs = build_inputs(sample_cli()).expect("defaults are valid");
        assert_eq!(inputs.risk_tolerance, RiskTolerance::Medium);
        assert_eq!(inputs.horizon_years, 30);
        assert_approx(inputs.target.resolve(inputs.monthly_contribution), 120_000.0);
    }

    #[test]
    fn build_inputs_rejects_mix_not_summing_to_100() {
        let mut cli = sample_cli();
        cli.cash_pct = 15.0;
        let err = build_inputs(cli).expect_err("must reject 105% mix");
        assert!(err.contains("sum to exactly 100"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_mix_entry() {
        let mut cli = sample_cli();
        cli.stocks_pct = 120.0;
        cli.bonds_pct = -20.0;
        let err = build_inputs(cli).expect_err("must reject out-of-range percentages");
        assert!(err.contains("--stocks-pct"));
    }

    #[test]
    fn build_inputs_rejects_horizon_out_of_range() {
        for horizon in [0, 51] {
            let mut cli = sample_cli();
            cli.horizon_years = horizon;
            let err = build_inputs(cli).expect_err("must reject horizon");
            assert!(err.contains("--horizon-years"));
        }
    }

    #[test]
    fn build_inputs_rejects_small_contribution() {
        let mut cli = sample_cli();
        cli.monthly_contribution = 0.5;
        let err = build_inputs(cli).expect_err("must reject < 1 contribution");
        assert!(err.contains("--monthly-contribution"));
    }

    #[test]
    fn build_inputs_requires_absolute_target_value() {
        let mut cli = sample_cli();
        cli.target_kind = CliTargetKind::Absolute;
        cli.target_absolute = None;
        let err = build_inputs(cli).expect_err("must require the absolute value");
        assert!(err.contains("--target-absolute"));
    }

    #[test]
    fn build_inputs_rejects_non_positive_target_multiple() {
        let mut cli = sample_cli();
        cli.target_multiple = 0.0;
        let err = build_inputs(cli).expect_err("must reject zero multiple");
        assert!(err.contains("--target-multiple"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "monthlyContribution": 1500,
          "horizonYears": 25,
          "targetKind": "absolute-value",
          "targetAbsolute": 300000,
          "stocksPct": 50,
          "bondsPct": 20,
          "cashPct": 20,
          "cryptoPct": 10,
          "riskTolerance": "high",
          "seed": 99
        }"#;
        let inputs = api_request_from_json(json).expect("json should parse");

        assert_approx(inputs.monthly_contribution, 1_500.0);
        assert_eq!(inputs.horizon_years, 25);
        assert_eq!(inputs.target, SavingsTarget::AbsoluteValue(300_000.0));
        assert_approx(inputs.current_mix.stocks_pct, 50.0);
        assert_approx(inputs.current_mix.crypto_pct, 10.0);
        assert_eq!(inputs.risk_tolerance, RiskTolerance::High);
        assert_eq!(inputs.seed, 99);
    }

    #[test]
    fn api_request_from_json_accepts_target_kind_aliases() {
        let json = r#"{ "targetKind": "multipleOfAnnual", "targetMultiple": 8 }"#;
        let inputs = api_request_from_json(json).expect("alias should parse");
        assert_eq!(inputs.target, SavingsTarget::MultipleOfAnnual(8.0));
    }

    #[test]
    fn api_request_from_json_rejects_unknown_risk_tolerance() {
        let json = r#"{ "riskTolerance": "yolo" }"#;
        let err = api_request_from_json(json).expect_err("must reject unknown tier");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn api_request_uses_defaults_for_missing_fields() {
        let inputs = api_request_from_json("{}").expect("empty payload uses defaults");
        assert_eq!(inputs.risk_tolerance, RiskTolerance::Medium);
        assert_approx(inputs.current_mix.total(), 100.0);
    }

    #[test]
    fn optimize_response_serializes_camel_case() {
        let inputs = build_inputs(sample_cli()).expect("defaults are valid");
        let result = run_plan(&inputs).expect("fixed tables only");
        let response = build_optimize_response(&inputs, result);
        let json = serde_json::to_value(&response).expect("serializable");

        assert!(json.get("targetValue").is_some());
        assert!(json.get("recommendedAllocation").is_some());
        assert!(json.get("optimizedMetrics").is_some());
        assert_eq!(
            json["recommendedAllocation"]["SWDA"],
            serde_json::json!(40.0)
        );
        assert_eq!(json["currentProjection"][0]["year"], serde_json::json!(0));
    }

    #[test]
    fn undefined_recovery_serializes_as_null() {
        let stress = StressTestResult {
            crisis_impact: -0.3,
            recovery_years: None,
        };
        let json = serde_json::to_value(stress).expect("serializable");
        assert!(json["recoveryYears"].is_null());
    }
}
