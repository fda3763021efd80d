//! AWS Lambda handler for loss ratio reports
//!
//! Accepts a JSON request with an optional reference date and filters, runs the
//! loss ratio engine over the configured premium and claim files and returns
//! the per-entity results with the portfolio roll-up.
//!
//! Supports Lambda Function URLs for direct HTTP access.

use claims_analytics::{
    loss_ratio::{LossRatioRow, RunDiagnostics},
    records::{load_claims, load_premiums, loader::{CLAIMS_FILE, DEFAULT_DATA_PATH, PREMIUMS_FILE}},
    ClaimFilter, EngineConfig, LossRatioEngine, PortfolioLossRatio, PremiumFilter,
};
use chrono::NaiveDate;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the premium CSV location
const PREMIUMS_ENV: &str = "CLAIMS_ANALYTICS_PREMIUMS";

/// Environment variable overriding the claims CSV location
const CLAIMS_ENV: &str = "CLAIMS_ANALYTICS_CLAIMS";

/// Input configuration for the loss ratio run
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LossRatioRequest {
    /// Reference date for earned premium (default: today)
    pub as_of: Option<NaiveDate>,

    /// Filters applied to premium records
    pub premium_filter: PremiumFilter,

    /// Filters applied to claim records
    pub claim_filter: ClaimFilter,

    /// Only return entities with a valid loss ratio
    pub valid_only: bool,
}

/// Output from the loss ratio run
#[derive(Debug, Serialize)]
pub struct LossRatioResponse {
    pub as_of: NaiveDate,
    pub portfolio: PortfolioLossRatio,
    pub diagnostics: RunDiagnostics,
    pub results: Vec<LossRatioRow>,
    pub execution_time_ms: u64,
}

fn data_path(env_var: &str, file: &str) -> PathBuf {
    std::env::var(env_var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH).join(file))
}

fn with_cors(builder: lambda_http::http::response::Builder) -> lambda_http::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
}

fn error_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "error": message }).to_string();
    Ok(with_cors(Response::builder())
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::Text(body))?)
}

fn json_response(body: &LossRatioResponse) -> Result<Response<Body>, Error> {
    Ok(with_cors(Response::builder())
        .status(200)
        .header("Content-Type", "application/json")
        .body(Body::Text(serde_json::to_string(body)?))?)
}

/// Lambda handler function
async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let start = std::time::Instant::now();

    // Handle CORS preflight
    if event.method().as_str() == "OPTIONS" {
        return Ok(with_cors(Response::builder()).status(200).body(Body::Empty)?);
    }

    let body_str = match event.body() {
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
        Body::Empty => "{}".to_string(),
    };

    let request: LossRatioRequest = match serde_json::from_str(&body_str) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected request: {}", e);
            return error_response(400, &format!("Invalid JSON: {}", e));
        }
    };

    let premiums = match load_premiums(data_path(PREMIUMS_ENV, PREMIUMS_FILE)) {
        Ok(p) => p,
        Err(e) => return error_response(500, &format!("Failed to load premiums: {}", e)),
    };
    let claims = match load_claims(data_path(CLAIMS_ENV, CLAIMS_FILE)) {
        Ok(c) => c,
        Err(e) => return error_response(500, &format!("Failed to load claims: {}", e)),
    };

    let as_of = request
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let config = EngineConfig::as_of(as_of)
        .with_premium_filter(request.premium_filter)
        .with_claim_filter(request.claim_filter);
    let report = LossRatioEngine::new(config).run(&premiums, &claims);

    let results: Vec<LossRatioRow> = if request.valid_only {
        report.valid().map(|r| r.to_row()).collect()
    } else {
        report.rows()
    };

    let execution_time_ms = start.elapsed().as_millis() as u64;
    info!("Returned {} loss ratio rows in {} ms", results.len(), execution_time_ms);

    let response = LossRatioResponse {
        as_of,
        portfolio: report.portfolio(),
        diagnostics: report.diagnostics.clone(),
        results,
        execution_time_ms,
    };

    json_response(&response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
