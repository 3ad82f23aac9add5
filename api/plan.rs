//! Vercel serverless function for meal and workout plan generation
//!
//! Serves `POST .../meal` and `POST .../chat` with the same contract as the
//! standalone server. Credentials are not served here: a serverless instance
//! has no durable memory to keep them in. With `REQUIRE_AUTH` the function
//! checks tokens issued by the server, signed with the shared `TOKEN_SECRET`.

use std::sync::OnceLock;

use pcos_planner::config::AppConfig;
use pcos_planner::vercel::{PlanFunction, VercelRequest};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};
use vercel_runtime::{Body, Error, Request, Response, StatusCode, run};

static FUNCTION: OnceLock<PlanFunction> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting plan serverless function with model {}", config.model);

    let _ = FUNCTION.set(PlanFunction::from_config(&config)?);

    run(handler).await
}

/// Handles incoming HTTP requests for plan generation
///
/// # Errors
///
/// Returns an error if response building fails
pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
    tracing::info!("Received request: {} {}", req.method(), req.uri().path());

    // Handle CORS preflight
    if req.method() == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
            .body(Body::Empty)?);
    }

    // Only accept POST requests
    if req.method() != "POST" {
        return Ok(Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                json!({
                    "error": "METHOD_NOT_ALLOWED",
                    "message": "Method not allowed. Use POST.",
                    "status_code": 405
                })
                .to_string()
                .into(),
            )?);
    }

    let Some(function) = FUNCTION.get() else {
        return Err("plan function is not initialised".into());
    };

    let header = |name: &str| req.headers().get(name).and_then(|value| value.to_str().ok());
    let request = VercelRequest {
        path: req.uri().path(),
        authorization: header("authorization"),
        cookie: header("cookie"),
        body: req.body(),
    };

    let response = function.dispatch(&request).await;

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    Ok(builder.body(response.body.into())?)
}
