//! Vercel serverless function adapter module
//!
//! Routes a raw request body to the plan pipeline and produces a response
//! with the same status codes and error bodies as the standalone server.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::{AuthError, TokenIssuer, bearer_token, cookie_token};
use crate::config::{AppConfig, ConfigError};
use crate::error::{ApiError, PlanError};
use crate::gateway::{GenAiGateway, create_genai_client};
use crate::plan::{MealPlanRequest, PlanKind, PlanPrompt, WorkoutPlanRequest};
use crate::processor::PlanProcessor;

/// Vercel HTTP response structure
#[derive(Debug, Serialize)]
pub struct VercelResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl VercelResponse {
    pub fn json(
        status_code: u16,
        body: impl Serialize,
    ) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());

        Self {
            status_code,
            headers,
            body: serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    #[must_use]
    pub fn error(err: &ApiError) -> Self {
        let body = err.to_response();
        Self::json(body.status_code, body)
    }
}

/// Parse request body as JSON
pub fn parse_json_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| format!("Failed to parse JSON: {e}"))
}

/// The parts of an incoming request the function looks at.
#[derive(Debug, Clone, Copy)]
pub struct VercelRequest<'a> {
    pub path: &'a str,
    /// Raw `Authorization` header, if any.
    pub authorization: Option<&'a str>,
    /// Raw `Cookie` header, if any.
    pub cookie: Option<&'a str>,
    pub body: &'a [u8],
}

/// Plan pipeline plus the optional session check, shared across invocations.
pub struct PlanFunction {
    processor: PlanProcessor,
    /// Present when plan requests need a session token.
    tokens: Option<TokenIssuer>,
}

impl PlanFunction {
    #[must_use]
    pub fn new(
        processor: PlanProcessor,
        tokens: Option<TokenIssuer>,
    ) -> Self {
        Self { processor, tokens }
    }

    /// Wires the production gateway from configuration.
    ///
    /// # Errors
    ///
    /// `REQUIRE_AUTH` without `TOKEN_SECRET` is rejected: tokens are issued
    /// by the server, so the function can only check them with the shared
    /// secret.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let tokens = if config.require_auth {
            let Some(secret) = config.token_secret.as_deref() else {
                return Err(ConfigError::Invalid {
                    name: "TOKEN_SECRET",
                    value: String::new(),
                    expected: "the server's token secret when REQUIRE_AUTH is on",
                });
            };
            Some(TokenIssuer::new(secret.as_bytes(), config.token_ttl))
        } else {
            None
        };

        let gateway = GenAiGateway::new(
            create_genai_client(config.api_key.as_deref()),
            config.model.clone(),
            config.upstream_timeout,
        );
        tracing::info!("Completion model: {}", gateway.model());

        Ok(Self::new(PlanProcessor::new(Arc::new(gateway), config.validate_plans), tokens))
    }

    /// Handles a POST to a path ending in `/meal` or `/chat`.
    pub async fn dispatch(
        &self,
        req: &VercelRequest<'_>,
    ) -> VercelResponse {
        let path = req.path.trim_end_matches('/');

        let kind = if path.ends_with("/meal") {
            PlanKind::Meal
        } else if path.ends_with("/chat") {
            PlanKind::Workout
        } else {
            return VercelResponse::json(
                404,
                serde_json::json!({ "error": "NOT_FOUND", "message": format!("No route for {path}"), "status_code": 404 }),
            );
        };

        if let Err(e) = self.authorize(req) {
            return VercelResponse::error(&ApiError::from(e));
        }

        match kind {
            PlanKind::Meal => self.generate::<MealPlanRequest>(req.body).await,
            PlanKind::Workout => self.generate::<WorkoutPlanRequest>(req.body).await,
        }
    }

    fn authorize(
        &self,
        req: &VercelRequest<'_>,
    ) -> Result<(), AuthError> {
        let Some(tokens) = &self.tokens else {
            return Ok(());
        };

        let token = req
            .authorization
            .and_then(bearer_token)
            .or_else(|| req.cookie.and_then(cookie_token))
            .ok_or(AuthError::MissingToken)?;

        let claims = tokens.verify(token)?;
        tracing::info!("Authorized plan request for {}", claims.sub);
        Ok(())
    }

    async fn generate<R>(
        &self,
        body: &[u8],
    ) -> VercelResponse
    where
        R: PlanPrompt + for<'de> Deserialize<'de>,
    {
        let request: R = match parse_json_body(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected request body: {e}");
                return VercelResponse::error(&ApiError::from(PlanError::BadRequest(e)));
            }
        };

        match self.processor.generate(&request).await {
            Ok(plan) => VercelResponse::json(200, plan),
            Err(e) => VercelResponse::error(&ApiError::from(e)),
        }
    }
}
