//! Plan generation pipeline shared by the HTTP server, the serverless
//! function and the library client.
//!
//! A request moves through build → dispatch → parse → (validate) and either
//! completes with the model's JSON or fails with a `PlanError`. Nothing is
//! kept between requests.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::chat::with_system_prompt;
use crate::error::PlanError;
use crate::gateway::CompletionGateway;
use crate::parser::parse_completion;
use crate::plan::PlanPrompt;

#[derive(Clone)]
pub struct PlanProcessor {
    gateway: Arc<dyn CompletionGateway>,
    validate_plans: bool,
}

impl PlanProcessor {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        validate_plans: bool,
    ) -> Self {
        Self {
            gateway,
            validate_plans,
        }
    }

    /// Generates a plan for `request` and returns the model's JSON unchanged.
    ///
    /// # Errors
    ///
    /// Fails with `Upstream` or `EmptyContent` when the completion call
    /// fails, `MalformedCompletion` when the text is not JSON, and
    /// `InvalidPlan` when validation is on and the JSON has the wrong shape.
    pub async fn generate<R: PlanPrompt + ?Sized>(
        &self,
        request: &R,
    ) -> Result<Value, PlanError> {
        let request_id = Uuid::new_v4();
        let kind = request.kind();

        let messages = with_system_prompt(request.system_prompt(), request.messages());
        tracing::info!(
            "[{request_id}] Built {kind} prompt with {} caller message(s)",
            messages.len() - 1
        );

        let completion = self.gateway.complete(&messages).await.map_err(|e| {
            tracing::error!("[{request_id}] {kind} completion failed: {e}");
            PlanError::from(e)
        })?;
        tracing::info!("[{request_id}] Received {} chars of completion", completion.len());

        let plan = parse_completion(&completion)?;

        if self.validate_plans {
            let result = request.check(&plan);
            for warning in &result.warnings {
                tracing::warn!("[{request_id}] {kind} plan: {warning}");
            }
            if !result.is_valid {
                tracing::error!(
                    "[{request_id}] {kind} plan failed validation: {}",
                    result.errors.join("; ")
                );
                return Err(PlanError::InvalidPlan(result.errors));
            }
        }

        tracing::info!("[{request_id}] {kind} plan completed");
        Ok(plan)
    }
}
