//! # pcos-planner
//!
//! A library for generating PCOS-friendly meal and workout plans with AI
//! models.
//!
//! The library renders a fixed instruction template from the caller's body
//! metrics and preferences, sends it to a chat-completion model and returns
//! the JSON plan the model produced. It ships with a REST server that exposes
//! the same pipeline over HTTP.
//!
//! ## Features
//!
//! - **Meal Plans**: three recipes per preferred cuisine, with calories and macros
//! - **Workout Plans**: one entry per training day plus a recovery strategy
//! - **Shape Validation**: optional structural check of the model's JSON
//! - **Sessions**: signed, expiring session tokens over a hashed credential store
//! - **Flexible AI Integration**: Support for multiple AI providers through the genai crate
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! pcos-planner = { version = "0.1", default-features = false }
//! ```
//!
//! ### Basic Example
//!
//! ```rust,no_run
//! use pcos_planner::{Goal, MealPlanRequest, PlanClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = PlanClient::new("gpt-4o-mini", "your-api-key");
//!
//!     let request = MealPlanRequest {
//!         messages: vec![],
//!         dietary_restrictions: "Vegetarian".to_string(),
//!         calorie_goal: "1800".to_string(),
//!         cuisine_preferences: vec!["Italian".to_string(), "Thai".to_string()],
//!         height: "65".to_string(),
//!         weight: "150".to_string(),
//!         age: "28".to_string(),
//!         goal: Goal::LoseWeight,
//!     };
//!
//!     let plan = client.meal_plan(&request).await?;
//!     println!("{}", serde_json::to_string_pretty(&plan)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Server Mode
//!
//! Enable the `server` feature (on by default) and run the binary:
//!
//! ```bash
//! DEFAULT_KEY=sk-... cargo run
//! ```

// Core modules - always available
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod parser;
pub mod plan;
pub mod processor;
pub mod template;
pub mod validator;

// Server-specific modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod vercel;

use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types for easier access
pub use chat::{ChatMessage, ChatRole};
pub use error::{ErrorResponse, PlanError};
pub use plan::{Goal, MealPlanRequest, PlanKind, WorkoutPlanRequest};
pub use processor::PlanProcessor;

use gateway::{DEFAULT_TIMEOUT, GenAiGateway, create_genai_client};

/// A high-level client for plan generation.
///
/// # Example
///
/// ```no_run
/// use pcos_planner::{Goal, PlanClient, WorkoutPlanRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let client = PlanClient::new("gpt-4o-mini", "your-api-key");
///
///     let request = WorkoutPlanRequest {
///         messages: vec![],
///         days_per_week: "3".to_string(),
///         time_per_day: "45".to_string(),
///         exercise_constraints: "Dumbbells Only".to_string(),
///         height: "64".to_string(),
///         weight: "170".to_string(),
///         age: "31".to_string(),
///         goal: Goal::LoseWeight,
///     };
///
///     let plan = client.workout_plan(&request).await?;
///     println!("{}", plan["workoutSplit"]);
///     Ok(())
/// }
/// ```
pub struct PlanClient {
    model: String,
    api_key: String,
    timeout: Duration,
    validate_plans: bool,
}

impl PlanClient {
    /// Creates a new `PlanClient`.
    ///
    /// # Arguments
    ///
    /// * `model` - The AI model to use (e.g., "gpt-4o-mini", "anthropic:claude-3")
    /// * `api_key` - API key for the AI service
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            validate_plans: true,
        }
    }

    /// Sets how long one completion call may take.
    #[must_use]
    pub const fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = timeout;
        self
    }

    /// Turns the structural check of returned plans on or off.
    #[must_use]
    pub const fn with_validation(
        mut self,
        validate_plans: bool,
    ) -> Self {
        self.validate_plans = validate_plans;
        self
    }

    /// Generates a meal plan: cuisine name to three recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion call fails, the model does not
    /// answer with JSON, or validation is on and the JSON has the wrong shape.
    pub async fn meal_plan(
        &self,
        request: &MealPlanRequest,
    ) -> Result<serde_json::Value, PlanError> {
        self.processor().generate(request).await
    }

    /// Generates a workout plan.
    ///
    /// # Errors
    ///
    /// Same as [`PlanClient::meal_plan`].
    pub async fn workout_plan(
        &self,
        request: &WorkoutPlanRequest,
    ) -> Result<serde_json::Value, PlanError> {
        self.processor().generate(request).await
    }

    fn processor(&self) -> PlanProcessor {
        let client = create_genai_client(Some(&self.api_key));
        let gateway = GenAiGateway::new(client, self.model.clone(), self.timeout);
        PlanProcessor::new(Arc::new(gateway), self.validate_plans)
    }
}
