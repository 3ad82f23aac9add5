//! Plan request and response types
//!
//! Requests mirror the JSON bodies posted by the web client (camelCase keys).
//! Scalar profile fields are kept as the text the caller sent; they are only
//! ever substituted into a prompt, never computed with.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::chat::ChatMessage;
use crate::template::TemplateEngine;
use crate::validator::{PlanValidator, ValidationResult};

/// Which plan an endpoint produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PlanKind {
    Meal,
    Workout,
}

/// The caller's body-weight goal.
///
/// The two well-known values come from the client's goal picker; anything
/// else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Goal {
    GainWeight,
    LoseWeight,
    Other(String),
}

impl From<String> for Goal {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Gain Weight" => Self::GainWeight,
            "Lose Weight" => Self::LoseWeight,
            _ => Self::Other(value),
        }
    }
}

impl From<Goal> for String {
    fn from(goal: Goal) -> Self {
        goal.to_string()
    }
}

impl fmt::Display for Goal {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::GainWeight => f.write_str("Gain Weight"),
            Self::LoseWeight => f.write_str("Lose Weight"),
            Self::Other(goal) => f.write_str(goal),
        }
    }
}

/// Body of `POST /meal`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub dietary_restrictions: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub calorie_goal: String,
    pub cuisine_preferences: Vec<String>,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub height: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub weight: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub age: String,
    #[cfg_attr(feature = "server", schema(value_type = String, example = "Lose Weight"))]
    pub goal: Goal,
}

/// Body of `POST /chat`, the workout endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub days_per_week: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub time_per_day: String,
    // The API has always been spelled this way; the web client sends the
    // corrected spelling.
    #[serde(
        rename = "exersizeConstraints",
        alias = "exerciseConstraints",
        deserialize_with = "scalar::string_or_number"
    )]
    pub exercise_constraints: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub height: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub weight: String,
    #[serde(deserialize_with = "scalar::string_or_number")]
    pub age: String,
    #[cfg_attr(feature = "server", schema(value_type = String, example = "Gain Weight"))]
    pub goal: Goal,
}

/// Macro breakdown of a recipe, as quantity strings such as `"20g"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct Macros {
    pub protein: String,
    pub carbs: String,
    pub fats: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub meal_name: String,
    pub total_calories: f64,
    pub ingredients: String,
    pub calories_per_serving: f64,
    pub macros: Macros,
    pub note: String,
}

/// Cuisine name to its three recipes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(transparent)]
pub struct MealPlan(pub HashMap<String, Vec<Recipe>>);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct Exercise {
    pub name: String,
    pub sets: f64,
    pub reps: String,
    pub rest: String,
    pub intensity: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
    pub body_parts: String,
    pub exercises: Vec<Exercise>,
    pub notes: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub workout_split: String,
    pub schedule: HashMap<String, WorkoutDay>,
    pub recovery: String,
}

/// A request that can be turned into a system prompt and whose completion
/// can be checked against the expected plan shape.
pub trait PlanPrompt: Send + Sync {
    fn kind(&self) -> PlanKind;

    fn system_prompt(&self) -> String;

    /// Caller-supplied conversation, appended after the system prompt.
    fn messages(&self) -> &[ChatMessage];

    fn check(
        &self,
        plan: &Value,
    ) -> ValidationResult;
}

impl PlanPrompt for MealPlanRequest {
    fn kind(&self) -> PlanKind {
        PlanKind::Meal
    }

    fn system_prompt(&self) -> String {
        TemplateEngine::render_meal_prompt(self)
    }

    fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn check(
        &self,
        plan: &Value,
    ) -> ValidationResult {
        PlanValidator::validate_meal_plan(plan, &self.cuisine_preferences)
    }
}

impl PlanPrompt for WorkoutPlanRequest {
    fn kind(&self) -> PlanKind {
        PlanKind::Workout
    }

    fn system_prompt(&self) -> String {
        TemplateEngine::render_workout_prompt(self)
    }

    fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn check(
        &self,
        plan: &Value,
    ) -> ValidationResult {
        PlanValidator::validate_workout_plan(plan, &self.days_per_week)
    }
}

mod scalar {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    /// Accepts a JSON string or number and keeps its text form.
    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = String;

            fn expecting(
                &self,
                formatter: &mut fmt::Formatter<'_>,
            ) -> fmt::Result {
                formatter.write_str("a string or a number")
            }

            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_string<E: de::Error>(
                self,
                value: String,
            ) -> Result<String, E> {
                Ok(value)
            }

            fn visit_i64<E: de::Error>(
                self,
                value: i64,
            ) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_u64<E: de::Error>(
                self,
                value: u64,
            ) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_f64<E: de::Error>(
                self,
                value: f64,
            ) -> Result<String, E> {
                Ok(value.to_string())
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}
