use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Checks parsed model output against the meal and workout plan shapes
pub struct PlanValidator;

static PATTERNS: OnceLock<ValidationPatterns> = OnceLock::new();

struct ValidationPatterns {
    /// Macro quantities such as "20g" or "12.5 g"
    grams: Regex,
}

impl ValidationPatterns {
    fn get() -> &'static Self {
        PATTERNS.get_or_init(|| Self {
            grams: Regex::new(r"(?i)^\s*\d+(\.\d+)?\s*g(rams?)?\s*$").expect("static regex"),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn finish(
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    String,
    Number,
}

impl PlanValidator {
    /// Validates a meal plan: an object of cuisine name to recipe array.
    ///
    /// Missing keys and wrong JSON types are errors. A cuisine without exactly
    /// three recipes, or a requested cuisine absent from the plan, is only a
    /// warning.
    #[must_use]
    pub fn validate_meal_plan(
        plan: &Value,
        requested_cuisines: &[String],
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let Some(cuisines) = plan.as_object() else {
            errors.push("Meal plan is not a JSON object".to_string());
            return ValidationResult::finish(errors, warnings);
        };

        if cuisines.is_empty() {
            errors.push("Meal plan contains no cuisines".to_string());
        }

        for requested in requested_cuisines {
            if !cuisines.contains_key(requested) {
                warnings.push(format!("Requested cuisine '{requested}' is missing from the plan"));
            }
        }

        for (cuisine, recipes) in cuisines {
            let Some(recipes) = recipes.as_array() else {
                errors.push(format!("{cuisine}: expected an array of recipes"));
                continue;
            };

            if recipes.len() != 3 {
                warnings.push(format!("{cuisine}: expected 3 recipes, found {}", recipes.len()));
            }

            for (index, recipe) in recipes.iter().enumerate() {
                let path = format!("{cuisine}[{index}]");
                Self::check_recipe(&path, recipe, &mut errors, &mut warnings);
            }
        }

        ValidationResult::finish(errors, warnings)
    }

    /// Validates a workout plan. A schedule whose day count differs from the
    /// requested days per week is a warning, not an error.
    #[must_use]
    pub fn validate_workout_plan(
        plan: &Value,
        days_per_week: &str,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let Some(plan) = plan.as_object() else {
            errors.push("Workout plan is not a JSON object".to_string());
            return ValidationResult::finish(errors, warnings);
        };

        Self::require(plan, "workoutSplit", Kind::String, "workout plan", &mut errors);
        Self::require(plan, "recovery", Kind::String, "workout plan", &mut errors);

        match plan.get("schedule") {
            None => errors.push("workout plan: missing key 'schedule'".to_string()),
            Some(schedule) => match schedule.as_object() {
                None => errors.push("workout plan: 'schedule' must be an object".to_string()),
                Some(days) => {
                    if let Ok(expected) = days_per_week.trim().parse::<usize>()
                        && expected != days.len()
                    {
                        warnings.push(format!(
                            "schedule: expected {expected} days, found {}",
                            days.len()
                        ));
                    }

                    for (label, day) in days {
                        Self::check_day(label, day, &mut errors);
                    }
                }
            },
        }

        ValidationResult::finish(errors, warnings)
    }

    fn check_recipe(
        path: &str,
        recipe: &Value,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let Some(recipe) = recipe.as_object() else {
            errors.push(format!("{path}: expected a recipe object"));
            return;
        };

        Self::require(recipe, "mealName", Kind::String, path, errors);
        Self::require(recipe, "totalCalories", Kind::Number, path, errors);
        Self::require(recipe, "ingredients", Kind::String, path, errors);
        Self::require(recipe, "caloriesPerServing", Kind::Number, path, errors);
        Self::require(recipe, "note", Kind::String, path, errors);

        match recipe.get("macros") {
            None => errors.push(format!("{path}: missing key 'macros'")),
            Some(macros) => match macros.as_object() {
                None => errors.push(format!("{path}: 'macros' must be an object")),
                Some(macros) => {
                    let macros_path = format!("{path}.macros");
                    for key in ["protein", "carbs", "fats"] {
                        if Self::require(macros, key, Kind::String, &macros_path, errors)
                            && let Some(quantity) = macros.get(key).and_then(Value::as_str)
                            && !ValidationPatterns::get().grams.is_match(quantity)
                        {
                            warnings.push(format!(
                                "{macros_path}.{key}: '{quantity}' does not look like a gram quantity"
                            ));
                        }
                    }
                }
            },
        }
    }

    fn check_day(
        label: &str,
        day: &Value,
        errors: &mut Vec<String>,
    ) {
        let Some(day) = day.as_object() else {
            errors.push(format!("{label}: expected a day object"));
            return;
        };

        Self::require(day, "bodyParts", Kind::String, label, errors);
        Self::require(day, "notes", Kind::String, label, errors);

        let Some(exercises) = day.get("exercises") else {
            errors.push(format!("{label}: missing key 'exercises'"));
            return;
        };
        let Some(exercises) = exercises.as_array() else {
            errors.push(format!("{label}: 'exercises' must be an array"));
            return;
        };

        for (index, exercise) in exercises.iter().enumerate() {
            let path = format!("{label}.exercises[{index}]");
            let Some(exercise) = exercise.as_object() else {
                errors.push(format!("{path}: expected an exercise object"));
                continue;
            };

            Self::require(exercise, "name", Kind::String, &path, errors);
            Self::require(exercise, "sets", Kind::Number, &path, errors);
            Self::require(exercise, "reps", Kind::String, &path, errors);
            Self::require(exercise, "rest", Kind::String, &path, errors);
            Self::require(exercise, "intensity", Kind::String, &path, errors);
        }
    }

    /// Records an error unless `key` is present with the expected type.
    /// Returns whether the key passed.
    fn require(
        object: &Map<String, Value>,
        key: &str,
        kind: Kind,
        path: &str,
        errors: &mut Vec<String>,
    ) -> bool {
        let Some(value) = object.get(key) else {
            errors.push(format!("{path}: missing key '{key}'"));
            return false;
        };

        let matches = match kind {
            Kind::String => value.is_string(),
            Kind::Number => value.is_number(),
        };

        if !matches {
            let expected = match kind {
                Kind::String => "a string",
                Kind::Number => "a number",
            };
            errors.push(format!("{path}: '{key}' must be {expected}"));
        }

        matches
    }
}
