use std::collections::HashMap;
use std::fmt::Write;

use crate::plan::{MealPlanRequest, WorkoutPlanRequest};

pub struct TemplateEngine;

impl TemplateEngine {
    // Templates embedded at compile time
    const MEAL_SYSTEM_PROMPT: &'static str = include_str!("../templates/meal_system_prompt.txt");
    const WORKOUT_SYSTEM_PROMPT: &'static str = include_str!("../templates/workout_system_prompt.txt");

    /// Replaces every `{{KEY}}` placeholder with its value in a single pass.
    ///
    /// Substituted values are copied as-is and never scanned again, so caller
    /// text that happens to contain `{{...}}` stays literal. Unknown
    /// placeholders are left untouched.
    #[must_use]
    pub fn render(
        template: &str,
        variables: &HashMap<&str, &str>,
    ) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];

            let Some(end) = after_open.find("}}") else {
                rest = &rest[start..];
                break;
            };

            let key = &after_open[..end];
            match variables.get(key) {
                Some(value) => result.push_str(value),
                None => {
                    result.push_str("{{");
                    result.push_str(key);
                    result.push_str("}}");
                }
            }
            rest = &after_open[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render the meal plan system prompt for the given request.
    #[must_use]
    pub fn render_meal_prompt(request: &MealPlanRequest) -> String {
        let cuisines = Self::cuisine_list(&request.cuisine_preferences);
        let goal = request.goal.to_string();

        let mut variables = HashMap::new();
        variables.insert("HEIGHT", request.height.as_str());
        variables.insert("WEIGHT", request.weight.as_str());
        variables.insert("AGE", request.age.as_str());
        variables.insert("GOAL", goal.as_str());
        variables.insert("CALORIE_GOAL", request.calorie_goal.as_str());
        variables.insert("DIETARY_RESTRICTIONS", request.dietary_restrictions.as_str());
        variables.insert("CUISINES", cuisines.as_str());

        Self::render(Self::MEAL_SYSTEM_PROMPT, &variables)
    }

    /// Render the workout plan system prompt for the given request.
    #[must_use]
    pub fn render_workout_prompt(request: &WorkoutPlanRequest) -> String {
        let goal = request.goal.to_string();

        let mut variables = HashMap::new();
        variables.insert("HEIGHT", request.height.as_str());
        variables.insert("WEIGHT", request.weight.as_str());
        variables.insert("AGE", request.age.as_str());
        variables.insert("GOAL", goal.as_str());
        variables.insert("DAYS_PER_WEEK", request.days_per_week.as_str());
        variables.insert("TIME_PER_DAY", request.time_per_day.as_str());
        variables.insert("EXERCISE_CONSTRAINTS", request.exercise_constraints.as_str());

        Self::render(Self::WORKOUT_SYSTEM_PROMPT, &variables)
    }

    // One bullet per cuisine, in caller order.
    fn cuisine_list(cuisines: &[String]) -> String {
        if cuisines.is_empty() {
            return "- (none specified)".to_string();
        }

        let mut list = String::new();
        for (index, cuisine) in cuisines.iter().enumerate() {
            if index > 0 {
                list.push('\n');
            }
            let _ = write!(list, "- {cuisine}");
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Goal;

    fn meal_request(cuisines: &[&str]) -> MealPlanRequest {
        MealPlanRequest {
            messages: Vec::new(),
            dietary_restrictions: "Vegetarian".to_string(),
            calorie_goal: "1800".to_string(),
            cuisine_preferences: cuisines.iter().map(|c| (*c).to_string()).collect(),
            height: "65".to_string(),
            weight: "150".to_string(),
            age: "28".to_string(),
            goal: Goal::LoseWeight,
        }
    }

    fn workout_request() -> WorkoutPlanRequest {
        WorkoutPlanRequest {
            messages: Vec::new(),
            days_per_week: "4".to_string(),
            time_per_day: "45".to_string(),
            exercise_constraints: "Resistance Bands Only".to_string(),
            height: "64".to_string(),
            weight: "170".to_string(),
            age: "31".to_string(),
            goal: Goal::GainWeight,
        }
    }

    #[test]
    fn test_render_replaces_known_placeholders() {
        let mut variables = HashMap::new();
        variables.insert("NAME", "Ada");
        let rendered = TemplateEngine::render("Hello {{NAME}}, {{NAME}}!", &variables);
        assert_eq!(rendered, "Hello Ada, Ada!");
    }

    #[test]
    fn test_render_keeps_unknown_and_unterminated_placeholders() {
        let variables = HashMap::new();
        assert_eq!(TemplateEngine::render("a {{MISSING}} b", &variables), "a {{MISSING}} b");
        assert_eq!(TemplateEngine::render("a {{OPEN", &variables), "a {{OPEN");
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let mut variables = HashMap::new();
        variables.insert("A", "{{B}}");
        variables.insert("B", "secret");
        assert_eq!(TemplateEngine::render("{{A}} {{B}}", &variables), "{{B}} secret");
    }

    #[test]
    fn test_workout_prompt_contains_caller_values_verbatim() {
        let request = workout_request();
        let prompt = TemplateEngine::render_workout_prompt(&request);

        assert!(prompt.contains("4 days per week"));
        assert!(prompt.contains("exactly 4 day entries"));
        assert!(prompt.contains("45 minutes"));
        assert!(prompt.contains("Resistance Bands Only"));
        assert!(prompt.contains("Gain Weight"));
        assert!(prompt.contains("valid JSON only"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_meal_prompt_lists_each_cuisine_once_in_order() {
        let cuisines = ["Korean", "Ethiopian", "Peruvian"];
        let prompt = TemplateEngine::render_meal_prompt(&meal_request(&cuisines));

        let positions: Vec<usize> = cuisines
            .iter()
            .map(|cuisine| {
                assert_eq!(prompt.matches(cuisine).count(), 1, "{cuisine} should appear once");
                prompt.find(cuisine).unwrap()
            })
            .collect();

        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(prompt.contains("exactly 3 authentic recipes"));
        assert!(prompt.contains("1800 kcal"));
        assert!(prompt.contains("Vegetarian"));
    }

    #[test]
    fn test_prompts_accept_empty_inputs() {
        let mut request = meal_request(&[]);
        request.dietary_restrictions.clear();
        request.calorie_goal.clear();
        request.goal = Goal::Other(String::new());

        let prompt = TemplateEngine::render_meal_prompt(&request);
        assert!(prompt.contains("(none specified)"));
        assert!(!prompt.contains("{{"));

        let mut workout = workout_request();
        workout.days_per_week.clear();
        workout.exercise_constraints.clear();
        assert!(!TemplateEngine::render_workout_prompt(&workout).contains("{{"));
    }

    #[test]
    fn test_caller_text_with_braces_stays_literal() {
        let mut request = meal_request(&["{{AGE}}"]);
        request.dietary_restrictions = "{{CUISINES}}".to_string();

        let prompt = TemplateEngine::render_meal_prompt(&request);
        assert!(prompt.contains("- {{AGE}}"));
        assert!(prompt.contains("Dietary restrictions: {{CUISINES}}"));
    }
}
