use serde_json::Value;

use crate::error::PlanError;

const PREVIEW_CHARS: usize = 120;

/// Parses completion text as JSON and returns it unchanged.
///
/// Prose around the JSON or markdown fences make the whole completion
/// malformed; nothing is stripped or repaired.
pub fn parse_completion(text: &str) -> Result<Value, PlanError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::warn!(
            "Completion is not valid JSON ({} chars, starts with {:?}): {}",
            text.len(),
            preview(text),
            e
        );
        PlanError::MalformedCompletion(e)
    })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
