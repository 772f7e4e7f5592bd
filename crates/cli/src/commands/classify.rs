use glassdesk_core::identifier::classify;
use serde_json::json;

use crate::commands::CommandResult;

pub fn run(text: &str) -> CommandResult {
    let classification = classify(text);
    let message = match classification.entity_type {
        Some(entity_type) => format!("recognised {}", entity_type.display_name()),
        None => "no identifier recognised".to_string(),
    };

    CommandResult::success_with_data(
        "classify",
        message,
        json!({
            "input": text,
            "entity_type": classification.entity_type,
            "value": classification.value,
        }),
    )
}
