//! Advice text extraction from the accepted response shapes.
//!
//! The extractors run in the order of [`ADVICE_EXTRACTORS`] and the first one
//! yielding non-empty text (after trimming) wins. The order is part of the
//! contract with the advisory endpoint:
//!
//! 1. `content`: a direct string field.
//! 2. `choices[0].message.content`: provider chat-completion shape.
//! 3. `message`: a generic string field.

use serde_json::Value;

pub type AdviceExtractor = fn(&Value) -> Option<&str>;

pub const ADVICE_EXTRACTORS: [(&str, AdviceExtractor); 3] = [
    ("content", direct_content),
    ("choices[0].message.content", first_choice_content),
    ("message", message_field),
];

fn direct_content(body: &Value) -> Option<&str> {
    body.get("content").and_then(Value::as_str)
}

fn first_choice_content(body: &Value) -> Option<&str> {
    body.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
}

fn message_field(body: &Value) -> Option<&str> {
    body.get("message").and_then(Value::as_str)
}

/// Returns the trimmed advice text from the first matching extractor.
pub fn extract_advice(body: &Value) -> Option<String> {
    ADVICE_EXTRACTORS.iter().find_map(|(_, extractor)| {
        extractor(body)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_advice, ADVICE_EXTRACTORS};

    #[test]
    fn extracts_each_accepted_shape() {
        assert_eq!(
            extract_advice(&json!({"content": "Hold position."})).as_deref(),
            Some("Hold position.")
        );
        assert_eq!(
            extract_advice(&json!({"choices": [{"message": {"content": "Advance north."}}]}))
                .as_deref(),
            Some("Advance north.")
        );
        assert_eq!(
            extract_advice(&json!({"message": "Recharge soon."})).as_deref(),
            Some("Recharge soon.")
        );
    }

    #[test]
    fn earlier_extractor_wins_when_several_match() {
        let body = json!({
            "content": "direct",
            "choices": [{"message": {"content": "choice"}}],
            "message": "generic"
        });
        assert_eq!(extract_advice(&body).as_deref(), Some("direct"));
    }

    #[test]
    fn blank_fields_fall_through_to_later_extractors() {
        let body = json!({
            "content": "   ",
            "choices": [],
            "message": "generic"
        });
        assert_eq!(extract_advice(&body).as_deref(), Some("generic"));
    }

    #[test]
    fn unrecognized_shapes_yield_none() {
        assert_eq!(extract_advice(&json!({"message": {"content": "nested"}})), None);
        assert_eq!(extract_advice(&json!({"error": "nope"})), None);
        assert_eq!(extract_advice(&json!("bare string")), None);
    }

    #[test]
    fn extractor_order_is_stable() {
        let names = ADVICE_EXTRACTORS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["content", "choices[0].message.content", "message"]);
    }
}
