//! The structured response shape and its client-side validation.

use serde::{Deserialize, Deserializer, Serialize};

use super::CompletionError;

/// Schema name sent with strict JSON-schema requests.
pub const RESPONSE_SCHEMA_NAME: &str = "study_assistant_response";

/// The assistant's answer to one question.
///
/// `answer` is always present. The list fields default to empty; `null` or a
/// missing key from the model is read as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "nullable_list")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub suggested_questions: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub references: Vec<String>,
}

impl StructuredResponse {
    pub fn from_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Default::default()
        }
    }
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// JSON schema for strict structured-output requests.
///
/// Strict mode requires every property listed in `required` and no extras.
pub fn response_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": {
                "type": "string",
                "description": "Direct, well-structured explanation answering the user's question"
            },
            "key_points": {
                "description": "Bullet points summarizing the main ideas",
                "type": "array", "items": { "type": "string" }
            },
            "suggested_questions": {
                "description": "Follow-up questions the user could ask next about this topic",
                "type": "array", "items": { "type": "string" }
            },
            "references": {
                "description": "Sources or further reading, empty when none apply",
                "type": "array", "items": { "type": "string" }
            }
        },
        "required": ["answer", "key_points", "suggested_questions", "references"],
        "additionalProperties": false
    })
}

/// Validate raw model content into a [`StructuredResponse`].
///
/// Tolerates prose or code fences around the object by taking the first
/// balanced JSON object in the text.
pub fn parse_structured(content: &str) -> Result<StructuredResponse, CompletionError> {
    let candidate = extract_first_json_object(content)
        .ok_or_else(|| CompletionError::malformed("model output contains no JSON object"))?;

    let response = serde_json::from_str::<StructuredResponse>(candidate).map_err(|e| {
        CompletionError::malformed(format!("model output does not match schema: {e}"))
    })?;

    if response.answer.trim().is_empty() {
        return Err(CompletionError::malformed("model output has an empty answer"));
    }
    Ok(response)
}

/// First balanced `{...}` in `s`, ignoring braces inside JSON strings.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionErrorKind;

    #[test]
    fn parses_complete_object() {
        let raw = r#"{"answer":"A derivative is a rate of change.","key_points":["slope"],"suggested_questions":["What is an integral?"],"references":["Stewart, Calculus"]}"#;
        let parsed = parse_structured(raw).unwrap();
        assert_eq!(parsed.answer, "A derivative is a rate of change.");
        assert_eq!(parsed.key_points, vec!["slope"]);
        assert_eq!(parsed.suggested_questions, vec!["What is an integral?"]);
        assert_eq!(parsed.references, vec!["Stewart, Calculus"]);
    }

    #[test]
    fn missing_and_null_lists_become_empty() {
        let parsed = parse_structured(r#"{"answer":"x","key_points":null}"#).unwrap();
        assert!(parsed.key_points.is_empty());
        assert!(parsed.suggested_questions.is_empty());
        assert!(parsed.references.is_empty());
    }

    #[test]
    fn surrounding_noise_is_tolerated() {
        let raw = "Sure! Here you go:\n```json\n{\"answer\": \"use {braces} freely\"}\n```";
        let parsed = parse_structured(raw).unwrap();
        assert_eq!(parsed.answer, "use {braces} freely");
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let raw = r#"{"answer": "she said \"}\" loudly"}"#;
        let parsed = parse_structured(raw).unwrap();
        assert_eq!(parsed.answer, "she said \"}\" loudly");
    }

    #[test]
    fn missing_answer_is_malformed() {
        let err = parse_structured(r#"{"key_points":["a"]}"#).unwrap_err();
        assert_eq!(err.kind, CompletionErrorKind::MalformedOutput);
        assert!(err.message.contains("answer"));
    }

    #[test]
    fn blank_answer_is_malformed() {
        let err = parse_structured(r#"{"answer":"   ","key_points":[]}"#).unwrap_err();
        assert_eq!(err.kind, CompletionErrorKind::MalformedOutput);
    }

    #[test]
    fn wrong_types_are_malformed() {
        let err = parse_structured(r#"{"answer":"x","key_points":"not a list"}"#).unwrap_err();
        assert_eq!(err.kind, CompletionErrorKind::MalformedOutput);
    }

    #[test]
    fn plain_text_is_malformed() {
        let err = parse_structured("I think the answer is 42.").unwrap_err();
        assert_eq!(err.kind, CompletionErrorKind::MalformedOutput);
    }

    #[test]
    fn unbalanced_object_is_malformed() {
        assert!(parse_structured(r#"{"answer": "cut off"#).is_err());
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = response_json_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["answer", "key_points", "suggested_questions", "references"]);
        assert_eq!(schema["additionalProperties"], false);
    }
}
