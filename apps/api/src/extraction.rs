//! Structured-Response Extractor: pulls one JSON array or object out of free-form model text.
//!
//! The model is asked for JSON only but often wraps it in prose or code fences.
//! Extraction is best-effort: the pipeline only sees the `ResponseExtractor` trait,
//! so the heuristic here can be replaced (e.g. by a structured-output mode) without
//! touching stage logic.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Top-level JSON type a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn opener(self) -> char {
        match self {
            JsonShape::Array => '[',
            JsonShape::Object => '{',
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Array => value.is_array(),
            JsonShape::Object => value.is_object(),
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonShape::Array => f.write_str("array"),
            JsonShape::Object => f.write_str("object"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON {shape} found in response")]
    NotFound { shape: JsonShape },

    #[error("JSON {shape} in response is not valid: {source}")]
    Invalid {
        shape: JsonShape,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON did not match the expected schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Narrow seam between the pipeline and reply parsing.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, text: &str, shape: JsonShape) -> Result<Value, ExtractError>;
}

/// Extracts and deserializes in one step.
pub fn extract_as<T: DeserializeOwned>(
    extractor: &dyn ResponseExtractor,
    text: &str,
    shape: JsonShape,
) -> Result<T, ExtractError> {
    let value = extractor.extract(text, shape)?;
    serde_json::from_value(value).map_err(ExtractError::Schema)
}

/// Default extractor.
///
/// Looks inside markdown code fences first, then at the whole reply. Within each
/// region every opening bracket of the requested shape is tried in order, and the
/// first complete JSON value starting there wins. Nesting and brackets inside
/// strings are handled by the JSON parser itself; anything after the value is
/// ignored, so a second brace block is never merged into the first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedJsonExtractor;

impl ResponseExtractor for DelimitedJsonExtractor {
    fn extract(&self, text: &str, shape: JsonShape) -> Result<Value, ExtractError> {
        let mut first_error: Option<serde_json::Error> = None;
        let mut saw_opener = false;

        for region in candidate_regions(text) {
            for (offset, _) in region.match_indices(shape.opener()) {
                saw_opener = true;
                match parse_leading_value(&region[offset..]) {
                    Ok(value) if shape.matches(&value) => return Ok(value),
                    Ok(_) => {}
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        }

        match first_error {
            Some(source) if saw_opener => Err(ExtractError::Invalid { shape, source }),
            _ => Err(ExtractError::NotFound { shape }),
        }
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
    })
}

/// Fenced bodies first, then the full text as a fallback.
fn candidate_regions(text: &str) -> Vec<&str> {
    let mut regions: Vec<&str> = fence_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    regions.push(text);
    regions
}

/// Parses one JSON value from the start of `text`, ignoring whatever follows it.
fn parse_leading_value(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
        .unwrap_or_else(|| serde_json::from_str(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str, shape: JsonShape) -> Result<Value, ExtractError> {
        DelimitedJsonExtractor.extract(text, shape)
    }

    #[test]
    fn test_array_embedded_in_prose() {
        let text = "Based on the profile, I recommend:\n[\"Mathematics\", \"Physics\"]\nThese cover the foundations.";
        assert_eq!(
            extract(text, JsonShape::Array).unwrap(),
            json!(["Mathematics", "Physics"])
        );
    }

    #[test]
    fn test_nested_arrays_are_kept_whole() {
        let embedded = json!([
            {"course_title": "Linear Algebra", "prerequisites": ["Calculus I", "Calculus II"]},
            {"course_title": "Probability", "prerequisites": []}
        ]);
        let text = format!("Here are the courses:\n{embedded}\nLet me know if you need more.");
        assert_eq!(extract(&text, JsonShape::Array).unwrap(), embedded);
    }

    #[test]
    fn test_object_with_nested_braces_and_bracket_strings() {
        let embedded = json!({
            "roadmap": {"levels": [{"level": 1, "level_name": "Foundation {core}", "courses": []}]},
            "total_estimated_time": "6 months",
            "learning_path_summary": "Covers [basics] first"
        });
        let text = format!("Sure! {embedded} Hope this helps.");
        assert_eq!(extract(&text, JsonShape::Object).unwrap(), embedded);
    }

    #[test]
    fn test_only_first_object_is_taken() {
        let text = r#"{"a": 1} and also {"b": 2}"#;
        assert_eq!(extract(text, JsonShape::Object).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_code_fenced_json_preferred() {
        let text = "Notes [draft]\n```json\n[\"Biology\"]\n```\n";
        assert_eq!(extract(text, JsonShape::Array).unwrap(), json!(["Biology"]));
    }

    #[test]
    fn test_skips_invalid_bracket_before_real_array() {
        let text = "Options [see below]: [\"Chemistry\"]";
        assert_eq!(extract(text, JsonShape::Array).unwrap(), json!(["Chemistry"]));
    }

    #[test]
    fn test_no_brackets_is_not_found() {
        let err = extract("I cannot recommend anything.", JsonShape::Array).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { shape: JsonShape::Array }));
    }

    #[test]
    fn test_array_reply_when_object_expected_is_not_found() {
        let err = extract(r#"["Mathematics"]"#, JsonShape::Object).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { shape: JsonShape::Object }));
    }

    #[test]
    fn test_broken_json_is_invalid() {
        let err = extract("Result: [\"Mathematics\", ", JsonShape::Array).unwrap_err();
        assert!(matches!(err, ExtractError::Invalid { .. }));
    }

    #[test]
    fn test_extract_as_maps_schema_errors() {
        let names: Vec<String> =
            extract_as(&DelimitedJsonExtractor, r#"["A", "B"]"#, JsonShape::Array).unwrap();
        assert_eq!(names, vec!["A", "B"]);

        let err = extract_as::<Vec<String>>(&DelimitedJsonExtractor, "[1, 2]", JsonShape::Array)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Schema(_)));
    }
}
