// Embedded JSON extraction from model responses

use crate::error::{truncate_fragment, IngestError};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json\s*\n?([\s\S]*?)```").unwrap());

/// How the JSON fragment was located in the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSource {
    Fenced,
    Brackets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFragment {
    pub source: JsonSource,
    pub text: String,
}

/// Extract JSON code blocks from markdown content
/// Returns all ```json ... ``` blocks found in the content
pub fn extract_json_blocks(content: &str) -> Vec<String> {
    JSON_FENCE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Candidate fragments, in the order they should be tried: the first fenced
/// block, otherwise bare bracket spans. The bracket kind that opens first in
/// the text is tried first.
pub fn candidate_fragments(content: &str) -> Vec<JsonFragment> {
    if let Some(block) = extract_json_blocks(content).into_iter().next() {
        return vec![JsonFragment {
            source: JsonSource::Fenced,
            text: block,
        }];
    }

    let array = bracket_span(content, '[', ']');
    let object = bracket_span(content, '{', '}');

    let mut spans: Vec<(usize, &str)> = array.into_iter().chain(object).collect();
    spans.sort_by_key(|(start, _)| *start);
    spans
        .into_iter()
        .map(|(_, text)| JsonFragment {
            source: JsonSource::Brackets,
            text: text.to_string(),
        })
        .collect()
}

/// First-open to last-close span, with its start offset
fn bracket_span(content: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = content.find(open)?;
    let end = content.rfind(close)?;
    if end <= start {
        return None;
    }
    Some((start, &content[start..=end]))
}

/// Strict extraction for JSON-shaped endpoints: a missing or unparseable
/// fragment is a terminal error
pub fn extract_json_value(content: &str) -> Result<Value, IngestError> {
    let fragments = candidate_fragments(content);
    if fragments.is_empty() {
        return Err(IngestError::MissingJson);
    }

    let mut last_error = None;
    for fragment in &fragments {
        match serde_json::from_str::<Value>(&fragment.text) {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!(
                    "Malformed JSON in model response ({:?}): {} | fragment: {}",
                    fragment.source,
                    e,
                    truncate_fragment(&fragment.text)
                );
                last_error = Some(IngestError::malformed_json(e.to_string(), &fragment.text));
            }
        }
    }

    Err(last_error.unwrap_or(IngestError::MissingJson))
}

/// Lenient extraction for the roadmap path: failures are logged and the
/// caller falls back to text extractors
pub fn try_extract_json_value(content: &str) -> Option<Value> {
    match extract_json_value(content) {
        Ok(value) => Some(value),
        Err(IngestError::MissingJson) => None,
        Err(e) => {
            log::info!("Falling back to text extraction: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_blocks_single() {
        let content = r#"
Here's the plan:

```json
[{"title": "Launch"}]
```

That's it.
"#;

        let blocks = extract_json_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("Launch"));
    }

    #[test]
    fn test_extract_json_blocks_empty() {
        let content = "No JSON blocks here, just text.";
        assert!(extract_json_blocks(content).is_empty());
    }

    #[test]
    fn test_fenced_block_wins_over_brackets() {
        let content = "Ignore [this] part\n```json\n{\"a\": 1}\n```";
        let fragments = candidate_fragments(content);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].source, JsonSource::Fenced);
        assert_eq!(fragments[0].text, "{\"a\": 1}");
    }

    #[test]
    fn test_bracket_matching_tries_earliest_opener_first() {
        let content = r#"Sure! {"milestones": [{"title": "A"}]} Hope this helps."#;
        let fragments = candidate_fragments(content);
        assert_eq!(fragments[0].text, r#"{"milestones": [{"title": "A"}]}"#);
        assert_eq!(fragments[1].text, r#"[{"title": "A"}]"#);

        let value = extract_json_value(content).unwrap();
        assert!(value.get("milestones").is_some());
    }

    #[test]
    fn test_bare_array() {
        let content = r#"Here you go: [{"title":"Launch","status":"pending"}]"#;
        let value = extract_json_value(content).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_missing_json_is_error() {
        let err = extract_json_value("Nothing structured here").unwrap_err();
        assert!(matches!(err, IngestError::MissingJson));
    }

    #[test]
    fn test_malformed_json_is_error_with_fragment() {
        let err = extract_json_value("```json\n{\"title\": \n```").unwrap_err();
        match err {
            IngestError::MalformedJson { fragment, .. } => assert!(fragment.contains("title")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lenient_extraction_degrades() {
        assert!(try_extract_json_value("- [x] done item").is_none());
        assert!(try_extract_json_value("plain text").is_none());
        assert!(try_extract_json_value("[1, 2]").is_some());
    }
}
