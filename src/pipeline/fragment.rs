//! Heuristic JSON-fragment extraction from free-text model output.
//!
//! Classification models are asked to respond with bare JSON, but in practice
//! wrap it in prose, code fences, or apologies. This module finds the first
//! balanced `{...}` span that parses as JSON and returns it. It is kept as an
//! isolated pure function — nothing network-related lives here — so it can be
//! hammered with adversarial model outputs in unit tests.
//!
//! The scan is string-aware: braces inside JSON string literals (including
//! escaped quotes) do not affect the balance count. Candidates that balance
//! but fail to parse are skipped and the scan resumes at the next `{`, so a
//! stray `{` in surrounding prose does not hide a later valid object.

use serde_json::Value;

/// Locate and parse the first balanced JSON object embedded in `text`.
///
/// Returns `None` when no balanced span parses as a JSON object.
pub fn extract_json_fragment(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(end) = balanced_span_end(bytes, start) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        search_from = start + 1;
    }

    None
}

/// Byte index of the `}` closing the object opened at `start`, or `None` if
/// the braces never balance.
fn balanced_span_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
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
    use serde_json::json;

    #[test]
    fn bare_object_parses() {
        let v = extract_json_fragment(r#"{"schema_id": "invoice", "confidence": 0.9}"#).unwrap();
        assert_eq!(v["schema_id"], "invoice");
    }

    #[test]
    fn object_wrapped_in_prose_is_found() {
        let text = "Sure! Based on the text, here is my answer:\n\
                    {\"schema_id\": \"receipt\", \"confidence\": 0.7}\n\
                    Let me know if you need anything else.";
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["schema_id"], "receipt");
    }

    #[test]
    fn nested_objects_balance_correctly() {
        let text = r#"result: {"schema_id": "invoice", "extracted_data": {"total": "19.99", "lines": {"count": 3}}}"#;
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["extracted_data"]["lines"]["count"], json!(3));
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance() {
        let text = r#"{"reasoning": "the header says {INVOICE} in caps", "schema_id": "invoice"}"#;
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["schema_id"], "invoice");
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let text = r#"{"reasoning": "says \"paid in full\" near a { brace", "schema_id": "receipt"}"#;
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["schema_id"], "receipt");
    }

    #[test]
    fn invalid_candidate_is_skipped_for_a_later_valid_one() {
        let text = r#"{not json at all} but then {"schema_id": "contract"}"#;
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["schema_id"], "contract");
    }

    #[test]
    fn unbalanced_braces_yield_none() {
        assert!(extract_json_fragment(r#"{"schema_id": "invoice""#).is_none());
    }

    #[test]
    fn no_braces_yield_none() {
        assert!(extract_json_fragment("I cannot classify this document.").is_none());
        assert!(extract_json_fragment("").is_none());
    }

    #[test]
    fn code_fenced_json_is_found() {
        let text = "```json\n{\"schema_id\": \"invoice\", \"confidence\": 1}\n```";
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["confidence"], json!(1));
    }

    #[test]
    fn non_object_json_is_rejected() {
        // An array is valid JSON but not the object shape we need; and a
        // lone '{' opener inside it must not break the scan.
        assert!(extract_json_fragment("[1, 2, 3]").is_none());
    }

    #[test]
    fn multibyte_text_around_the_fragment_is_safe() {
        let text = "résultat — voilà : {\"schema_id\": \"facture\"} ✓";
        let v = extract_json_fragment(text).unwrap();
        assert_eq!(v["schema_id"], "facture");
    }
}
