//! Text hygiene at both ends of a model call.
//!
//! User free text is cleaned before it is interpolated into retrieval
//! queries and prompts. Raw model output is stripped of reasoning blocks and
//! Markdown fences before JSON parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length for free-text concerns embedded in prompts.
pub const MAX_FREE_TEXT_CHARS: usize = 1_000;

/// Maximum length for short profile values (industry, answers, names).
pub const MAX_FIELD_CHARS: usize = 200;

/// Clean user-supplied text before it reaches a query or prompt.
pub fn sanitize_user_text(raw: &str, max_len: usize) -> String {
    let text = remove_invisible_unicode(raw);
    let text = remove_control_characters(&text);
    let text = remove_injection_patterns(&text);
    let text = text.trim();

    let original_len = text.chars().count();
    if original_len > max_len {
        let truncated = truncate_at_word_boundary(text, max_len);
        tracing::debug!(
            original_len,
            truncated_len = truncated.chars().count(),
            "User text truncated"
        );
        return truncated;
    }
    text.to_string()
}

/// Remove zero-width and invisible Unicode characters.
fn remove_invisible_unicode(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200F}'  // Zero-width chars
                | '\u{202A}'..='\u{202E}' // Directional formatting
                | '\u{2060}'..='\u{2064}' // Invisible operators
                | '\u{2066}'..='\u{2069}' // Directional isolates
                | '\u{FEFF}'              // BOM
                | '\u{00AD}'              // Soft hyphen
                | '\u{034F}'              // Combining grapheme joiner
                | '\u{061C}'              // Arabic letter mark
                | '\u{180E}'              // Mongolian vowel separator
            )
        })
        .collect()
}

/// Remove control characters except newline and tab.
fn remove_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Replace known prompt injection patterns with [FILTERED].
fn remove_injection_patterns(text: &str) -> String {
    static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        vec![
            // Role override attempts
            Regex::new(r"(?i)ignore\s+(?:all\s+)?(?:the\s+)?(?:previous|above|prior)?\s*(?:instructions?|rules?|prompts?|context)").unwrap(),
            Regex::new(r"(?i)disregard\s+(?:the\s+)?(?:provided\s+)?(?:context|instructions?)").unwrap(),
            Regex::new(r"(?i)forget\s+(?:everything|all|your)\s+(?:previous|prior)?").unwrap(),
            Regex::new(r"(?i)new\s+instructions?:").unwrap(),
            Regex::new(r"(?i)you\s+are\s+now\s+(?:a|an)\s+").unwrap(),
            // System/role tags
            Regex::new(r"(?i)system\s*:").unwrap(),
            Regex::new(r"(?i)assistant\s*:").unwrap(),
            Regex::new(r"<<SYS>>").unwrap(),
            Regex::new(r"\[INST\]").unwrap(),
            Regex::new(r"<\|im_start\|>").unwrap(),
            Regex::new(r"<\|im_end\|>").unwrap(),
            // Context delimiter spoofing
            Regex::new(r"(?i)<\s*/?\s*passage\b[^>]*>").unwrap(),
            // Jailbreak patterns
            Regex::new(r"(?i)(?:DAN|do\s+anything\s+now)\s+mode").unwrap(),
        ]
    });

    let mut result = text.to_string();
    for pattern in INJECTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, "[FILTERED]").to_string();
    }
    result
}

/// Truncate to at most `max` characters, backing off to the last whitespace.
fn truncate_at_word_boundary(text: &str, max: usize) -> String {
    let cut = match text.char_indices().nth(max) {
        Some((byte_idx, _)) => byte_idx,
        None => return text.to_string(),
    };
    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => truncated[..pos].trim_end().to_string(),
        _ => truncated.to_string(),
    }
}

/// Strip model artifacts so the remainder can be parsed as JSON.
///
/// Handles:
/// 1. `<think>...</think>` reasoning blocks (closed or left open)
/// 2. Markdown code fences around the payload
/// 3. Prose before the first `{` or after the last `}`
pub fn sanitize_model_output(raw: &str) -> String {
    static THINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^\s*```[a-zA-Z]*\s*$").expect("valid regex"));

    let mut text = THINK_RE.replace_all(raw, "").to_string();

    // Unterminated reasoning block: nothing after it is usable.
    if let Some(idx) = text.find("<think>") {
        text.truncate(idx);
    }

    text = FENCE_RE.replace_all(&text, "").to_string();

    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}
