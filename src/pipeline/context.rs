use std::sync::LazyLock;

use regex::Regex;

use super::retrieval::RetrievedPassage;

const PASSAGE_SEPARATOR: &str = "\n\n";

/// Retrieved passages rendered as one delimited prompt block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    pub passages_used: usize,
    /// True when the character budget cut off passages or passage text.
    pub truncated: bool,
    pub sources: Vec<String>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.passages_used == 0
    }
}

/// Join every passage, in received order.
pub fn assemble(passages: &[RetrievedPassage]) -> AssembledContext {
    assemble_within(passages, usize::MAX)
}

/// Join passages in received order until the next whole passage would push
/// the block past `max_chars`. A first passage larger than the budget is cut
/// to fit rather than dropped.
pub fn assemble_within(passages: &[RetrievedPassage], max_chars: usize) -> AssembledContext {
    let mut ctx = AssembledContext::default();
    let mut total_chars = 0usize;

    for passage in passages {
        let n = ctx.passages_used + 1;
        let content = neutralize_delimiters(passage.content.trim());
        let mut block = format_passage(n, passage, &content);
        let separator = if ctx.passages_used == 0 { 0 } else { PASSAGE_SEPARATOR.len() };
        let mut cost = separator + block.chars().count();

        if total_chars.saturating_add(cost) > max_chars {
            ctx.truncated = true;
            if ctx.passages_used > 0 {
                break;
            }
            let overhead = cost - content.chars().count();
            let room = max_chars.saturating_sub(overhead);
            if room == 0 {
                break;
            }
            let cut: String = content.chars().take(room).collect();
            block = format_passage(n, passage, &cut);
            cost = block.chars().count();
        }

        if separator > 0 {
            ctx.text.push_str(PASSAGE_SEPARATOR);
        }
        ctx.text.push_str(&block);
        total_chars += cost;
        ctx.passages_used += 1;

        let source = source_label(passage);
        if !ctx.sources.iter().any(|s| s == source) {
            ctx.sources.push(source.to_string());
        }

        if ctx.truncated {
            break;
        }
    }

    if ctx.truncated {
        tracing::debug!(
            used = ctx.passages_used,
            available = passages.len(),
            max_chars,
            "Context budget reached"
        );
    }
    ctx
}

fn source_label(passage: &RetrievedPassage) -> &str {
    passage
        .metadata
        .source
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("unknown")
}

fn format_passage(n: usize, passage: &RetrievedPassage, content: &str) -> String {
    let source = source_label(passage).replace('"', "'");
    format!("<PASSAGE n=\"{n}\" source=\"{source}\">\n{content}\n</PASSAGE>")
}

/// Defuse delimiter tags appearing inside passage content.
fn neutralize_delimiters(content: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<\s*(/?)\s*passage\b[^>]*>").expect("valid regex"));
    TAG_RE.replace_all(content, "[${1}passage]").to_string()
}
