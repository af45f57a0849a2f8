use super::context::AssembledContext;
use super::generation::SectionPrompt;
use super::sanitize::{sanitize_user_text, MAX_FIELD_CHARS, MAX_FREE_TEXT_CHARS};
use super::schema::SectionSchema;
use crate::models::RequestProfile;

pub const TAX_SYSTEM_PROMPT: &str = "You are an expert tax advisor. Based *only* on the provided context, generate a structured JSON response. Do not invent information. When the context does not cover a required field, say that the information is not available in the reference material.";

pub const LEGAL_SYSTEM_PROMPT: &str = "You are an expert corporate lawyer advising on cross-border market entry. Based *only* on the provided context, generate a structured JSON response. Do not invent information. Flag requirements that need confirmation by local counsel.";

pub const STRATEGY_SYSTEM_PROMPT: &str = "You are a senior market-entry consultant preparing an advisory memo. Based *only* on the provided context and the user profile, generate a structured JSON response. Do not invent figures; give ranges and state assumptions when the context is thin.";

/// Replaces the context block when retrieval found nothing.
pub const NO_CONTEXT_NOTICE: &str = "No reference documents were found for this topic and jurisdiction. Do not rely on outside knowledge for specific rates, thresholds or deadlines. Where a required field cannot be supported, state that the information is insufficient and recommend verification with a local advisor.";

/// Profile facts relevant to every section, one `- Label: value` line each.
pub fn profile_lines(profile: &RequestProfile) -> Vec<String> {
    let mut lines = Vec::new();
    let field = |v: Option<&str>| {
        v.map(|s| sanitize_user_text(s, MAX_FIELD_CHARS))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Not specified".to_string())
    };

    if let Some(name) = profile.business_name.as_deref() {
        let name = sanitize_user_text(name, MAX_FIELD_CHARS);
        if !name.is_empty() {
            lines.push(format!("- Business: {name}"));
        }
    }
    lines.push(format!("- Industry: {}", field(profile.industry())));
    lines.push(format!("- Business Size: {}", field(profile.company_size())));
    lines.push(format!("- Primary Jurisdiction: {}", field(profile.jurisdiction())));

    push_list(&mut lines, "Secondary Jurisdictions", &profile.secondary_jurisdictions);
    push_list(&mut lines, "Current Markets", &profile.current_markets);
    push_list(&mut lines, "Entry Goals", &profile.entry_goals);
    if let Some(timeline) = profile.timeline.as_deref() {
        lines.push(format!("- Preferred Timeline: {}", sanitize_user_text(timeline, MAX_FIELD_CHARS)));
    }
    if let Some(structure) = profile.business_structure.as_deref() {
        lines.push(format!("- Business Structure: {}", sanitize_user_text(structure, MAX_FIELD_CHARS)));
    }
    if !profile.companies.is_empty() {
        let companies: Vec<String> = profile
            .companies
            .iter()
            .map(|c| format!("{} ({}, {})", c.name, c.kind, c.country))
            .collect();
        push_list(&mut lines, "Group Companies", &companies);
    }
    push_list(&mut lines, "Transaction Types", &profile.transaction_types);
    push_list(&mut lines, "Planned Activities", &profile.activities);
    if let Some(revenue) = profile.expected_revenue.as_deref() {
        lines.push(format!("- Expected Revenue: {}", sanitize_user_text(revenue, MAX_FIELD_CHARS)));
    }
    if let Some(option) = profile.entry_option.as_deref() {
        lines.push(format!("- Preferred Entry Option: {}", sanitize_user_text(option, MAX_FIELD_CHARS)));
    }
    push_list(&mut lines, "Compliance Priorities", &profile.compliance_priorities);
    push_list(&mut lines, "Tax Treaties", &profile.tax_treaties);
    if let Some(concerns) = profile.specific_concerns() {
        lines.push(format!(
            "- Specific Concerns: {}",
            sanitize_user_text(concerns, MAX_FREE_TEXT_CHARS)
        ));
    }
    lines
}

fn push_list(lines: &mut Vec<String>, label: &str, values: &[String]) {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| sanitize_user_text(v, MAX_FIELD_CHARS))
        .filter(|v| !v.is_empty())
        .collect();
    if !cleaned.is_empty() {
        lines.push(format!("- {label}: {}", cleaned.join(", ")));
    }
}

/// Build the prompt for one section or topic.
///
/// `task` names what to produce ("the Corporate Income Tax section"). The
/// schema's field instructions are embedded so the model sees descriptions
/// even when the backend ignores the format constraint.
pub fn build_section_prompt(
    system: &str,
    task: &str,
    context: &AssembledContext,
    profile_lines: &[String],
    schema: &SectionSchema,
) -> SectionPrompt {
    let mut user = String::new();

    user.push_str("Context:\n");
    if context.is_empty() {
        user.push_str(NO_CONTEXT_NOTICE);
    } else {
        user.push_str(&context.text);
    }
    user.push_str("\n\n");

    user.push_str("User Profile:\n");
    for line in profile_lines {
        user.push_str(line);
        user.push('\n');
    }
    user.push('\n');

    user.push_str("Required JSON fields:\n");
    user.push_str(&schema.describe());
    user.push('\n');

    user.push_str(&format!("Please generate the JSON for {task}."));

    SectionPrompt {
        system: system.to_string(),
        user,
    }
}
