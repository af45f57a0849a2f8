use super::{FieldKind, FieldSpec, SectionSchema};

use super::FieldKind::{Boolean, Number, Object, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    ExecutiveSummary,
    MarketEntryOptions,
    ImplementationTimeline,
    ResourceCosts,
    RiskAssessment,
    NextSteps,
    CorporateIncomeTax,
    Vat,
    WithholdingTax,
    TaxTopicOverview,
    LegalTopicAnalysis,
}

impl SchemaId {
    pub const ALL: [SchemaId; 11] = [
        Self::ExecutiveSummary,
        Self::MarketEntryOptions,
        Self::ImplementationTimeline,
        Self::ResourceCosts,
        Self::RiskAssessment,
        Self::NextSteps,
        Self::CorporateIncomeTax,
        Self::Vat,
        Self::WithholdingTax,
        Self::TaxTopicOverview,
        Self::LegalTopicAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive_summary",
            Self::MarketEntryOptions => "market_entry_options",
            Self::ImplementationTimeline => "implementation_timeline",
            Self::ResourceCosts => "resource_costs",
            Self::RiskAssessment => "risk_assessment",
            Self::NextSteps => "next_steps",
            Self::CorporateIncomeTax => "corporate_income_tax",
            Self::Vat => "vat",
            Self::WithholdingTax => "withholding_tax",
            Self::TaxTopicOverview => "tax_topic_overview",
            Self::LegalTopicAnalysis => "legal_topic_analysis",
        }
    }
}

/// Every section schema, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    executive_summary: SectionSchema,
    market_entry_options: SectionSchema,
    implementation_timeline: SectionSchema,
    resource_costs: SectionSchema,
    risk_assessment: SectionSchema,
    next_steps: SectionSchema,
    corporate_income_tax: SectionSchema,
    vat: SectionSchema,
    withholding_tax: SectionSchema,
    tax_topic_overview: SectionSchema,
    legal_topic_analysis: SectionSchema,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            executive_summary: executive_summary(),
            market_entry_options: market_entry_options(),
            implementation_timeline: implementation_timeline(),
            resource_costs: resource_costs(),
            risk_assessment: risk_assessment(),
            next_steps: next_steps(),
            corporate_income_tax: corporate_income_tax(),
            vat: vat(),
            withholding_tax: withholding_tax(),
            tax_topic_overview: tax_topic_overview(),
            legal_topic_analysis: legal_topic_analysis(),
        }
    }

    pub fn get(&self, id: SchemaId) -> &SectionSchema {
        match id {
            SchemaId::ExecutiveSummary => &self.executive_summary,
            SchemaId::MarketEntryOptions => &self.market_entry_options,
            SchemaId::ImplementationTimeline => &self.implementation_timeline,
            SchemaId::ResourceCosts => &self.resource_costs,
            SchemaId::RiskAssessment => &self.risk_assessment,
            SchemaId::NextSteps => &self.next_steps,
            SchemaId::CorporateIncomeTax => &self.corporate_income_tax,
            SchemaId::Vat => &self.vat,
            SchemaId::WithholdingTax => &self.withholding_tax,
            SchemaId::TaxTopicOverview => &self.tax_topic_overview,
            SchemaId::LegalTopicAnalysis => &self.legal_topic_analysis,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &SectionSchema)> {
        SchemaId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

fn list(kind: FieldKind) -> FieldKind {
    FieldKind::list_of(kind)
}

fn named_items() -> FieldKind {
    list(Object(vec![
        FieldSpec::required("name", Text, "Short name of the item"),
        FieldSpec::required("description", Text, "One or two sentences explaining it"),
    ]))
}

fn cost_items() -> FieldKind {
    list(Object(vec![
        FieldSpec::required("item", Text, "What the cost is for"),
        FieldSpec::required("estimatedCost", Text, "Estimated amount with currency, or a range"),
        FieldSpec::optional("notes", Text, "Assumptions behind the estimate"),
    ]))
}

// ═══════════════════════════════════════════
// Narrative sections
// ═══════════════════════════════════════════

fn executive_summary() -> SectionSchema {
    SectionSchema {
        name: SchemaId::ExecutiveSummary.as_str(),
        description: "Headline recommendation for entering the target market",
        fields: vec![
            FieldSpec::required(
                "primaryRecommendation",
                Text,
                "The recommended market entry approach in one or two sentences",
            ),
            FieldSpec::required("timeline", Text, "Expected time until operations can start"),
            FieldSpec::required("initialInvestment", Text, "Estimated initial investment range"),
            FieldSpec::optional(
                "liabilityProtection",
                Text,
                "How the recommended structure limits liability",
            ),
            FieldSpec::required(
                "keyStrategicBenefits",
                named_items(),
                "Main benefits of the recommended approach",
            ),
        ],
    }
}

fn market_entry_options() -> SectionSchema {
    SectionSchema {
        name: SchemaId::MarketEntryOptions.as_str(),
        description: "Comparison of the available market entry vehicles",
        fields: vec![
            FieldSpec::required(
                "options",
                list(Object(vec![
                    FieldSpec::required(
                        "entryOption",
                        Text,
                        "Entry vehicle (e.g. 'Subsidiary', 'Branch', 'Representative office')",
                    ),
                    FieldSpec::required("description", Text, "What the option involves"),
                    FieldSpec::required("setupTime", Text, "Typical time to set up"),
                    FieldSpec::required("estimatedCost", Text, "Typical setup cost"),
                    FieldSpec::required("pros", list(Text), "Advantages"),
                    FieldSpec::required("cons", list(Text), "Disadvantages"),
                ])),
                "Entry options compared for this jurisdiction",
            ),
            FieldSpec::required("recommendedOption", Text, "The option best suited to the profile"),
            FieldSpec::optional("rationale", Text, "Why the recommended option fits"),
        ],
    }
}

fn implementation_timeline() -> SectionSchema {
    SectionSchema {
        name: SchemaId::ImplementationTimeline.as_str(),
        description: "Phased plan from preparation to operational launch",
        fields: vec![
            FieldSpec::required(
                "phases",
                list(Object(vec![
                    FieldSpec::required("phase", Text, "Phase name"),
                    FieldSpec::required("duration", Text, "Expected duration (e.g. '2-4 weeks')"),
                    FieldSpec::required("activities", list(Text), "Activities in this phase"),
                ])),
                "Implementation phases in order",
            ),
            FieldSpec::required("totalDuration", Text, "Overall duration of the implementation"),
            FieldSpec::optional("totalWeeks", Number, "Overall duration in weeks"),
            FieldSpec::optional("criticalPath", list(Text), "Steps that gate the launch date"),
        ],
    }
}

fn resource_costs() -> SectionSchema {
    SectionSchema {
        name: SchemaId::ResourceCosts.as_str(),
        description: "One-off and recurring resources needed to operate",
        fields: vec![
            FieldSpec::required("setupCosts", cost_items(), "One-off setup costs"),
            FieldSpec::required("annualRecurringCosts", cost_items(), "Recurring yearly costs"),
            FieldSpec::optional("staffingRequirements", Text, "Local staffing needed"),
            FieldSpec::required(
                "totalFirstYearEstimate",
                Text,
                "Estimated total cost for the first year",
            ),
        ],
    }
}

fn risk_assessment() -> SectionSchema {
    SectionSchema {
        name: SchemaId::RiskAssessment.as_str(),
        description: "Main risks of the market entry and how to mitigate them",
        fields: vec![
            FieldSpec::required(
                "risks",
                list(Object(vec![
                    FieldSpec::required("risk", Text, "The risk"),
                    FieldSpec::required(
                        "category",
                        Text,
                        "Category such as 'Tax', 'Legal', 'Operational', 'Financial'",
                    ),
                    FieldSpec::required("likelihood", Text, "'Low', 'Medium' or 'High'"),
                    FieldSpec::required("impact", Text, "'Low', 'Medium' or 'High'"),
                    FieldSpec::required("mitigation", Text, "How to reduce or manage it"),
                ])),
                "Identified risks",
            ),
            FieldSpec::required("overallRiskLevel", Text, "'Low', 'Medium' or 'High'"),
        ],
    }
}

fn next_steps() -> SectionSchema {
    SectionSchema {
        name: SchemaId::NextSteps.as_str(),
        description: "Concrete actions to start the market entry",
        fields: vec![
            FieldSpec::required(
                "actions",
                list(Object(vec![
                    FieldSpec::required("step", Text, "The action to take"),
                    FieldSpec::optional("owner", Text, "Who should take it"),
                    FieldSpec::optional("deadline", Text, "When it should be done"),
                    FieldSpec::required("priority", Text, "'High', 'Medium' or 'Low'"),
                ])),
                "Actions in recommended order",
            ),
            FieldSpec::optional("immediateFocus", Text, "What to do in the next 30 days"),
        ],
    }
}

// ═══════════════════════════════════════════
// Tax topics
// ═══════════════════════════════════════════

fn corporate_income_tax() -> SectionSchema {
    SectionSchema {
        name: SchemaId::CorporateIncomeTax.as_str(),
        description: "Structured data for the Corporate Income Tax section",
        fields: vec![
            FieldSpec::required(
                "standardRate",
                Text,
                "The standard corporate income tax rate (e.g. '25.8%')",
            ),
            FieldSpec::required(
                "description",
                Text,
                "A 2-3 sentence overview of the corporate income tax system based on the context",
            ),
            FieldSpec::optional(
                "strategies",
                named_items(),
                "Relevant tax optimization strategies or credits",
            ),
        ],
    }
}

fn vat() -> SectionSchema {
    SectionSchema {
        name: SchemaId::Vat.as_str(),
        description: "Structured data for the Value-Added Tax section",
        fields: vec![
            FieldSpec::required(
                "rates",
                list(Object(vec![
                    FieldSpec::required("rate", Text, "The VAT rate (e.g. '21%', '9%', '0%')"),
                    FieldSpec::required("appliesTo", Text, "What this rate applies to"),
                ])),
                "The applicable VAT rates",
            ),
            FieldSpec::required(
                "registrationRequirements",
                Text,
                "A 2-3 sentence summary of when a company must register for VAT",
            ),
            FieldSpec::optional(
                "ossDetails",
                Text,
                "Details about the One-Stop-Shop (OSS) system, if relevant for the transaction types",
            ),
        ],
    }
}

fn withholding_tax() -> SectionSchema {
    SectionSchema {
        name: SchemaId::WithholdingTax.as_str(),
        description: "Structured data for the Withholding Tax section",
        fields: vec![
            FieldSpec::required(
                "rates",
                list(Object(vec![
                    FieldSpec::required(
                        "paymentType",
                        Text,
                        "Type of payment (e.g. 'Dividends', 'Interest', 'Royalties')",
                    ),
                    FieldSpec::required("rate", Text, "Domestic withholding rate"),
                    FieldSpec::optional("treatyReduction", Text, "Reduced rate available under treaties"),
                ])),
                "Withholding rates by payment type",
            ),
            FieldSpec::required("description", Text, "Overview of the withholding regime"),
            FieldSpec::optional("treatyRelief", Text, "How treaty relief is claimed"),
        ],
    }
}

fn tax_topic_overview() -> SectionSchema {
    SectionSchema {
        name: SchemaId::TaxTopicOverview.as_str(),
        description: "Overview of one tax topic for the target jurisdiction",
        fields: vec![
            FieldSpec::required("summary", Text, "A 2-3 sentence summary of the rules"),
            FieldSpec::required("keyRules", list(Text), "The rules that matter for this profile"),
            FieldSpec::optional(
                "complianceObligations",
                list(Text),
                "Filings, documentation or registrations required",
            ),
            FieldSpec::optional(
                "planningConsiderations",
                list(Text),
                "Points to consider when structuring the entry",
            ),
        ],
    }
}

// ═══════════════════════════════════════════
// Legal topics
// ═══════════════════════════════════════════

fn legal_topic_analysis() -> SectionSchema {
    SectionSchema {
        name: SchemaId::LegalTopicAnalysis.as_str(),
        description: "Analysis of one legal topic for the target jurisdiction",
        fields: vec![
            FieldSpec::required("summary", Text, "A 2-3 sentence summary of the legal position"),
            FieldSpec::required(
                "keyRequirements",
                list(Text),
                "Legal requirements that apply to the business",
            ),
            FieldSpec::optional("actionItems", list(Text), "Actions the business should take"),
            FieldSpec::optional("risks", list(Text), "Legal risks to watch"),
            FieldSpec::optional(
                "localCounselRecommended",
                Boolean,
                "Whether local counsel should be engaged",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_id_resolves_to_schema_with_same_name() {
        let registry = SchemaRegistry::new();
        for id in SchemaId::ALL {
            let schema = registry.get(id);
            assert_eq!(schema.name, id.as_str());
            assert!(!schema.fields.is_empty());
        }
        assert_eq!(registry.iter().count(), SchemaId::ALL.len());
    }

    #[test]
    fn corporate_income_tax_accepts_documented_shape() {
        let registry = SchemaRegistry::new();
        let value = json!({
            "standardRate": "25.8%",
            "description": "The Netherlands levies CIT at two rates.",
            "strategies": []
        });
        let schema = registry.get(SchemaId::CorporateIncomeTax);
        assert_eq!(schema.conform(value.clone()).unwrap(), value);
    }

    #[test]
    fn corporate_income_tax_requires_rate() {
        let registry = SchemaRegistry::new();
        let err = registry
            .get(SchemaId::CorporateIncomeTax)
            .validate(&json!({"description": "..."}))
            .unwrap_err();
        assert_eq!(err.to_string(), "missing required field `standardRate`");
    }

    #[test]
    fn vat_rates_are_nested_objects() {
        let registry = SchemaRegistry::new();
        let rendered = registry.get(SchemaId::Vat).to_json_schema();
        assert_eq!(rendered["properties"]["rates"]["type"], "array");
        assert_eq!(
            rendered["properties"]["rates"]["items"]["required"],
            json!(["rate", "appliesTo"])
        );
    }

    #[test]
    fn schema_names_are_unique() {
        let registry = SchemaRegistry::new();
        let mut names: Vec<&str> = registry.iter().map(|(_, s)| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SchemaId::ALL.len());
    }
}
