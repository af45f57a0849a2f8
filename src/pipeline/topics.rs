//! Topic registry.
//!
//! Clients select topics by hyphenated id (`corporate-income-tax`) or by the
//! label shown in the form ("Corporate income tax implications"). The corpus
//! is tagged with snake_case keys (`corporate_income_tax`). Every selectable
//! topic is a fixed variant here; anything else resolves to [`UnmappedTopic`].

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCategory {
    Tax,
    Legal,
}

impl TopicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tax => "tax",
            Self::Legal => "legal",
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selected label that matches no registered topic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {category} topic: {label}")]
pub struct UnmappedTopic {
    pub category: TopicCategory,
    pub label: String,
}

// ═══════════════════════════════════════════
// Tax topics
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxTopic {
    CorporateIncomeTax,
    Vat,
    WithholdingTax,
    TransferPricing,
    PermanentEstablishment,
    SubstanceRequirements,
    PayrollTax,
}

impl TaxTopic {
    pub const ALL: [TaxTopic; 7] = [
        Self::CorporateIncomeTax,
        Self::Vat,
        Self::WithholdingTax,
        Self::TransferPricing,
        Self::PermanentEstablishment,
        Self::SubstanceRequirements,
        Self::PayrollTax,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::CorporateIncomeTax => "corporate-income-tax",
            Self::Vat => "vat",
            Self::WithholdingTax => "withholding-tax",
            Self::TransferPricing => "transfer-pricing",
            Self::PermanentEstablishment => "permanent-establishment",
            Self::SubstanceRequirements => "substance-requirements",
            Self::PayrollTax => "payroll-tax",
        }
    }

    /// Corpus topic key used in retrieval filters.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CorporateIncomeTax => "corporate_income_tax",
            Self::Vat => "vat",
            Self::WithholdingTax => "withholding_tax",
            Self::TransferPricing => "transfer_pricing",
            Self::PermanentEstablishment => "permanent_establishment",
            Self::SubstanceRequirements => "substance_requirements",
            Self::PayrollTax => "payroll_tax",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::CorporateIncomeTax => "Corporate Income Tax",
            Self::Vat => "Value-Added Tax (VAT)",
            Self::WithholdingTax => "Withholding Tax",
            Self::TransferPricing => "Transfer Pricing",
            Self::PermanentEstablishment => "Permanent Establishment",
            Self::SubstanceRequirements => "Substance Requirements",
            Self::PayrollTax => "Payroll Tax",
        }
    }

    /// Form labels accepted in addition to id, key and title.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::CorporateIncomeTax => &[
                "corporate income tax implications",
                "corporate income tax",
                "cit",
            ],
            Self::Vat => &[
                "value-added tax (vat) registration and compliance",
                "vat registration and compliance",
                "value-added tax",
                "value added tax",
            ],
            Self::WithholdingTax => &["withholding tax obligations", "withholding taxes"],
            Self::TransferPricing => &["transfer pricing requirements", "transfer pricing documentation"],
            Self::PermanentEstablishment => &["permanent establishment risk", "pe risk"],
            Self::SubstanceRequirements => &["economic substance"],
            Self::PayrollTax => &["payroll tax and social contributions", "payroll taxes"],
        }
    }

    pub fn resolve(label: &str) -> Result<Self, UnmappedTopic> {
        let needle = normalize(label);
        Self::ALL
            .into_iter()
            .find(|t| matches_topic(&needle, t.id(), t.key(), t.title(), t.aliases()))
            .ok_or_else(|| UnmappedTopic {
                category: TopicCategory::Tax,
                label: label.to_string(),
            })
    }
}

// ═══════════════════════════════════════════
// Legal topics
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegalTopic {
    CorporateLaw,
    EmploymentLaw,
    IntellectualProperty,
    DataProtection,
    Immigration,
    BankingPayments,
    LicensingPermits,
    ContractLaw,
    RealEstate,
    DisputeResolution,
    EnvironmentalLaw,
    SocialSecurity,
}

impl LegalTopic {
    pub const ALL: [LegalTopic; 12] = [
        Self::CorporateLaw,
        Self::EmploymentLaw,
        Self::IntellectualProperty,
        Self::DataProtection,
        Self::Immigration,
        Self::BankingPayments,
        Self::LicensingPermits,
        Self::ContractLaw,
        Self::RealEstate,
        Self::DisputeResolution,
        Self::EnvironmentalLaw,
        Self::SocialSecurity,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::CorporateLaw => "corporate-law",
            Self::EmploymentLaw => "employment-law",
            Self::IntellectualProperty => "intellectual-property",
            Self::DataProtection => "data-protection",
            Self::Immigration => "immigration",
            Self::BankingPayments => "banking-payments",
            Self::LicensingPermits => "licensing-permits",
            Self::ContractLaw => "contract-law",
            Self::RealEstate => "real-estate",
            Self::DisputeResolution => "dispute-resolution",
            Self::EnvironmentalLaw => "environmental-law",
            Self::SocialSecurity => "social-security",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::CorporateLaw => "corporate_law",
            Self::EmploymentLaw => "employment_law",
            Self::IntellectualProperty => "intellectual_property",
            Self::DataProtection => "data_protection",
            Self::Immigration => "immigration",
            Self::BankingPayments => "banking_payments",
            Self::LicensingPermits => "licensing_permits",
            Self::ContractLaw => "contract_law",
            Self::RealEstate => "real_estate",
            Self::DisputeResolution => "dispute_resolution",
            Self::EnvironmentalLaw => "environmental_law",
            Self::SocialSecurity => "social_security",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::CorporateLaw => "Corporate Law",
            Self::EmploymentLaw => "Employment Law",
            Self::IntellectualProperty => "Intellectual Property",
            Self::DataProtection => "Data Protection",
            Self::Immigration => "Immigration",
            Self::BankingPayments => "Banking & Payments",
            Self::LicensingPermits => "Licensing & Permits",
            Self::ContractLaw => "Contract Law",
            Self::RealEstate => "Real Estate",
            Self::DisputeResolution => "Dispute Resolution",
            Self::EnvironmentalLaw => "Environmental Law",
            Self::SocialSecurity => "Social Security",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::CorporateLaw => &["company law", "entity formation"],
            Self::EmploymentLaw => &["labour law", "labor law"],
            Self::IntellectualProperty => &["ip protection"],
            Self::DataProtection => &["gdpr", "privacy"],
            Self::Immigration => &["visas and work permits"],
            Self::BankingPayments => &["banking and payments"],
            Self::LicensingPermits => &["licensing and permits"],
            Self::ContractLaw => &[],
            Self::RealEstate => &["commercial real estate"],
            Self::DisputeResolution => &["arbitration"],
            Self::EnvironmentalLaw => &[],
            Self::SocialSecurity => &["social insurance"],
        }
    }

    pub fn resolve(label: &str) -> Result<Self, UnmappedTopic> {
        let needle = normalize(label);
        Self::ALL
            .into_iter()
            .find(|t| matches_topic(&needle, t.id(), t.key(), t.title(), t.aliases()))
            .ok_or_else(|| UnmappedTopic {
                category: TopicCategory::Legal,
                label: label.to_string(),
            })
    }
}

// ═══════════════════════════════════════════
// Corpus topics
// ═══════════════════════════════════════════

/// Any topic key the retrieval corpus is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorpusTopic {
    Tax(TaxTopic),
    Legal(LegalTopic),
    General,
    Timeline,
    Costs,
    Risk,
}

impl CorpusTopic {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Tax(topic) => topic.key(),
            Self::Legal(topic) => topic.key(),
            Self::General => "general",
            Self::Timeline => "timeline",
            Self::Costs => "costs",
            Self::Risk => "risk",
        }
    }
}

impl From<TaxTopic> for CorpusTopic {
    fn from(topic: TaxTopic) -> Self {
        Self::Tax(topic)
    }
}

impl From<LegalTopic> for CorpusTopic {
    fn from(topic: LegalTopic) -> Self {
        Self::Legal(topic)
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Compare a normalized label against every accepted spelling of a topic.
/// Spaces and underscores are read as hyphens when matching the id, so
/// "Corporate Law" and "corporate_law" both reach `corporate-law`.
fn matches_topic(
    needle: &str,
    id: &str,
    key: &str,
    title: &str,
    aliases: &[&str],
) -> bool {
    if needle.is_empty() {
        return false;
    }
    let hyphenated: String = needle
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect();

    needle == id
        || needle == key
        || hyphenated == id
        || needle == title.to_lowercase()
        || aliases.iter().any(|alias| needle == *alias)
}
