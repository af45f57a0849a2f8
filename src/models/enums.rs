use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + Display + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Category carried by every error marker in a memo.
    ErrorKind {
        RetrievalUnavailable => "retrieval_unavailable",
        GenerationFailure => "generation_failure",
        UnmappedTopic => "unmapped_topic",
        InsufficientProfile => "insufficient_profile",
        NotApplicable => "not_applicable",
        Timeout => "timeout",
        Internal => "internal",
    }
);

str_enum!(
    /// One named subdivision of the memo.
    SectionKind {
        ExecutiveSummary => "executive_summary",
        MarketEntryOptions => "market_entry_options",
        ImplementationTimeline => "implementation_timeline",
        ResourceCosts => "resource_costs",
        RiskAssessment => "risk_assessment",
        NextSteps => "next_steps",
        TaxCompliance => "tax_compliance",
        LegalTopics => "legal_topics",
    }
);

impl SectionKind {
    /// Heading used as the section's key in the memo document.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::MarketEntryOptions => "Market Entry Options Analysis",
            Self::ImplementationTimeline => "Implementation Timeline",
            Self::ResourceCosts => "Resource Requirements & Costs",
            Self::RiskAssessment => "Risk Assessment",
            Self::NextSteps => "Next Steps & Action Plan",
            Self::TaxCompliance => "Tax & Regulatory Compliance",
            Self::LegalTopics => "Legal & Business Topics",
        }
    }

    /// Sections whose payload is a map of selected topics.
    pub fn is_topical(&self) -> bool {
        matches!(self, Self::TaxCompliance | Self::LegalTopics)
    }
}
