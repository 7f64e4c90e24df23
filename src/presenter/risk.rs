// src/presenter/risk.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::document::ResultDocument;

/// Behavior entries containing any of these (case-insensitive) count as a danger sign.
pub const HIGH_SEVERITY_KEYWORDS: [&str; 3] = ["keylog", "inject", "ransom"];

/// More than this many URLs is a danger sign.
pub const URL_DANGER_THRESHOLD: usize = 3;

/// More than this many commands is a danger sign.
pub const COMMAND_DANGER_THRESHOLD: usize = 2;

/// A lone URL with nothing else found still counts as clean.
pub const LOW_URL_ALLOWANCE: usize = 1;

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!("(?i){}", HIGH_SEVERITY_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("keyword alternation is a valid pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Parses a service-supplied label such as `"high"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "clean" => Some(RiskLevel::Low),
            "medium" | "moderate" | "suspicious" => Some(RiskLevel::Medium),
            "high" | "critical" | "malicious" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Whether the risk level came from the service or was derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskSource {
    Backend,
    Derived,
}

/// Everything the derived classification looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskInputs {
    pub url_count: usize,
    pub command_count: usize,
    pub behavior_count: usize,
    pub keyword_hit: bool,
}

impl RiskInputs {
    pub fn from_document(doc: &ResultDocument) -> Self {
        Self {
            url_count: doc.urls.len(),
            command_count: doc.commands.len(),
            behavior_count: doc.behavior_indicators.len(),
            keyword_hit: keyword_hit(&doc.behavior_indicators),
        }
    }

    fn danger_signs(&self) -> usize {
        [
            self.url_count > URL_DANGER_THRESHOLD,
            self.command_count > COMMAND_DANGER_THRESHOLD,
            self.keyword_hit,
        ]
        .into_iter()
        .filter(|sign| *sign)
        .count()
    }

    fn is_clean(&self) -> bool {
        self.command_count == 0
            && self.behavior_count == 0
            && self.url_count <= LOW_URL_ALLOWANCE
    }
}

/// Two or more danger signs are `High`. `Low` needs no commands, no
/// behavior entries and at most [`LOW_URL_ALLOWANCE`] URLs. Anything else
/// is `Medium`.
pub fn classify(inputs: RiskInputs) -> RiskLevel {
    if inputs.danger_signs() >= 2 {
        RiskLevel::High
    } else if inputs.is_clean() {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

pub fn keyword_hit(behavior: &[String]) -> bool {
    behavior.iter().any(|entry| KEYWORDS.is_match(entry))
}

/// The service's level when it supplied one, otherwise the derived one.
pub fn assess(doc: &ResultDocument) -> (RiskLevel, RiskSource) {
    match doc.risk {
        Some(level) => (level, RiskSource::Backend),
        None => (classify(RiskInputs::from_document(doc)), RiskSource::Derived),
    }
}
