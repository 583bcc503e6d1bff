//! Request classification
//!
//! Maps a free-text request to an ordered list of intents. Matching is
//! delegated to an `IntentScorer`; the `Classifier` owns ordering and the
//! `general` fallback, so classification never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a request is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Find wasteful resources
    Optimize,
    /// Project future spend
    Forecast,
    /// Flag unusual spend
    Anomaly,
    /// Recommend a savings commitment
    SavingsCommitment,
    /// Check required tags
    TagCompliance,
    /// Cost overview (fallback)
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::Forecast => "forecast",
            Self::Anomaly => "anomaly",
            Self::SavingsCommitment => "savings_commitment",
            Self::TagCompliance => "tag_compliance",
            Self::General => "general",
        }
    }

    /// Lower is dispatched and merged first
    pub fn priority(&self) -> u8 {
        match self {
            Self::Optimize => 0,
            Self::Forecast => 1,
            Self::Anomaly => 2,
            Self::SavingsCommitment => 3,
            Self::TagCompliance => 4,
            Self::General => 5,
        }
    }

    pub fn all() -> &'static [Intent] {
        &[
            Self::Optimize,
            Self::Forecast,
            Self::Anomaly,
            Self::SavingsCommitment,
            Self::TagCompliance,
            Self::General,
        ]
    }

    /// Whether answering this intent needs the cost series
    pub fn needs_costs(&self) -> bool {
        !matches!(self, Self::Optimize | Self::TagCompliance)
    }

    /// Whether answering this intent needs the resource inventory
    pub fn needs_inventory(&self) -> bool {
        matches!(self, Self::Optimize | Self::Forecast | Self::TagCompliance)
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "optimize" | "optimization" => Ok(Self::Optimize),
            "forecast" => Ok(Self::Forecast),
            "anomaly" | "anomalies" => Ok(Self::Anomaly),
            "savings_commitment" | "savings" | "commitment" => Ok(Self::SavingsCommitment),
            "tag_compliance" | "tags" => Ok(Self::TagCompliance),
            "general" => Ok(Self::General),
            _ => Err(format!(
                "Unknown intent: {} (valid: optimize, forecast, anomaly, savings-commitment, tag-compliance, general)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scores a query against the intent set
pub trait IntentScorer: Send + Sync {
    /// Intents with a positive score; intents that do not match are omitted
    fn score(&self, query: &str) -> Vec<(Intent, f64)>;
}

/// Keyword vocabulary for each intent, as regex fragments
const DEFAULT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Optimize,
        &[
            r"optimi[sz]e",
            r"optimi[sz]ations?",
            r"waste[ds]?",
            r"wasteful",
            r"idle",
            r"unused",
            r"clean ?up",
            r"underutili[sz]ed",
            r"right-?siz(e|ing)",
            r"orphan(ed)?",
        ],
    ),
    (
        Intent::Forecast,
        &[
            r"predict(ion|ed)?s?",
            r"forecast(s|ing)?",
            r"budget(s|ing)?",
            r"future",
            r"trends?",
            r"next (week|month|quarter|year)",
            r"projections?",
        ],
    ),
    (
        Intent::Anomaly,
        &[
            r"anomal(y|ies|ous)",
            r"spikes?",
            r"unusual",
            r"alerts?",
            r"outliers?",
            r"surge",
        ],
    ),
    (
        Intent::SavingsCommitment,
        &[
            r"savings plans?",
            r"commitments?",
            r"commit",
            r"reserved",
            r"reservations?",
            r"discounts?",
            r"save",
        ],
    ),
    (
        Intent::TagCompliance,
        &[
            r"tag(s|ged|ging)?",
            r"untagged",
            r"compliance",
            r"compliant",
        ],
    ),
];

/// Case-insensitive word-boundary keyword matching
pub struct LexicalScorer {
    patterns: Vec<(Intent, Regex)>,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalScorer {
    /// Scorer with the built-in vocabulary
    pub fn new() -> Self {
        Self::with_keywords(DEFAULT_KEYWORDS.iter().map(|(i, k)| (*i, k.to_vec())))
    }

    /// Scorer with a custom vocabulary of regex fragments
    pub fn with_keywords<'a>(keywords: impl IntoIterator<Item = (Intent, Vec<&'a str>)>) -> Self {
        let mut patterns = Vec::new();
        for (intent, fragments) in keywords {
            for fragment in fragments {
                match Regex::new(&format!(r"(?i)\b(?:{})\b", fragment)) {
                    Ok(re) => patterns.push((intent, re)),
                    Err(e) => {
                        tracing::warn!("Skipping invalid keyword pattern {:?}: {}", fragment, e)
                    }
                }
            }
        }
        Self { patterns }
    }
}

impl IntentScorer for LexicalScorer {
    fn score(&self, query: &str) -> Vec<(Intent, f64)> {
        let mut scores: Vec<(Intent, f64)> = Vec::new();
        for (intent, re) in &self.patterns {
            if !re.is_match(query) {
                continue;
            }
            match scores.iter_mut().find(|(i, _)| i == intent) {
                Some((_, score)) => *score += 1.0,
                None => scores.push((*intent, 1.0)),
            }
        }
        scores
    }
}

/// Request classifier with a pluggable scorer
pub struct Classifier {
    scorer: Box<dyn IntentScorer>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Box::new(LexicalScorer::new()))
    }
}

impl Classifier {
    pub fn new(scorer: Box<dyn IntentScorer>) -> Self {
        Self { scorer }
    }

    /// Ordered intents for a request.
    ///
    /// An explicit hint yields exactly `[hint]`. Otherwise every matched
    /// intent is returned in priority order, and an unmatched query is
    /// `[General]`.
    pub fn classify(&self, query: &str, hint: Option<Intent>) -> Vec<Intent> {
        if let Some(hint) = hint {
            return vec![hint];
        }

        let mut intents: Vec<Intent> = self
            .scorer
            .score(query)
            .into_iter()
            .filter(|(intent, score)| *score > 0.0 && *intent != Intent::General)
            .map(|(intent, _)| intent)
            .collect();
        intents.sort_by_key(|i| i.priority());
        intents.dedup();

        if intents.is_empty() {
            tracing::debug!("No intent matched {:?}, using general", query);
            intents.push(Intent::General);
        }
        intents
    }
}
