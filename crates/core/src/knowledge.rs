//! Knowledge base entries and per-category reply statistics.
//!
//! Knowledge is small (tens of entries), so every applicable entry is fed
//! to the model; there is no ranking or embedding tier.

use crate::category::ReplyCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a knowledge entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum KnowledgeSource {
    /// Typed in by the host
    Manual,
    /// Bulk-imported from the guest guide
    Imported,
    /// Derived from a host's edit of an AI draft
    Learned,
    /// A stored label this build does not know
    Unrecognized(String),
}

impl KnowledgeSource {
    pub fn from_label(label: &str) -> Self {
        match label {
            "manual" => Self::Manual,
            "imported" => Self::Imported,
            "learned" => Self::Learned,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Imported => "imported",
            Self::Learned => "learned",
            Self::Unrecognized(label) => label,
        }
    }
}

impl From<KnowledgeSource> for String {
    fn from(source: KnowledgeSource) -> Self {
        source.as_str().to_string()
    }
}

impl From<String> for KnowledgeSource {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

/// A single knowledge base entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Local row id (0 until stored)
    pub id: i64,

    /// Open taxonomy (WiFi, Bedroom, Address, ...)
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    pub answer: String,

    pub source: KnowledgeSource,

    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl KnowledgeEntry {
    /// Create an active, unsaved entry.
    pub fn new(
        category: impl Into<String>,
        question: Option<String>,
        answer: impl Into<String>,
        source: KnowledgeSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            category: category.into(),
            question,
            answer: answer.into(),
            source,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The house this entry is exclusive to, read from an `[<house> only]`
    /// marker in the answer (case-insensitive). `None` for shared entries.
    pub fn exclusive_house(&self) -> Option<String> {
        let lower = self.answer.to_lowercase();
        let mut rest = lower.as_str();
        while let Some(open) = rest.find('[') {
            let after = &rest[open + 1..];
            let Some(close) = after.find(']') else {
                break;
            };
            let inner = after[..close].trim();
            if let Some(house) = inner.strip_suffix(" only") {
                let house = house.trim();
                if !house.is_empty() && !house.contains(char::is_whitespace) {
                    return Some(house.to_string());
                }
            }
            rest = &after[close + 1..];
        }
        None
    }
}

/// Per-category accuracy counters for AI drafts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: ReplyCategory,

    /// AI drafts sent in this category, edited or not
    pub total_drafts: i64,

    /// AI drafts sent without edits
    pub sent_unedited: i64,

    #[serde(default)]
    pub auto_reply_enabled: bool,

    /// Categories the host never wants answered automatically
    #[serde(default)]
    pub never_auto_reply: bool,

    pub updated_at: DateTime<Utc>,
}

impl CategoryStat {
    /// A zeroed row for a category seen for the first time.
    pub fn new(category: ReplyCategory) -> Self {
        Self {
            category,
            total_drafts: 0,
            sent_unedited: 0,
            auto_reply_enabled: false,
            never_auto_reply: false,
            updated_at: Utc::now(),
        }
    }

    /// Share of drafts sent unedited, 0.0 when nothing has been sent yet.
    pub fn accuracy(&self) -> f64 {
        if self.total_drafts == 0 {
            0.0
        } else {
            self.sent_unedited as f64 / self.total_drafts as f64
        }
    }
}
