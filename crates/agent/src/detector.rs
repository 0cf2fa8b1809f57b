//! Template-message detection.
//!
//! Automated platform messages (welcome notes, check-out reminders) repeat
//! across reservations with only the greeting changed. A host message whose
//! normalized body occurs at least `min_occurrences` times is a template and
//! is kept out of the drafting prompt.

use innkeep_core::error::Result;
use innkeep_core::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_MIN_OCCURRENCES: usize = 3;

/// Characters of the normalized body used for grouping.
pub const NORMALIZED_LEN: usize = 150;

const GREETINGS: [&str; 4] = ["hi ", "hello ", "hey ", "dear "];

/// Drop a leading greeting line, collapse whitespace, keep the first
/// [`NORMALIZED_LEN`] characters. Case is preserved.
pub fn normalize_body(body: &str) -> String {
    let mut lines: Vec<&str> = body.trim().split('\n').collect();
    if lines.first().is_some_and(|first| {
        let first = first.to_lowercase();
        GREETINGS.iter().any(|g| first.starts_with(g))
    }) {
        lines.remove(0);
    }
    let joined = lines.join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(NORMALIZED_LEN).collect()
}

/// Real-time check of a new message against known template bodies.
pub fn is_likely_template(body: &str, known: &HashSet<String>) -> bool {
    known.contains(&normalize_body(body))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub host_messages: usize,
    /// Distinct template bodies found.
    pub template_groups: usize,
    /// Messages flagged as templates.
    pub flagged: usize,
}

pub struct TemplateDetector {
    store: Arc<dyn Store>,
    min_occurrences: usize,
}

impl TemplateDetector {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
        }
    }

    pub fn with_min_occurrences(mut self, min: usize) -> Self {
        self.min_occurrences = min.max(2);
        self
    }

    /// Group host messages by normalized body. Bodies that normalize to
    /// nothing (a bare greeting) are never grouped.
    async fn groups(&self) -> Result<(usize, HashMap<String, Vec<i64>>)> {
        let rows = self.store.host_message_bodies().await?;
        let total = rows.len();
        let mut groups: HashMap<String, Vec<i64>> = HashMap::new();
        for (id, body) in rows {
            let normalized = normalize_body(&body);
            if !normalized.is_empty() {
                groups.entry(normalized).or_default().push(id);
            }
        }
        Ok((total, groups))
    }

    /// Re-flag every host message: template groups on, everything else off.
    pub async fn detect_and_flag(&self) -> Result<DetectionReport> {
        let (host_messages, groups) = self.groups().await?;

        let mut template_ids = Vec::new();
        let mut template_groups = 0;
        for ids in groups.into_values() {
            if ids.len() >= self.min_occurrences {
                template_groups += 1;
                template_ids.extend(ids);
            }
        }
        template_ids.sort_unstable();

        let flagged = self.store.set_template_flags(&template_ids).await?;

        info!(
            host_messages,
            template_groups,
            flagged,
            real_replies = host_messages - template_ids.len(),
            "Template detection complete"
        );

        Ok(DetectionReport {
            host_messages,
            template_groups,
            flagged,
        })
    }

    /// Normalized bodies currently recognised as templates.
    pub async fn known_templates(&self) -> Result<HashSet<String>> {
        let (_, groups) = self.groups().await?;
        Ok(groups
            .into_iter()
            .filter(|(_, ids)| ids.len() >= self.min_occurrences)
            .map(|(body, _)| body)
            .collect())
    }
}
