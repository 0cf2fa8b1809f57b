//! Reply outcome learning.
//!
//! Every AI-drafted reply the host sends bumps its category's counters.
//! When the host substantially rewrote the draft, the final text becomes a
//! `learned` knowledge entry so later drafts pick up the preferred phrasing.

use innkeep_core::category::ReplyCategory;
use innkeep_core::error::{Error, Result};
use innkeep_core::knowledge::{KnowledgeEntry, KnowledgeSource};
use innkeep_core::message::{Message, fingerprint};
use innkeep_core::reservation::Reservation;
use innkeep_core::store::{ReplyOutcomeUpdate, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Characters of the guest's question kept as context on a learned entry.
pub const QUESTION_CONTEXT_LEN: usize = 200;

/// Prefix on the answer of every learned entry.
pub const LEARNED_ANSWER_PREFIX: &str = "Preferred reply style: ";

/// What recording a sent reply did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LearningOutcome {
    /// Not AI-generated; nothing recorded.
    Skipped,
    /// Sent as drafted; counted towards the category's accuracy.
    Unedited { category: ReplyCategory },
    /// Edited only in case or whitespace, or nothing usable to learn from.
    CosmeticEdit { category: ReplyCategory },
    /// The phrasing is already known for this category.
    Duplicate { category: ReplyCategory },
    Learned {
        category: ReplyCategory,
        knowledge_id: i64,
    },
}

/// Turns sent replies into accuracy counters and learned knowledge.
pub struct ReplyLearner {
    store: Arc<dyn Store>,
}

impl ReplyLearner {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a host message that has just been persisted as sent.
    ///
    /// Counter updates and the learned entry are written in one storage
    /// transaction. Callers treat failures as best-effort: the send has
    /// already happened and must not be reported as failed.
    pub async fn record_reply_outcome(
        &self,
        message: &Message,
        reservation: &Reservation,
    ) -> Result<LearningOutcome> {
        if !message.ai_generated {
            debug!(message_id = message.id, "Manual reply, nothing to learn");
            return Ok(LearningOutcome::Skipped);
        }
        if message.reservation_id != reservation.id {
            return Err(Error::InvalidInput(format!(
                "message {} belongs to reservation {}, not {}",
                message.id, message.reservation_id, reservation.id
            )));
        }
        message.validate().map_err(Error::InvalidInput)?;

        let category = message.category.unwrap_or_default();

        if !message.was_edited {
            let accuracy = self.apply(category, true, None).await?;
            debug!(category = %category, accuracy, "Unedited AI reply recorded");
            return Ok(LearningOutcome::Unedited { category });
        }

        let final_body = message.body.trim();
        if final_body.is_empty() || !message.edit_is_substantive() {
            self.apply(category, false, None).await?;
            debug!(category = %category, "Cosmetic edit, nothing learned");
            return Ok(LearningOutcome::CosmeticEdit { category });
        }

        let answer = format!("{LEARNED_ANSWER_PREFIX}{final_body}");
        let answer_fp = fingerprint(&answer);
        let known = self.store.learned_knowledge(category.as_str()).await?;
        if known.iter().any(|entry| fingerprint(&entry.answer) == answer_fp) {
            self.apply(category, false, None).await?;
            debug!(category = %category, "Learned phrasing already known");
            return Ok(LearningOutcome::Duplicate { category });
        }

        let question = self
            .store
            .last_guest_message_before(reservation.id, message.timestamp)
            .await?
            .map(|guest| {
                let asked: String = guest.body.trim().chars().take(QUESTION_CONTEXT_LEN).collect();
                format!("Guest asked: {asked}")
            });

        let entry =
            KnowledgeEntry::new(category.as_str(), question, answer, KnowledgeSource::Learned);
        let applied = self
            .store
            .apply_reply_outcome(ReplyOutcomeUpdate {
                category,
                unedited: false,
                learned: Some(entry),
            })
            .await?;

        let knowledge_id = applied.knowledge_id.ok_or_else(|| {
            Error::Internal(format!("store did not return an id for the learned {category} entry"))
        })?;

        info!(
            category = %category,
            knowledge_id,
            reservation_id = reservation.id,
            "Learned new reply phrasing from host edit"
        );
        Ok(LearningOutcome::Learned {
            category,
            knowledge_id,
        })
    }

    /// Bump the category counters. Returns the resulting accuracy.
    async fn apply(
        &self,
        category: ReplyCategory,
        unedited: bool,
        learned: Option<KnowledgeEntry>,
    ) -> Result<f64> {
        let applied = self
            .store
            .apply_reply_outcome(ReplyOutcomeUpdate {
                category,
                unedited,
                learned,
            })
            .await?;
        Ok(applied.stat.accuracy())
    }
}
