//! Host send flow: deliver, persist, then learn.

use crate::learner::{LearningOutcome, ReplyLearner};
use innkeep_core::category::ReplyCategory;
use innkeep_core::channel::MessageSender;
use innkeep_core::error::{Error, Result};
use innkeep_core::message::{Message, fingerprint};
use innkeep_core::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A reply the host approved for sending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendReply {
    pub reservation_id: i64,
    /// Final text, possibly edited from the draft.
    pub body: String,
    /// The AI draft this reply started from, if any.
    #[serde(default)]
    pub original_ai_draft: Option<String>,
    #[serde(default)]
    pub ai_confidence: Option<f32>,
    #[serde(default)]
    pub category: Option<ReplyCategory>,
}

/// Result of a successful send.
///
/// `learning` carries the learner's own result: a learning failure is
/// logged and reported here but never turns the send into a failure.
#[derive(Debug)]
pub struct SendReceipt {
    pub message_id: i64,
    pub was_edited: bool,
    pub learning: Result<LearningOutcome>,
}

pub struct ReplyService {
    store: Arc<dyn Store>,
    sender: Arc<dyn MessageSender>,
    learner: ReplyLearner,
}

impl ReplyService {
    pub fn new(store: Arc<dyn Store>, sender: Arc<dyn MessageSender>) -> Self {
        let learner = ReplyLearner::new(store.clone());
        Self {
            store,
            sender,
            learner,
        }
    }

    pub async fn send_reply(&self, request: SendReply) -> Result<SendReceipt> {
        let body = request.body.trim();
        if body.is_empty() {
            return Err(Error::InvalidInput("reply body is empty".into()));
        }

        let reservation = self
            .store
            .reservation(request.reservation_id)
            .await?
            .ok_or(Error::ReservationNotFound(request.reservation_id))?;

        if let Err(e) = self.sender.send_message(&reservation.external_id, body).await {
            error!(
                reservation_id = reservation.id,
                channel = self.sender.name(),
                error = %e,
                "Reply delivery failed"
            );
            return Err(e.into());
        }

        let original = request
            .original_ai_draft
            .filter(|draft| !draft.trim().is_empty());

        let mut message = Message::host(reservation.id, body);
        message.ai_generated = original.is_some();
        message.was_edited = original
            .as_deref()
            .is_some_and(|draft| fingerprint(draft) != fingerprint(body));
        message.original_ai_draft = original;
        message.ai_confidence = request.ai_confidence;
        message.category = request.category;

        message.id = self.store.insert_message(&message).await?;

        info!(
            reservation_id = reservation.id,
            message_id = message.id,
            ai_generated = message.ai_generated,
            was_edited = message.was_edited,
            "Reply sent"
        );

        let learning = self.learner.record_reply_outcome(&message, &reservation).await;
        if let Err(e) = &learning {
            warn!(message_id = message.id, error = %e, "Reply learning failed; send unaffected");
        }

        Ok(SendReceipt {
            message_id: message.id,
            was_edited: message.was_edited,
            learning,
        })
    }
}
