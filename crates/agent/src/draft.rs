//! Draft generation: selector → assembler → one model call → parser.

use crate::context::{AssemblyError, AssemblyInput, PromptAssembler, select_knowledge};
use crate::parser::parse_draft;
use chrono::{DateTime, FixedOffset, Utc};
use innkeep_config::LlmConfig;
use innkeep_core::category::ReplyCategory;
use innkeep_core::error::{Error, Result};
use innkeep_core::provider::{Provider, ProviderRequest};
use innkeep_core::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// A drafted reply, not yet approved or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReply {
    pub reply: String,
    pub confidence: f32,
    pub category: ReplyCategory,
    /// Knowledge entries that were in the prompt.
    pub knowledge_ids_used: Vec<i64>,
    /// Provider-reported usage; 0 when not reported.
    pub tokens_used: u32,
    pub model: String,
}

/// Orchestrates a single draft for a reservation.
///
/// Read-only with respect to storage. One provider round trip per call and
/// no retries: a failed draft is reported and the host can ask again.
pub struct DraftEngine {
    store: Arc<dyn Store>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    assembler: PromptAssembler,
}

impl DraftEngine {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            temperature: 0.4,
            max_tokens: Some(1024),
            assembler: PromptAssembler::default(),
        }
    }

    /// Model, sampling parameters and system prompt from the `[llm]` section.
    pub fn from_config(
        store: Arc<dyn Store>,
        provider: Arc<dyn Provider>,
        config: &LlmConfig,
    ) -> Self {
        let assembler = match &config.system_prompt_override {
            Some(prompt) => PromptAssembler::new(prompt.clone()),
            None => PromptAssembler::default(),
        };
        Self::new(store, provider, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_assembler(assembler)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Show booking dates and times to the model at a fixed UTC offset.
    pub fn with_utc_offset_hours(mut self, hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| Error::InvalidInput(format!("UTC offset {hours}h is out of range")))?;
        self.assembler = self.assembler.with_utc_offset(offset);
        Ok(self)
    }

    pub async fn generate_draft(&self, reservation_id: i64) -> Result<DraftReply> {
        self.generate_draft_at(reservation_id, Utc::now()).await
    }

    /// Like [`generate_draft`](Self::generate_draft) with an explicit "now"
    /// for the booking context.
    pub async fn generate_draft_at(
        &self,
        reservation_id: i64,
        now: DateTime<Utc>,
    ) -> Result<DraftReply> {
        let reservation = self
            .store
            .reservation(reservation_id)
            .await?
            .ok_or(Error::ReservationNotFound(reservation_id))?;

        let conversation = self.store.conversation(reservation_id).await?;
        let knowledge = self.store.active_knowledge().await?;
        let selected = select_knowledge(&knowledge, reservation.property.as_ref());

        let assembled = self
            .assembler
            .assemble(&AssemblyInput {
                reservation: &reservation,
                conversation: &conversation,
                knowledge: &selected,
                now,
            })
            .map_err(|e| match e {
                AssemblyError::EmptyConversation { reservation_id } => {
                    Error::EmptyConversation(reservation_id)
                }
            })?;

        debug!(
            reservation_id,
            messages = assembled.metadata.messages_included,
            knowledge = assembled.metadata.knowledge_entries,
            "Prompt assembled"
        );

        info!(
            reservation_id,
            guest = %reservation.guest_name,
            provider = self.provider.name(),
            "Generating draft"
        );

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                system: assembled.system,
                prompt: assembled.prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await
            .map_err(|e| {
                error!(
                    reservation_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Draft model call failed"
                );
                Error::Provider(e)
            })?;

        let tokens_used = response.total_tokens();
        let parsed = parse_draft(&response.text);

        info!(
            reservation_id,
            category = %parsed.category,
            confidence = parsed.confidence,
            tokens = tokens_used,
            "Draft generated"
        );

        Ok(DraftReply {
            reply: parsed.reply,
            confidence: parsed.confidence,
            category: parsed.category,
            knowledge_ids_used: selected.iter().map(|e| e.id).collect(),
            tokens_used,
            model: response.model,
        })
    }
}
