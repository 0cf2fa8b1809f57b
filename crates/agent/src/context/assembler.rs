//! Prompt assembly for draft replies.
//!
//! Builds one user document from three sections in fixed order:
//!
//! 1. **Booking Context**: guest, property, stay dates, party size, platform, current time
//! 2. **Property Knowledge Base**: selected entries grouped under their category
//! 3. **Conversation History**: the most recent messages, oldest first
//!
//! followed by the output-format instructions the response parser expects.
//!
//! # Determinism
//!
//! Identical inputs produce identical output. The only time-dependent value
//! is the `now` passed in by the caller, rendered on the "Today" line.
//! Dates and times are shown at the assembler's UTC offset (UTC by default).
//! Missing optional facts are rendered as `unknown`, never omitted.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use innkeep_core::category::ReplyCategory;
use innkeep_core::knowledge::KnowledgeEntry;
use innkeep_core::message::{Message, SenderRole};
use innkeep_core::reservation::Reservation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conversation messages kept in the prompt; older ones are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const UNKNOWN: &str = "unknown";

/// Default system instruction for the drafting model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are the host's assistant for guest communications at two London guesthouses, \
193 and 195 Vauxhall Bridge Road, Pimlico, SW1V 1ER.

Your job is to draft replies that earn five-star reviews.

Style:
- Warm and concise. Never cold, never rambling.
- Answer the question, then anticipate the next one.
- Use the guest's first name naturally.
- Boutique host, not a corporate hotel.
- Two to four sentences for simple questions, a short paragraph at most for complex ones.
- Line breaks when answering several points.
- At most one emoji and no strings of exclamation marks.
- Do not open with filler such as \"Thank you for your message\".
- If you do not know something, say so and offer to find out. Never invent facts.
- When the guest is locked out or stuck, be fast and clear.

Rules:
- Share door codes, WiFi passwords or other security details only when the knowledge \
base provides them for this guest's property.
- Do not promise early check-in or late check-out; say you will check and get back to them.
- For complaints or damage: acknowledge, empathise, and say the host will look into it personally.
- For emergencies: give the emergency WhatsApp number (+44 7443 618207) straight away.
- Never share details about other guests or bookings.
- Sign off briefly (\"Enjoy your stay!\", \"Let me know if you need anything\").

You will receive the booking context, the knowledge base entries for the property, \
and the conversation so far. Write a reply to the guest's latest message that the host \
can send as-is or edit.";

/// All inputs required by the assembler for a single draft.
pub struct AssemblyInput<'a> {
    pub reservation: &'a Reservation,
    /// Conversation, oldest first. Templates and unsent drafts are skipped.
    pub conversation: &'a [Message],
    /// Knowledge already filtered for the booking's property.
    pub knowledge: &'a [&'a KnowledgeEntry],
    /// Rendered on the "Today" line.
    pub now: DateTime<Utc>,
}

/// The assembled prompt, ready for a provider call.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub prompt: String,
    pub metadata: AssemblyMetadata,
}

/// What went into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Messages rendered in the history section.
    pub messages_included: usize,
    /// Conversational messages available before the cap.
    pub messages_total: usize,
    pub knowledge_entries: usize,
    pub knowledge_categories: usize,
}

/// Errors from prompt assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// Nothing in the conversation to reply to.
    EmptyConversation { reservation_id: i64 },
}

impl std::fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyConversation { reservation_id } => write!(
                f,
                "Reservation {} has no conversational messages to reply to",
                reservation_id
            ),
        }
    }
}

impl std::error::Error for AssemblyError {}

/// The prompt assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
    history_limit: usize,
    utc_offset: FixedOffset,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptAssembler {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            utc_offset: Utc.fix(),
        }
    }

    /// Override the conversation window (minimum 1).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Render stay dates, "Today" and message times at this offset.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn assemble(&self, input: &AssemblyInput<'_>) -> Result<AssembledPrompt, AssemblyError> {
        let messages: Vec<&Message> = input
            .conversation
            .iter()
            .filter(|m| m.is_conversational())
            .collect();

        if messages.is_empty() {
            return Err(AssemblyError::EmptyConversation {
                reservation_id: input.reservation.id,
            });
        }

        let (knowledge_section, knowledge_categories) = Self::render_knowledge(input.knowledge);
        let (history_section, messages_included) = self.render_history(&messages);

        let sections = [
            self.render_booking(input.reservation, input.now),
            knowledge_section,
            history_section,
            Self::render_instructions(),
        ];

        Ok(AssembledPrompt {
            system: self.system_prompt.clone(),
            prompt: sections.join("\n\n"),
            metadata: AssemblyMetadata {
                messages_included,
                messages_total: messages.len(),
                knowledge_entries: input.knowledge.len(),
                knowledge_categories,
            },
        })
    }

    fn render_booking(&self, reservation: &Reservation, now: DateTime<Utc>) -> String {
        let or_unknown = |value: Option<&str>| match value {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => UNKNOWN.to_string(),
        };

        let guest = or_unknown(Some(reservation.guest_name.as_str()));
        let first_name = or_unknown(reservation.guest_first_name());
        let listing = or_unknown(reservation.listing_name.as_deref());
        let house = or_unknown(reservation.property.as_ref().map(|p| p.label()));
        let guests = reservation
            .num_guests
            .map(|n| n.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let platform = or_unknown(reservation.platform.as_deref());

        format!(
            "## Booking Context\n\
             - Guest: {guest} (first name: {first_name})\n\
             - Property: {listing} (House {house})\n\
             - Check-in: {}\n\
             - Check-out: {}\n\
             - Guests: {guests}\n\
             - Platform: {platform}\n\
             - Today: {} {}",
            self.local(reservation.check_in).format("%a %d %b %Y"),
            self.local(reservation.check_out).format("%a %d %b %Y"),
            self.local(now).format("%a %d %b %Y %H:%M"),
            self.offset_label(),
        )
    }

    fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.utc_offset)
    }

    /// `UTC` at zero offset, otherwise e.g. `UTC+02:00`.
    fn offset_label(&self) -> String {
        if self.utc_offset.local_minus_utc() == 0 {
            "UTC".to_string()
        } else {
            format!("UTC{}", self.utc_offset)
        }
    }

    /// Entries grouped under their category, categories in lexicographic
    /// order, entries in input order within a category.
    fn render_knowledge(entries: &[&KnowledgeEntry]) -> (String, usize) {
        let mut section = String::from("## Property Knowledge Base");
        if entries.is_empty() {
            section.push_str("\nNo knowledge entries are available for this property.");
            return (section, 0);
        }

        let mut grouped: BTreeMap<&str, Vec<&KnowledgeEntry>> = BTreeMap::new();
        for entry in entries {
            grouped.entry(entry.category.as_str()).or_default().push(entry);
        }

        for (category, items) in &grouped {
            section.push_str(&format!("\n\n### {category}"));
            for entry in items {
                match entry.question.as_deref().filter(|q| !q.trim().is_empty()) {
                    Some(question) => {
                        section.push_str(&format!("\nQ: {}\nA: {}", question, entry.answer))
                    }
                    None => section.push_str(&format!("\n- {}", entry.answer)),
                }
            }
        }

        (section, grouped.len())
    }

    fn render_history(&self, messages: &[&Message]) -> (String, usize) {
        let start = messages.len().saturating_sub(self.history_limit);
        let kept = &messages[start..];

        let mut section = String::from("## Conversation History");
        if start > 0 {
            section.push_str(&format!(
                " (most recent {} of {} messages)",
                kept.len(),
                messages.len()
            ));
        }

        for message in kept {
            let role = match message.sender {
                SenderRole::Guest => "GUEST",
                SenderRole::Host => "HOST",
            };
            section.push_str(&format!(
                "\n\n[{}] {}: {}",
                self.local(message.timestamp).format("%d %b %H:%M"),
                role,
                message.body
            ));
        }

        (section, kept.len())
    }

    fn render_instructions() -> String {
        format!(
            "## Your Task\n\
             Reply to the guest's latest message. Use exactly this format:\n\
             \n\
             REPLY:\n\
             <your suggested reply>\n\
             \n\
             CONFIDENCE: <number between 0.0 and 1.0>\n\
             CATEGORY: <one of: {}>",
            ReplyCategory::label_list()
        )
    }
}
