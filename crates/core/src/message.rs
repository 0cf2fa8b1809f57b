//! Guest conversation messages.
//!
//! One thread per reservation, ordered by timestamp. Messages arrive from
//! the booking sync, from inbound webhooks, and from the host send flow.

use crate::category::ReplyCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters kept by [`fingerprint`].
pub const FINGERPRINT_LEN: usize = 200;

/// Normalized form of `text` for near-duplicate comparison: lowercased,
/// whitespace runs collapsed to one space, capped at [`FINGERPRINT_LEN`] chars.
pub fn fingerprint(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.chars().take(FINGERPRINT_LEN).collect()
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// The guest
    Guest,
    /// The host, whether typed by hand or drafted by the AI
    Host,
}

impl SenderRole {
    /// Anything that is not explicitly a guest counts as the host side.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("guest") {
            Self::Guest
        } else {
            Self::Host
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Host => "host",
        }
    }
}

/// A single message in a reservation's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Local row id (0 until stored)
    pub id: i64,

    pub reservation_id: i64,

    /// Booking platform message id, for synced messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub timestamp: DateTime<Utc>,

    pub sender: SenderRole,

    pub body: String,

    /// Not yet approved by the host
    #[serde(default)]
    pub is_draft: bool,

    #[serde(default = "default_true")]
    pub is_sent: bool,

    // AI metadata
    #[serde(default)]
    pub ai_generated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f32>,

    #[serde(default)]
    pub ai_auto_sent: bool,

    // Edit tracking
    #[serde(default)]
    pub was_edited: bool,

    /// What the AI originally proposed, when the host edited it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_ai_draft: Option<String>,

    /// Question category assigned when the reply was drafted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ReplyCategory>,

    /// Automated platform template rather than a real reply
    #[serde(default)]
    pub is_template: bool,
}

fn default_true() -> bool {
    true
}

impl Message {
    fn new(reservation_id: i64, sender: SenderRole, body: impl Into<String>) -> Self {
        Self {
            id: 0,
            reservation_id,
            external_id: None,
            timestamp: Utc::now(),
            sender,
            body: body.into(),
            is_draft: false,
            is_sent: true,
            ai_generated: false,
            ai_confidence: None,
            ai_auto_sent: false,
            was_edited: false,
            original_ai_draft: None,
            category: None,
            is_template: false,
        }
    }

    /// Create a message sent by the guest.
    pub fn guest(reservation_id: i64, body: impl Into<String>) -> Self {
        Self::new(reservation_id, SenderRole::Guest, body)
    }

    /// Create a message sent by the host.
    pub fn host(reservation_id: i64, body: impl Into<String>) -> Self {
        Self::new(reservation_id, SenderRole::Host, body)
    }

    /// Set the timestamp (builder style).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this is a real conversational message: not a platform
    /// template and not an unapproved draft.
    pub fn is_conversational(&self) -> bool {
        !self.is_template && !self.is_draft
    }

    /// True when `original_ai_draft` is present and differs from `body`
    /// beyond case and whitespace.
    pub fn edit_is_substantive(&self) -> bool {
        match self.original_ai_draft.as_deref() {
            Some(original) if !original.trim().is_empty() => {
                fingerprint(original) != fingerprint(&self.body)
            }
            _ => false,
        }
    }

    /// `was_edited` requires a non-empty original draft.
    pub fn validate(&self) -> Result<(), String> {
        if self.was_edited
            && self
                .original_ai_draft
                .as_deref()
                .is_none_or(|d| d.trim().is_empty())
        {
            return Err(format!(
                "message {} is marked edited but has no original AI draft",
                self.id
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_collapses_case_and_whitespace() {
        assert_eq!(
            fingerprint("  Hello\n\tThere   Friend "),
            fingerprint("hello there friend")
        );
        assert_ne!(fingerprint("hello there"), fingerprint("hello, there"));
    }

    #[test]
    fn fingerprint_is_length_capped() {
        let long = "word ".repeat(100);
        assert_eq!(fingerprint(&long).chars().count(), FINGERPRINT_LEN);
    }

    #[test]
    fn sender_labels() {
        assert_eq!(SenderRole::from_label("guest"), SenderRole::Guest);
        assert_eq!(SenderRole::from_label("host"), SenderRole::Host);
        assert_eq!(SenderRole::from_label("ai"), SenderRole::Host);
    }

    #[test]
    fn substantive_edit_detection() {
        let mut msg = Message::host(1, "The WiFi password is on the fridge.");
        assert!(!msg.edit_is_substantive());

        msg.original_ai_draft = Some("The WiFi password is on the fridge.   ".into());
        assert!(!msg.edit_is_substantive());

        msg.original_ai_draft = Some("The WiFi password is in the welcome book.".into());
        assert!(msg.edit_is_substantive());
    }

    #[test]
    fn edited_without_original_is_invalid() {
        let mut msg = Message::host(1, "Sure!");
        msg.was_edited = true;
        assert!(msg.validate().is_err());

        msg.original_ai_draft = Some("Of course.".into());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn drafts_and_templates_are_not_conversational() {
        let mut msg = Message::guest(1, "Hi");
        assert!(msg.is_conversational());
        msg.is_draft = true;
        assert!(!msg.is_conversational());
        msg.is_draft = false;
        msg.is_template = true;
        assert!(!msg.is_conversational());
    }
}
