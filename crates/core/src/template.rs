//! Scheduled message templates and their send log.

use crate::reservation::PropertyScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which reservation date a trigger is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateAnchor {
    CheckIn,
    CheckOut,
}

impl DateAnchor {
    /// The column/field name this anchor reads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }
}

/// When a template fires, relative to a reservation date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TriggerKind {
    DayBeforeCheckIn,
    CheckInDay,
    DayAfterCheckIn,
    DayBeforeCheckOut,
    CheckOutDay,
    /// A stored trigger label this build does not know; never fires.
    Unrecognized(String),
}

impl TriggerKind {
    pub const KNOWN: [TriggerKind; 5] = [
        Self::DayBeforeCheckIn,
        Self::CheckInDay,
        Self::DayAfterCheckIn,
        Self::DayBeforeCheckOut,
        Self::CheckOutDay,
    ];

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "day_before_checkin" => Self::DayBeforeCheckIn,
            "checkin_day" => Self::CheckInDay,
            "day_after_checkin" => Self::DayAfterCheckIn,
            "day_before_checkout" => Self::DayBeforeCheckOut,
            "checkout_day" => Self::CheckOutDay,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DayBeforeCheckIn => "day_before_checkin",
            Self::CheckInDay => "checkin_day",
            Self::DayAfterCheckIn => "day_after_checkin",
            Self::DayBeforeCheckOut => "day_before_checkout",
            Self::CheckOutDay => "checkout_day",
            Self::Unrecognized(label) => label,
        }
    }

    /// The anchor date and signed day offset: the trigger fires on the day
    /// `anchor + offset`. `None` for unrecognized triggers.
    pub fn anchor(&self) -> Option<(DateAnchor, i64)> {
        match self {
            Self::DayBeforeCheckIn => Some((DateAnchor::CheckIn, -1)),
            Self::CheckInDay => Some((DateAnchor::CheckIn, 0)),
            Self::DayAfterCheckIn => Some((DateAnchor::CheckIn, 1)),
            Self::DayBeforeCheckOut => Some((DateAnchor::CheckOut, -1)),
            Self::CheckOutDay => Some((DateAnchor::CheckOut, 0)),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<TriggerKind> for String {
    fn from(kind: TriggerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for TriggerKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default send hour when a template does not set one.
pub const DEFAULT_SEND_HOUR: u32 = 14;

/// A guest message sent automatically on a trigger day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// Local row id (0 until stored)
    pub id: i64,

    pub name: String,

    pub trigger: TriggerKind,

    /// Body with `{guest_name}`, `{check_in}`, `{check_out}`,
    /// `{listing_name}` and `{num_guests}` placeholders
    pub body: String,

    /// Hour of day (0-23) from which the template may be sent
    #[serde(default = "default_send_hour")]
    pub send_hour: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Restrict to bookings of one building; `None` or `All` means every booking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<PropertyScope>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_send_hour() -> u32 {
    DEFAULT_SEND_HOUR
}

fn default_true() -> bool {
    true
}

impl MessageTemplate {
    /// Create an enabled, unscoped template that sends from [`DEFAULT_SEND_HOUR`].
    pub fn new(name: impl Into<String>, trigger: TriggerKind, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            trigger,
            body: body.into(),
            send_hour: DEFAULT_SEND_HOUR,
            enabled: true,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_send_hour(mut self, hour: u32) -> Self {
        self.send_hour = hour;
        self
    }

    pub fn with_scope(mut self, scope: PropertyScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Whether this template applies to a booking in `property`.
    pub fn applies_to(&self, property: Option<&PropertyScope>) -> bool {
        self.scope
            .as_ref()
            .is_none_or(|scope| scope.admits(property))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.send_hour > 23 {
            return Err(format!(
                "template '{}': send hour {} is not in 0-23",
                self.name, self.send_hour
            ));
        }
        if self.body.trim().is_empty() {
            return Err(format!("template '{}' has an empty body", self.name));
        }
        Ok(())
    }
}

/// Proof that a template was delivered for a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSendLog {
    pub id: i64,
    pub template_id: i64,
    pub reservation_id: i64,
    pub sent_at: DateTime<Utc>,
    /// The exact substituted body that went out
    pub body: String,
}
