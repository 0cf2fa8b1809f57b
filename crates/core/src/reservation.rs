//! Reservations and property scopes.
//!
//! Reservations are created and updated by the booking sync; everything in
//! this workspace reads them only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of the managed buildings something applies to.
///
/// Stored as a short house code (e.g. "193", "195"); the codes "both",
/// "all" and "shared" mean the whole property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PropertyScope {
    /// A single building, identified by its house code.
    House(String),
    /// Applies to every building (whole-property bookings, shared templates).
    All,
}

impl PropertyScope {
    /// Parse a stored scope label. Empty labels mean "no scope".
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        match label.to_ascii_lowercase().as_str() {
            "both" | "all" | "shared" => Some(Self::All),
            _ => Some(Self::House(label.to_string())),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::House(code) => code,
            Self::All => "both",
        }
    }

    /// The house code when this scope names exactly one building.
    pub fn house(&self) -> Option<&str> {
        match self {
            Self::House(code) => Some(code),
            Self::All => None,
        }
    }

    /// Whether a template or entry scoped to `self` applies to a booking
    /// scoped to `booking`. `All` on either side always matches; an unknown
    /// booking scope matches too.
    pub fn admits(&self, booking: Option<&PropertyScope>) -> bool {
        match (self, booking) {
            (Self::House(ours), Some(Self::House(theirs))) => ours == theirs,
            _ => true,
        }
    }
}

impl From<PropertyScope> for String {
    fn from(scope: PropertyScope) -> Self {
        scope.label().to_string()
    }
}

impl From<String> for PropertyScope {
    fn from(label: String) -> Self {
        Self::parse(&label).unwrap_or(Self::All)
    }
}

impl std::fmt::Display for PropertyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A guest reservation synced from the booking platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Local row id (0 until stored)
    pub id: i64,

    /// The booking platform's reservation identifier
    pub external_id: String,

    /// Full guest name as provided by the platform (may be empty)
    pub guest_name: String,

    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_guests: Option<u32>,

    /// Booking channel (airbnb, booking.com, direct, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default = "default_status")]
    pub status: String,

    /// Display name of the booked listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_name: Option<String>,

    /// Which building the listing belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyScope>,
}

fn default_status() -> String {
    "confirmed".into()
}

impl Reservation {
    /// Create a confirmed reservation with only the required fields set.
    pub fn new(
        external_id: impl Into<String>,
        guest_name: impl Into<String>,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            external_id: external_id.into(),
            guest_name: guest_name.into(),
            check_in,
            check_out,
            num_guests: None,
            platform: None,
            status: default_status(),
            listing_name: None,
            property: None,
        }
    }

    /// The token before the first whitespace of the guest name.
    pub fn guest_first_name(&self) -> Option<&str> {
        self.guest_name.split_whitespace().next()
    }

    /// Check-in must not be after check-out.
    pub fn validate(&self) -> Result<(), String> {
        if self.check_in > self.check_out {
            return Err(format!(
                "reservation {}: check-in {} is after check-out {}",
                self.external_id, self.check_in, self.check_out
            ));
        }
        Ok(())
    }
}
