//! Question categories used to tag drafted replies.
//!
//! The set is closed: the model is told to pick one of these labels, and
//! anything it returns outside the set is filed under `General`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReplyCategory {
    WiFi,
    CheckIn,
    CheckOut,
    Bathroom,
    Kitchen,
    Laundry,
    Heating,
    TV,
    Transport,
    LocalArea,
    LockInfo,
    Amenities,
    EarlyCheckIn,
    LateCheckOut,
    LuggageStorage,
    Complaint,
    Emergency,
    Pricing,
    Cancellation,
    SpecialRequest,
    #[default]
    General,
}

impl ReplyCategory {
    /// Every category, in the order presented to the model.
    pub const ALL: [ReplyCategory; 21] = [
        Self::WiFi,
        Self::CheckIn,
        Self::CheckOut,
        Self::Bathroom,
        Self::Kitchen,
        Self::Laundry,
        Self::Heating,
        Self::TV,
        Self::Transport,
        Self::LocalArea,
        Self::LockInfo,
        Self::Amenities,
        Self::EarlyCheckIn,
        Self::LateCheckOut,
        Self::LuggageStorage,
        Self::Complaint,
        Self::Emergency,
        Self::Pricing,
        Self::Cancellation,
        Self::SpecialRequest,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WiFi => "WiFi",
            Self::CheckIn => "CheckIn",
            Self::CheckOut => "CheckOut",
            Self::Bathroom => "Bathroom",
            Self::Kitchen => "Kitchen",
            Self::Laundry => "Laundry",
            Self::Heating => "Heating",
            Self::TV => "TV",
            Self::Transport => "Transport",
            Self::LocalArea => "LocalArea",
            Self::LockInfo => "LockInfo",
            Self::Amenities => "Amenities",
            Self::EarlyCheckIn => "EarlyCheckIn",
            Self::LateCheckOut => "LateCheckOut",
            Self::LuggageStorage => "LuggageStorage",
            Self::Complaint => "Complaint",
            Self::Emergency => "Emergency",
            Self::Pricing => "Pricing",
            Self::Cancellation => "Cancellation",
            Self::SpecialRequest => "SpecialRequest",
            Self::General => "General",
        }
    }

    /// Parse a label, filing anything unrecognized under `General`.
    pub fn from_label_or_general(label: &str) -> Self {
        label.parse().unwrap_or(Self::General)
    }

    /// Comma-separated list of every label, for prompt instructions.
    pub fn label_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ReplyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyCategory {
    type Err = String;

    /// Case-insensitive match against the closed set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown reply category: {s}"))
    }
}
