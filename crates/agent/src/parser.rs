//! Draft response parser.
//!
//! The model is asked to answer in a labelled format:
//!
//! ```text
//! REPLY:
//! <reply text>
//!
//! CONFIDENCE: 0.85
//! CATEGORY: WiFi
//! ```
//!
//! Models drift from the format, so parsing never fails. A missing reply
//! label yields the whole text as the reply, a missing or unparsable
//! confidence yields [`DEFAULT_CONFIDENCE`], and a missing or unknown
//! category yields [`ReplyCategory::General`].

use innkeep_core::category::ReplyCategory;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Confidence assumed when the model does not report one.
pub const DEFAULT_CONFIDENCE: f32 = 0.7;

static REPLY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"REPLY:[ \t]*\r?\n?").expect("static regex"));
static TRAILING_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(CONFIDENCE|CATEGORY):").expect("static regex"));
// Unsigned only: a negative value does not match and falls back to the default.
static CONFIDENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CONFIDENCE:[ \t]*([0-9.]+)").expect("static regex"));
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CATEGORY:[ \t]*(\w+)").expect("static regex"));

/// A parsed model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDraft {
    pub reply: String,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f32,
    pub category: ReplyCategory,
}

/// Parse raw model output into reply, confidence and category.
pub fn parse_draft(raw: &str) -> ParsedDraft {
    ParsedDraft {
        reply: extract_reply(raw),
        confidence: extract_confidence(raw),
        category: extract_category(raw),
    }
}

/// Text after `REPLY:` up to the next `CONFIDENCE:`/`CATEGORY:` line, or
/// the whole input (minus any trailing labels) when there is no reply label.
fn extract_reply(raw: &str) -> String {
    let body = match REPLY_LABEL.find(raw) {
        Some(label) => &raw[label.end()..],
        None => raw,
    };
    let body = match TRAILING_LABEL.find(body) {
        Some(next) => &body[..next.start()],
        None => body,
    };
    body.trim().to_string()
}

fn extract_confidence(raw: &str) -> f32 {
    CONFIDENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0)
}

fn extract_category(raw: &str) -> ReplyCategory {
    CATEGORY
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| ReplyCategory::from_label_or_general(m.as_str()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_response() {
        let parsed = parse_draft("REPLY:\nHello there\n\nCONFIDENCE: 0.85\nCATEGORY: WiFi");
        assert_eq!(parsed.reply, "Hello there");
        assert!((parsed.confidence - 0.85).abs() < f32::EPSILON);
        assert_eq!(parsed.category, ReplyCategory::WiFi);
    }

    #[test]
    fn unlabelled_text_falls_back_to_defaults() {
        let raw = "  Hi Maria, the code is on its way.\nSee you soon!  ";
        let parsed = parse_draft(raw);
        assert_eq!(parsed.reply, raw.trim());
        assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
        assert_eq!(parsed.category, ReplyCategory::General);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let parsed = parse_draft("REPLY:\nSure!\nCONFIDENCE: 1.5\nCATEGORY: CheckIn");
        assert_eq!(parsed.confidence, 1.0);
        assert_eq!(parsed.category, ReplyCategory::CheckIn);
    }

    #[test]
    fn unparsable_confidence_uses_default() {
        let parsed = parse_draft("REPLY:\nSure!\nCONFIDENCE: 0.8.1\nCATEGORY: TV");
        assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);

        let parsed = parse_draft("REPLY:\nSure!\nCONFIDENCE: high");
        assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn negative_confidence_uses_default() {
        let parsed = parse_draft("REPLY:\nSure!\nCONFIDENCE: -0.3\nCATEGORY: Wifi");
        assert_eq!(parsed.reply, "Sure!");
        assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_category_is_general() {
        let parsed = parse_draft("REPLY:\nOk\nCONFIDENCE: 0.9\nCATEGORY: Parking");
        assert_eq!(parsed.category, ReplyCategory::General);
    }

    #[test]
    fn category_label_is_case_insensitive() {
        let parsed = parse_draft("REPLY:\nOk\nCATEGORY: latecheckout");
        assert_eq!(parsed.category, ReplyCategory::LateCheckOut);
    }

    #[test]
    fn multiline_reply_keeps_inner_breaks() {
        let raw = "REPLY:\nHi Tom,\n\nCheck-in is from 3pm.\nLuggage can go in the hall.\n\n\
                   CONFIDENCE: 0.6\nCATEGORY: CheckIn";
        let parsed = parse_draft(raw);
        assert_eq!(
            parsed.reply,
            "Hi Tom,\n\nCheck-in is from 3pm.\nLuggage can go in the hall."
        );
    }

    #[test]
    fn reply_on_same_line_as_label() {
        let parsed = parse_draft("REPLY: Of course, see you then.\nCONFIDENCE: 0.4");
        assert_eq!(parsed.reply, "Of course, see you then.");
        assert!((parsed.confidence - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn labels_without_reply_are_stripped_from_fallback() {
        let parsed =
            parse_draft("The heating dial is by the door.\nCONFIDENCE: 0.3\nCATEGORY: Heating");
        assert_eq!(parsed.reply, "The heating dial is by the door.");
        assert_eq!(parsed.category, ReplyCategory::Heating);
    }

    #[test]
    fn empty_input_does_not_panic() {
        let parsed = parse_draft("");
        assert_eq!(parsed.reply, "");
        assert_eq!(parsed.category, ReplyCategory::General);
    }
}
