//! Knowledge import from the guest-guide JSON document.
//!
//! The guide carries two maps of key → HTML (`content_html`, `static_html`).
//! Known keys become `imported` knowledge entries; house-specific keys are
//! tagged `[193 only]` / `[195 only]`, which the knowledge selector reads.

use innkeep_core::error::{Error, Result};
use innkeep_core::knowledge::{KnowledgeEntry, KnowledgeSource};
use innkeep_core::store::Store;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// Sections of the guide document that hold importable HTML.
pub const SECTIONS: [&str; 2] = ["content_html", "static_html"];

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("static regex"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li(\s[^>]*)?>").expect("static regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Category for a guide key; `None` for keys that are not imported.
pub fn category_for(key: &str) -> Option<&'static str> {
    let category = match key {
        "house193" | "house195" => "Address",
        "wifi193" | "wifi195" => "WiFi",
        "room1" | "room2" | "room3" | "room4" | "room5" | "room6" | "rooma" | "roomb"
        | "wholeHomeBedroomsDetailed" | "wholeHomeBedroomsCombined" | "storageUnderBed"
        | "storageInBed" => "Bedroom",
        "wholeHomeBathrooms" | "wholeHomeBathroomsCombined" | "bathroomA" | "bathroomB"
        | "bathroomC" | "bathroomShared" | "bathroomPrivate" => "Bathroom",
        "kitchenShared" | "kitchenPrivate" | "kitchenBase" => "Kitchen",
        "windowsStandard" | "windowsTiltTurn" => "Windows",
        "noLaundry" | "hasLaundry" | "ironing" => "Laundry",
        "wholeHomeLuggage" | "checkinStaticDetailed" => "CheckIn",
        "checkoutStatic" | "checkoutWholeHome" | "checkoutStaticDetailed" => "CheckOut",
        "heatingBase" | "heatingSmartAddon" => "Heating",
        "lightsNote" => "Lighting",
        "wholeHomeRubbish" => "Rubbish",
        "what_not_to_bring" => "Amenities",
        "domestic_directions" | "airport_directions" | "getting_around" => "Transport",
        "codetimes" => "LockInfo",
        "troubleshooting" => "Troubleshooting",
        "contact" => "Contact",
        "tv" => "TV",
        "local_guidebook" => "LocalArea",
        _ => return None,
    };
    Some(category)
}

/// The guest question a guide key answers, when there is a natural one.
pub fn question_for(key: &str) -> Option<&'static str> {
    let question = match key {
        "wifi193" => "What is the WiFi for 193?",
        "wifi195" => "What is the WiFi for 195?",
        "house193" => "What is the address of 193?",
        "house195" => "What is the address of 195?",
        "checkinStaticDetailed" => "How do I check in?",
        "checkoutStatic" => "What time is check-out?",
        "checkoutStaticDetailed" => "What are the check-out procedures?",
        "checkoutWholeHome" => "What is check-out like for whole-home bookings?",
        "wholeHomeLuggage" => "Where can I store my luggage?",
        "kitchenShared" => "How do I use the shared kitchen?",
        "kitchenPrivate" => "How does the private kitchen work?",
        "kitchenBase" => "What appliances are in the kitchen?",
        "noLaundry" => "Is there a washing machine?",
        "hasLaundry" => "How do I use the washing machine?",
        "heatingBase" => "How do I control the heating?",
        "heatingSmartAddon" => "How do I adjust the thermostat?",
        "codetimes" => "How do the door codes work?",
        "what_not_to_bring" => "What do I need to bring?",
        "domestic_directions" => "How do I get to the house?",
        "airport_directions" => "How do I get from the airport?",
        "getting_around" => "How do I get around London?",
        "tv" => "How does the TV work?",
        "contact" => "How do I contact the host?",
        "local_guidebook" => "What restaurants and sights are nearby?",
        "ironing" => "Is there an iron?",
        "troubleshooting" => "What if the door lock runs out of battery?",
        "bathroomA" => "Where is Bathroom A?",
        "bathroomB" => "Where is Bathroom B?",
        "bathroomC" => "Where is Bathroom C?",
        "bathroomShared" => "How do the shared bathrooms work?",
        "bathroomPrivate" => "Do I have a private bathroom?",
        "lightsNote" => "How do the lights work?",
        "windowsStandard" => "How do the windows work?",
        "windowsTiltTurn" => "How do the tilt-and-turn windows work?",
        _ => return None,
    };
    Some(question)
}

/// House marker appended to an answer, from the key name.
pub fn house_tag(key: &str) -> &'static str {
    match (key.contains("193"), key.contains("195")) {
        (true, false) => " [193 only]",
        (false, true) => " [195 only]",
        _ if key.contains("Combined") || key.to_lowercase().contains("wholehome") => {
            " [whole house booking]"
        }
        _ => "",
    }
}

/// Plain text from guide HTML: line breaks kept, list items as `- `,
/// tags removed, common entities decoded, blank-line runs collapsed.
pub fn strip_html(html: &str) -> String {
    let text = LINE_BREAK.replace_all(html, "\n");
    let text = LIST_ITEM.replace_all(&text, "- ");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

/// Knowledge entries for every mapped, non-empty key of the guide.
/// Sections in [`SECTIONS`] order; within a section keys are visited in
/// sorted order (`serde_json::Map` does not keep document order).
pub fn parse_guide(guide: &serde_json::Value) -> Vec<KnowledgeEntry> {
    let mut entries = Vec::new();
    for section in SECTIONS {
        let Some(map) = guide.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (key, value) in map {
            let Some(html) = value.as_str().filter(|h| !h.trim().is_empty()) else {
                continue;
            };
            let Some(category) = category_for(key) else {
                debug!(section, key = %key, "Skipping unmapped guide key");
                continue;
            };
            let text = strip_html(html);
            if text.is_empty() {
                continue;
            }
            entries.push(KnowledgeEntry::new(
                category,
                question_for(key).map(String::from),
                format!("{text}{}", house_tag(key)),
                KnowledgeSource::Imported,
            ));
        }
    }
    entries
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub replaced: bool,
}

pub struct KnowledgeImporter {
    store: Arc<dyn Store>,
}

impl KnowledgeImporter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Import a guide document. With `replace`, previously imported entries
    /// are removed in the same transaction; manual and learned entries are
    /// never touched.
    pub async fn import(&self, guide: &serde_json::Value, replace: bool) -> Result<ImportReport> {
        if !guide.is_object() {
            return Err(Error::InvalidInput("guide document must be a JSON object".into()));
        }
        let entries = parse_guide(guide);
        let imported = self.store.replace_imported_knowledge(&entries, replace).await?;
        info!(imported, replace, "Imported knowledge entries from guide");
        Ok(ImportReport {
            imported,
            replaced: replace,
        })
    }

    pub async fn import_str(&self, json: &str, replace: bool) -> Result<ImportReport> {
        let guide: serde_json::Value = serde_json::from_str(json)?;
        self.import(&guide, replace).await
    }
}
