//! Knowledge selection by property.
//!
//! The knowledge base is small (tens of entries), so there is no ranking
//! and no retrieval tier: every active entry goes into the prompt unless it
//! is marked exclusive to a different house than the booking's.

use innkeep_core::knowledge::KnowledgeEntry;
use innkeep_core::reservation::PropertyScope;

/// Keep the entries applicable to a booking scoped to `property`.
///
/// An entry carrying an `[<house> only]` marker for another house is
/// dropped; untagged entries, entries for the booking's own house, and
/// everything for whole-property or unscoped bookings are kept. Input order
/// is preserved.
pub fn select_knowledge<'a>(
    entries: &'a [KnowledgeEntry],
    property: Option<&PropertyScope>,
) -> Vec<&'a KnowledgeEntry> {
    let booking_house = property.and_then(PropertyScope::house);
    entries
        .iter()
        .filter(|entry| match (booking_house, entry.exclusive_house()) {
            (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(&theirs),
            _ => true,
        })
        .collect()
}
