//! Store trait: the storage layer the draft, learning and scheduling
//! components share.
//!
//! Every method is one logical operation: implementations that can fail
//! partway (SQLite) run multi-statement writes in a single transaction so a
//! failure leaves nothing behind.

use crate::category::ReplyCategory;
use crate::error::StorageError;
use crate::knowledge::{CategoryStat, KnowledgeEntry};
use crate::message::Message;
use crate::reservation::Reservation;
use crate::template::{DateAnchor, MessageTemplate, ScheduledSendLog};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

type StoreResult<T> = std::result::Result<T, StorageError>;

/// The bookkeeping produced by one sent AI reply.
#[derive(Debug, Clone)]
pub struct ReplyOutcomeUpdate {
    pub category: ReplyCategory,

    /// Sent without edits: bump `sent_unedited` as well as `total_drafts`
    pub unedited: bool,

    /// A learned knowledge entry to insert alongside the counter update
    pub learned: Option<KnowledgeEntry>,
}

/// What [`Store::apply_reply_outcome`] wrote.
#[derive(Debug, Clone)]
pub struct AppliedOutcome {
    /// The category row after the update
    pub stat: CategoryStat,

    /// Id of the inserted learned entry, if any
    pub knowledge_id: Option<i64>,
}

/// The storage layer.
///
/// Implementations: SQLite (durable), in-memory (tests, ephemeral runs).
#[async_trait]
pub trait Store: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    // --- Reservations ---

    async fn reservation(&self, id: i64) -> StoreResult<Option<Reservation>>;

    /// Insert or update by `external_id`. Returns the local id.
    async fn upsert_reservation(&self, reservation: &Reservation) -> StoreResult<i64>;

    /// Reservations whose `anchor` date falls in `[start, end)`.
    async fn reservations_by_anchor(
        &self,
        anchor: DateAnchor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Reservation>>;

    // --- Messages ---

    /// The real conversation of a reservation: no templates, no unsent
    /// drafts, oldest first.
    async fn conversation(&self, reservation_id: i64) -> StoreResult<Vec<Message>>;

    /// The most recent guest message strictly before `before`.
    async fn last_guest_message_before(
        &self,
        reservation_id: i64,
        before: DateTime<Utc>,
    ) -> StoreResult<Option<Message>>;

    async fn insert_message(&self, message: &Message) -> StoreResult<i64>;

    /// `(id, body)` of every host message, for template detection.
    async fn host_message_bodies(&self) -> StoreResult<Vec<(i64, String)>>;

    /// Mark exactly `template_ids` as templates and every other host
    /// message as a real reply. Returns the number of rows flagged.
    async fn set_template_flags(&self, template_ids: &[i64]) -> StoreResult<usize>;

    // --- Knowledge ---

    /// Active entries, ascending id.
    async fn active_knowledge(&self) -> StoreResult<Vec<KnowledgeEntry>>;

    /// Learned entries in `category` (active or not), ascending id.
    async fn learned_knowledge(&self, category: &str) -> StoreResult<Vec<KnowledgeEntry>>;

    async fn insert_knowledge(&self, entry: &KnowledgeEntry) -> StoreResult<i64>;

    /// Optionally delete every `imported` entry, then insert `entries`.
    /// Returns the number inserted.
    async fn replace_imported_knowledge(
        &self,
        entries: &[KnowledgeEntry],
        replace: bool,
    ) -> StoreResult<usize>;

    /// Soft-delete. Returns false if no such entry exists.
    async fn deactivate_knowledge(&self, id: i64) -> StoreResult<bool>;

    // --- Category stats ---

    /// Create the category row if needed, bump its counters and insert the
    /// learned entry, all or nothing.
    async fn apply_reply_outcome(&self, update: ReplyOutcomeUpdate) -> StoreResult<AppliedOutcome>;

    async fn category_stats(&self) -> StoreResult<Vec<CategoryStat>>;

    // --- Templates ---

    async fn insert_template(&self, template: &MessageTemplate) -> StoreResult<i64>;

    async fn enabled_templates(&self) -> StoreResult<Vec<MessageTemplate>>;

    async fn send_logged(&self, template_id: i64, reservation_id: i64) -> StoreResult<bool>;

    /// Append a send log row. Returns false when the pair was already
    /// logged, in which case nothing is written.
    async fn record_scheduled_send(&self, log: &ScheduledSendLog) -> StoreResult<bool>;
}
