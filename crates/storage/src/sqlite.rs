//! SQLite store.
//!
//! One database file holds the six tables the engine shares:
//! - `reservations` and `messages`: synced booking data
//! - `knowledge_entries`: the knowledge base (soft-deleted via `active`)
//! - `category_stats`: per-category draft accuracy counters
//! - `message_templates` and `scheduled_send_log`: scheduled guest messages
//!
//! Multi-statement writes run inside one transaction; dropping the
//! transaction on an error path rolls it back.

use crate::{from_db_timestamp, to_db_timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innkeep_core::category::ReplyCategory;
use innkeep_core::error::StorageError;
use innkeep_core::knowledge::{CategoryStat, KnowledgeEntry, KnowledgeSource};
use innkeep_core::message::{Message, SenderRole};
use innkeep_core::reservation::{PropertyScope, Reservation};
use innkeep_core::store::{AppliedOutcome, ReplyOutcomeUpdate, Store};
use innkeep_core::template::{DateAnchor, MessageTemplate, ScheduledSendLog, TriggerKind};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "reservations table",
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id   TEXT UNIQUE NOT NULL,
            guest_name    TEXT NOT NULL DEFAULT '',
            check_in      TEXT NOT NULL,
            check_out     TEXT NOT NULL,
            num_guests    INTEGER,
            platform      TEXT,
            status        TEXT NOT NULL DEFAULT 'confirmed',
            listing_name  TEXT,
            property      TEXT
        )
        "#,
    ),
    (
        "check_in index",
        "CREATE INDEX IF NOT EXISTS idx_reservations_check_in ON reservations(check_in)",
    ),
    (
        "check_out index",
        "CREATE INDEX IF NOT EXISTS idx_reservations_check_out ON reservations(check_out)",
    ),
    (
        "messages table",
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            reservation_id     INTEGER NOT NULL REFERENCES reservations(id),
            external_id        TEXT,
            timestamp          TEXT NOT NULL,
            sender             TEXT NOT NULL,
            body               TEXT NOT NULL,
            is_draft           INTEGER NOT NULL DEFAULT 0,
            is_sent            INTEGER NOT NULL DEFAULT 1,
            ai_generated       INTEGER NOT NULL DEFAULT 0,
            ai_confidence      REAL,
            ai_auto_sent       INTEGER NOT NULL DEFAULT 0,
            was_edited         INTEGER NOT NULL DEFAULT 0,
            original_ai_draft  TEXT,
            category           TEXT,
            is_template        INTEGER NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "messages thread index",
        "CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(reservation_id, timestamp)",
    ),
    (
        "knowledge_entries table",
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            category    TEXT NOT NULL,
            question    TEXT,
            answer      TEXT NOT NULL,
            source      TEXT NOT NULL DEFAULT 'manual',
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "category_stats table",
        r#"
        CREATE TABLE IF NOT EXISTS category_stats (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            category            TEXT UNIQUE NOT NULL,
            total_drafts        INTEGER NOT NULL DEFAULT 0,
            sent_unedited       INTEGER NOT NULL DEFAULT 0,
            auto_reply_enabled  INTEGER NOT NULL DEFAULT 0,
            never_auto_reply    INTEGER NOT NULL DEFAULT 0,
            updated_at          TEXT NOT NULL
        )
        "#,
    ),
    (
        "message_templates table",
        r#"
        CREATE TABLE IF NOT EXISTS message_templates (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL,
            trigger_kind  TEXT NOT NULL,
            body          TEXT NOT NULL,
            send_hour     INTEGER NOT NULL DEFAULT 14,
            enabled       INTEGER NOT NULL DEFAULT 0,
            scope         TEXT,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        )
        "#,
    ),
    (
        "scheduled_send_log table",
        r#"
        CREATE TABLE IF NOT EXISTS scheduled_send_log (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id     INTEGER NOT NULL REFERENCES message_templates(id),
            reservation_id  INTEGER NOT NULL REFERENCES reservations(id),
            sent_at         TEXT NOT NULL,
            body            TEXT NOT NULL,
            UNIQUE(template_id, reservation_id)
        )
        "#,
    ),
];

/// A production SQLite store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and bring the schema up to date.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to `:memory:` opens its own database, so an
        // in-memory store must live on exactly one connection.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        for (what, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::MigrationFailed(format!("{what}: {e}")))?;
        }
        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>, StorageError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StorageError::Storage(format!("BEGIN failed: {e}")))
    }

    async fn insert_knowledge_row(
        conn: &mut SqliteConnection,
        entry: &KnowledgeEntry,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO knowledge_entries
                (category, question, answer, source, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.category)
        .bind(&entry.question)
        .bind(&entry.answer)
        .bind(entry.source.as_str())
        .bind(entry.active)
        .bind(to_db_timestamp(&entry.created_at))
        .bind(to_db_timestamp(&entry.updated_at))
        .execute(conn)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("INSERT knowledge failed: {e}")))?;
        Ok(result.last_insert_rowid())
    }

    async fn stat_row(
        conn: &mut SqliteConnection,
        category: ReplyCategory,
    ) -> Result<CategoryStat, StorageError> {
        let row = sqlx::query("SELECT * FROM category_stats WHERE category = ?1")
            .bind(category.as_str())
            .fetch_one(conn)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("category stat read: {e}")))?;
        row_to_stat(&row)
    }
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StorageError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StorageError::QueryFailed(format!("{name} column: {e}")))
}

fn ts_col(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, StorageError> {
    let text: String = col(row, name)?;
    from_db_timestamp(&text)
}

fn row_to_reservation(row: &SqliteRow) -> Result<Reservation, StorageError> {
    let property: Option<String> = col(row, "property")?;
    Ok(Reservation {
        id: col(row, "id")?,
        external_id: col(row, "external_id")?,
        guest_name: col(row, "guest_name")?,
        check_in: ts_col(row, "check_in")?,
        check_out: ts_col(row, "check_out")?,
        num_guests: col(row, "num_guests")?,
        platform: col(row, "platform")?,
        status: col(row, "status")?,
        listing_name: col(row, "listing_name")?,
        property: property.as_deref().and_then(PropertyScope::parse),
    })
}

fn row_to_message(row: &SqliteRow) -> Result<Message, StorageError> {
    let sender: String = col(row, "sender")?;
    let category: Option<String> = col(row, "category")?;
    Ok(Message {
        id: col(row, "id")?,
        reservation_id: col(row, "reservation_id")?,
        external_id: col(row, "external_id")?,
        timestamp: ts_col(row, "timestamp")?,
        sender: SenderRole::from_label(&sender),
        body: col(row, "body")?,
        is_draft: col(row, "is_draft")?,
        is_sent: col(row, "is_sent")?,
        ai_generated: col(row, "ai_generated")?,
        ai_confidence: col(row, "ai_confidence")?,
        ai_auto_sent: col(row, "ai_auto_sent")?,
        was_edited: col(row, "was_edited")?,
        original_ai_draft: col(row, "original_ai_draft")?,
        category: category.as_deref().map(ReplyCategory::from_label_or_general),
        is_template: col(row, "is_template")?,
    })
}

fn row_to_knowledge(row: &SqliteRow) -> Result<KnowledgeEntry, StorageError> {
    let source: String = col(row, "source")?;
    Ok(KnowledgeEntry {
        id: col(row, "id")?,
        category: col(row, "category")?,
        question: col(row, "question")?,
        answer: col(row, "answer")?,
        source: KnowledgeSource::from_label(&source),
        active: col(row, "active")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

fn row_to_stat(row: &SqliteRow) -> Result<CategoryStat, StorageError> {
    let category: String = col(row, "category")?;
    Ok(CategoryStat {
        category: ReplyCategory::from_label_or_general(&category),
        total_drafts: col(row, "total_drafts")?,
        sent_unedited: col(row, "sent_unedited")?,
        auto_reply_enabled: col(row, "auto_reply_enabled")?,
        never_auto_reply: col(row, "never_auto_reply")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

fn row_to_template(row: &SqliteRow) -> Result<MessageTemplate, StorageError> {
    let trigger: String = col(row, "trigger_kind")?;
    let scope: Option<String> = col(row, "scope")?;
    Ok(MessageTemplate {
        id: col(row, "id")?,
        name: col(row, "name")?,
        trigger: TriggerKind::from_label(&trigger),
        body: col(row, "body")?,
        send_hour: col(row, "send_hour")?,
        enabled: col(row, "enabled")?,
        scope: scope.as_deref().and_then(PropertyScope::parse),
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn reservation(&self, id: i64) -> Result<Option<Reservation>, StorageError> {
        let row = sqlx::query("SELECT * FROM reservations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("reservation {id}: {e}")))?;
        row.as_ref().map(row_to_reservation).transpose()
    }

    async fn upsert_reservation(&self, r: &Reservation) -> Result<i64, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations
                (external_id, guest_name, check_in, check_out, num_guests, platform, status,
                 listing_name, property)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(external_id) DO UPDATE SET
                guest_name = excluded.guest_name,
                check_in = excluded.check_in,
                check_out = excluded.check_out,
                num_guests = excluded.num_guests,
                platform = excluded.platform,
                status = excluded.status,
                listing_name = excluded.listing_name,
                property = excluded.property
            RETURNING id
            "#,
        )
        .bind(&r.external_id)
        .bind(&r.guest_name)
        .bind(to_db_timestamp(&r.check_in))
        .bind(to_db_timestamp(&r.check_out))
        .bind(r.num_guests)
        .bind(&r.platform)
        .bind(&r.status)
        .bind(&r.listing_name)
        .bind(r.property.as_ref().map(|p| p.label().to_string()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("UPSERT reservation failed: {e}")))?;

        debug!(reservation_id = id, external_id = %r.external_id, "Upserted reservation");
        Ok(id)
    }

    async fn reservations_by_anchor(
        &self,
        anchor: DateAnchor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StorageError> {
        let column = anchor.as_str();
        let sql = format!(
            "SELECT * FROM reservations WHERE {column} >= ?1 AND {column} < ?2 \
             ORDER BY {column}, id"
        );
        let rows = sqlx::query(&sql)
            .bind(to_db_timestamp(&start))
            .bind(to_db_timestamp(&end))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("reservations by {column}: {e}")))?;
        rows.iter().map(row_to_reservation).collect()
    }

    async fn conversation(&self, reservation_id: i64) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE reservation_id = ?1 AND is_template = 0 AND is_draft = 0
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("conversation {reservation_id}: {e}")))?;
        rows.iter().map(row_to_message).collect()
    }

    async fn last_guest_message_before(
        &self,
        reservation_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Option<Message>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE reservation_id = ?1 AND sender = 'guest' AND timestamp < ?2
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .bind(to_db_timestamp(&before))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("last guest message: {e}")))?;
        row.as_ref().map(row_to_message).transpose()
    }

    async fn insert_message(&self, m: &Message) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages
                (reservation_id, external_id, timestamp, sender, body, is_draft, is_sent,
                 ai_generated, ai_confidence, ai_auto_sent, was_edited, original_ai_draft,
                 category, is_template)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(m.reservation_id)
        .bind(&m.external_id)
        .bind(to_db_timestamp(&m.timestamp))
        .bind(m.sender.as_str())
        .bind(&m.body)
        .bind(m.is_draft)
        .bind(m.is_sent)
        .bind(m.ai_generated)
        .bind(m.ai_confidence)
        .bind(m.ai_auto_sent)
        .bind(m.was_edited)
        .bind(&m.original_ai_draft)
        .bind(m.category.map(|c| c.as_str()))
        .bind(m.is_template)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("INSERT message failed: {e}")))?;
        Ok(result.last_insert_rowid())
    }

    async fn host_message_bodies(&self) -> Result<Vec<(i64, String)>, StorageError> {
        let rows = sqlx::query("SELECT id, body FROM messages WHERE sender = 'host' ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("host messages: {e}")))?;
        rows.iter()
            .map(|row| -> Result<(i64, String), StorageError> {
                Ok((col(row, "id")?, col(row, "body")?))
            })
            .collect()
    }

    async fn set_template_flags(&self, template_ids: &[i64]) -> Result<usize, StorageError> {
        let mut tx = self.begin().await?;

        sqlx::query("UPDATE messages SET is_template = 0 WHERE sender = 'host'")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("clear template flags: {e}")))?;

        let mut flagged = 0usize;
        for id in template_ids {
            let result =
                sqlx::query("UPDATE messages SET is_template = 1 WHERE id = ?1 AND sender = 'host'")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StorageError::QueryFailed(format!("flag message {id}: {e}")))?;
            flagged += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(flagged)
    }

    async fn active_knowledge(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let rows = sqlx::query("SELECT * FROM knowledge_entries WHERE active = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("active knowledge: {e}")))?;
        rows.iter().map(row_to_knowledge).collect()
    }

    async fn learned_knowledge(&self, category: &str) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM knowledge_entries \
             WHERE source = 'learned' AND category = ?1 ORDER BY id",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("learned knowledge: {e}")))?;
        rows.iter().map(row_to_knowledge).collect()
    }

    async fn insert_knowledge(&self, entry: &KnowledgeEntry) -> Result<i64, StorageError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Storage(format!("acquire connection: {e}")))?;
        Self::insert_knowledge_row(&mut conn, entry).await
    }

    async fn replace_imported_knowledge(
        &self,
        entries: &[KnowledgeEntry],
        replace: bool,
    ) -> Result<usize, StorageError> {
        let mut tx = self.begin().await?;

        if replace {
            let removed = sqlx::query("DELETE FROM knowledge_entries WHERE source = 'imported'")
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::QueryFailed(format!("DELETE imported failed: {e}")))?;
            debug!(removed = removed.rows_affected(), "Cleared imported knowledge");
        }

        for entry in entries {
            Self::insert_knowledge_row(&mut *tx, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(entries.len())
    }

    async fn deactivate_knowledge(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE knowledge_entries SET active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(to_db_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("deactivate knowledge {id}: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_reply_outcome(
        &self,
        update: ReplyOutcomeUpdate,
    ) -> Result<AppliedOutcome, StorageError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO category_stats (category, total_drafts, sent_unedited, updated_at)
            VALUES (?1, 1, ?2, ?3)
            ON CONFLICT(category) DO UPDATE SET
                total_drafts = total_drafts + 1,
                sent_unedited = sent_unedited + excluded.sent_unedited,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(update.category.as_str())
        .bind(i64::from(update.unedited))
        .bind(to_db_timestamp(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("category stat update: {e}")))?;

        let knowledge_id = match &update.learned {
            Some(entry) => Some(Self::insert_knowledge_row(&mut *tx, entry).await?),
            None => None,
        };

        let stat = Self::stat_row(&mut *tx, update.category).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(AppliedOutcome { stat, knowledge_id })
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        let rows = sqlx::query("SELECT * FROM category_stats ORDER BY category")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("category stats: {e}")))?;
        rows.iter().map(row_to_stat).collect()
    }

    async fn insert_template(&self, t: &MessageTemplate) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_templates
                (name, trigger_kind, body, send_hour, enabled, scope, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&t.name)
        .bind(t.trigger.as_str())
        .bind(&t.body)
        .bind(t.send_hour)
        .bind(t.enabled)
        .bind(t.scope.as_ref().map(|s| s.label().to_string()))
        .bind(to_db_timestamp(&t.created_at))
        .bind(to_db_timestamp(&t.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("INSERT template failed: {e}")))?;
        Ok(result.last_insert_rowid())
    }

    async fn enabled_templates(&self) -> Result<Vec<MessageTemplate>, StorageError> {
        let rows = sqlx::query("SELECT * FROM message_templates WHERE enabled = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("enabled templates: {e}")))?;
        rows.iter().map(row_to_template).collect()
    }

    async fn send_logged(
        &self,
        template_id: i64,
        reservation_id: i64,
    ) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scheduled_send_log \
             WHERE template_id = ?1 AND reservation_id = ?2",
        )
        .bind(template_id)
        .bind(reservation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("send log lookup: {e}")))?;
        Ok(count > 0)
    }

    async fn record_scheduled_send(&self, log: &ScheduledSendLog) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scheduled_send_log (template_id, reservation_id, sent_at, body)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(template_id, reservation_id) DO NOTHING
            "#,
        )
        .bind(log.template_id)
        .bind(log.reservation_id)
        .bind(to_db_timestamp(&log.sent_at))
        .bind(&log.body)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("INSERT send log failed: {e}")))?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, h, 0, 0).unwrap()
    }

    async fn seeded(store: &SqliteStore) -> i64 {
        let mut r = Reservation::new("HT-100", "Grace Hopper", day(10, 15), day(13, 10));
        r.num_guests = Some(2);
        r.property = Some(PropertyScope::House("193".into()));
        store.upsert_reservation(&r).await.unwrap()
    }

    #[tokio::test]
    async fn store_name() {
        assert_eq!(test_store().await.name(), "sqlite");
    }

    #[tokio::test]
    async fn reservation_upsert_is_keyed_by_external_id() {
        let store = test_store().await;
        let id = seeded(&store).await;

        let mut updated = Reservation::new("HT-100", "Grace B. Hopper", day(11, 15), day(13, 10));
        updated.status = "modified".into();
        let again = store.upsert_reservation(&updated).await.unwrap();
        assert_eq!(id, again);

        let fetched = store.reservation(id).await.unwrap().unwrap();
        assert_eq!(fetched.guest_name, "Grace B. Hopper");
        assert_eq!(fetched.check_in, day(11, 15));
        assert_eq!(fetched.status, "modified");
        assert!(fetched.property.is_none());
    }

    #[tokio::test]
    async fn missing_reservation_is_none() {
        assert!(test_store().await.reservation(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn anchor_query_is_half_open() {
        let store = test_store().await;
        seeded(&store).await;
        let start = day(10, 0);

        let hits = store
            .reservations_by_anchor(DateAnchor::CheckIn, start, start + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].property, Some(PropertyScope::House("193".into())));

        let misses = store
            .reservations_by_anchor(DateAnchor::CheckIn, day(11, 0), day(12, 0))
            .await
            .unwrap();
        assert!(misses.is_empty());

        let checkouts = store
            .reservations_by_anchor(DateAnchor::CheckOut, day(13, 0), day(14, 0))
            .await
            .unwrap();
        assert_eq!(checkouts.len(), 1);
    }

    #[tokio::test]
    async fn conversation_excludes_templates_and_drafts() {
        let store = test_store().await;
        let rid = seeded(&store).await;

        store
            .insert_message(&Message::guest(rid, "Hi, what's the WiFi?").at(day(9, 10)))
            .await
            .unwrap();
        let mut template = Message::host(rid, "Welcome to London!").at(day(9, 9));
        template.is_template = true;
        store.insert_message(&template).await.unwrap();
        let mut draft = Message::host(rid, "The WiFi is VBR193").at(day(9, 11));
        draft.is_draft = true;
        store.insert_message(&draft).await.unwrap();
        store
            .insert_message(&Message::host(rid, "It's on the router.").at(day(9, 12)))
            .await
            .unwrap();

        let convo = store.conversation(rid).await.unwrap();
        let bodies: Vec<&str> = convo.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["Hi, what's the WiFi?", "It's on the router."]);
    }

    #[tokio::test]
    async fn message_ai_fields_roundtrip() {
        let store = test_store().await;
        let rid = seeded(&store).await;

        let mut msg = Message::host(rid, "Checkout is at 10am.");
        msg.ai_generated = true;
        msg.ai_confidence = Some(0.9);
        msg.was_edited = true;
        msg.original_ai_draft = Some("Checkout is at 11am.".into());
        msg.category = Some(ReplyCategory::CheckOut);
        store.insert_message(&msg).await.unwrap();

        let stored = &store.conversation(rid).await.unwrap()[0];
        assert!(stored.ai_generated);
        assert!(stored.was_edited);
        assert_eq!(stored.category, Some(ReplyCategory::CheckOut));
        assert_eq!(stored.original_ai_draft.as_deref(), Some("Checkout is at 11am."));
        assert!((stored.ai_confidence.unwrap() - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn last_guest_message_is_strictly_before() {
        let store = test_store().await;
        let rid = seeded(&store).await;
        store.insert_message(&Message::guest(rid, "first").at(day(9, 8))).await.unwrap();
        store.insert_message(&Message::guest(rid, "second").at(day(9, 9))).await.unwrap();
        store.insert_message(&Message::guest(rid, "later").at(day(9, 12))).await.unwrap();

        let found = store.last_guest_message_before(rid, day(9, 10)).await.unwrap().unwrap();
        assert_eq!(found.body, "second");
        assert!(store.last_guest_message_before(rid, day(9, 8)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn template_flags_replace_previous_tagging() {
        let store = test_store().await;
        let rid = seeded(&store).await;
        let a = store.insert_message(&Message::host(rid, "a")).await.unwrap();
        let b = store.insert_message(&Message::host(rid, "b")).await.unwrap();
        let g = store.insert_message(&Message::guest(rid, "g")).await.unwrap();

        assert_eq!(store.set_template_flags(&[a, g]).await.unwrap(), 1);
        assert_eq!(store.set_template_flags(&[b]).await.unwrap(), 1);

        let convo = store.conversation(rid).await.unwrap();
        let bodies: Vec<&str> = convo.iter().map(|m| m.body.as_str()).collect();
        assert!(bodies.contains(&"a"));
        assert!(!bodies.contains(&"b"));
        assert_eq!(store.host_message_bodies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn knowledge_soft_delete() {
        let store = test_store().await;
        let id = store
            .insert_knowledge(&KnowledgeEntry::new("WiFi", None, "VBR193", KnowledgeSource::Manual))
            .await
            .unwrap();
        assert_eq!(store.active_knowledge().await.unwrap().len(), 1);

        assert!(store.deactivate_knowledge(id).await.unwrap());
        assert!(store.active_knowledge().await.unwrap().is_empty());
        assert!(!store.deactivate_knowledge(9999).await.unwrap());
    }

    #[tokio::test]
    async fn reimport_replaces_only_imported_entries() {
        let store = test_store().await;
        store
            .insert_knowledge(&KnowledgeEntry::new(
                "WiFi",
                None,
                "manual note",
                KnowledgeSource::Manual,
            ))
            .await
            .unwrap();
        let first = vec![
            KnowledgeEntry::new("WiFi", None, "old a", KnowledgeSource::Imported),
            KnowledgeEntry::new("TV", None, "old b", KnowledgeSource::Imported),
        ];
        store.replace_imported_knowledge(&first, true).await.unwrap();
        let second = vec![KnowledgeEntry::new("WiFi", None, "new", KnowledgeSource::Imported)];
        assert_eq!(store.replace_imported_knowledge(&second, true).await.unwrap(), 1);

        let answers: Vec<String> = store
            .active_knowledge()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.answer)
            .collect();
        assert_eq!(answers, vec!["manual note", "new"]);
    }

    #[tokio::test]
    async fn reply_outcome_counters_accumulate() {
        let store = test_store().await;
        let unedited = ReplyOutcomeUpdate {
            category: ReplyCategory::WiFi,
            unedited: true,
            learned: None,
        };
        let first = store.apply_reply_outcome(unedited.clone()).await.unwrap();
        assert_eq!((first.stat.total_drafts, first.stat.sent_unedited), (1, 1));
        assert!(first.knowledge_id.is_none());

        let learned = KnowledgeEntry::new(
            "WiFi",
            Some("Guest asked: wifi?".into()),
            "Preferred reply style: It's VBR193.",
            KnowledgeSource::Learned,
        );
        let second = store
            .apply_reply_outcome(ReplyOutcomeUpdate {
                category: ReplyCategory::WiFi,
                unedited: false,
                learned: Some(learned),
            })
            .await
            .unwrap();
        assert_eq!((second.stat.total_drafts, second.stat.sent_unedited), (2, 1));
        assert!(second.knowledge_id.is_some());

        assert_eq!(store.learned_knowledge("WiFi").await.unwrap().len(), 1);
        let stats = store.category_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert!((stats[0].accuracy() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn templates_and_send_log() {
        let store = test_store().await;
        let rid = seeded(&store).await;

        let enabled =
            MessageTemplate::new("Arrival", TriggerKind::DayBeforeCheckIn, "Hi {guest_name}")
                .with_scope(PropertyScope::All);
        let tid = store.insert_template(&enabled).await.unwrap();
        let mut disabled = MessageTemplate::new("Off", TriggerKind::CheckOutDay, "Bye");
        disabled.enabled = false;
        store.insert_template(&disabled).await.unwrap();

        let templates = store.enabled_templates().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].scope, Some(PropertyScope::All));
        assert_eq!(templates[0].trigger, TriggerKind::DayBeforeCheckIn);

        assert!(!store.send_logged(tid, rid).await.unwrap());
        let log = ScheduledSendLog {
            id: 0,
            template_id: tid,
            reservation_id: rid,
            sent_at: Utc::now(),
            body: "Hi Grace".into(),
        };
        assert!(store.record_scheduled_send(&log).await.unwrap());
        assert!(!store.record_scheduled_send(&log).await.unwrap());
        assert!(store.send_logged(tid, rid).await.unwrap());
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("innkeep.db").display());
        {
            let store = SqliteStore::new(&url).await.unwrap();
            seeded(&store).await;
        }
        let store = SqliteStore::new(&url).await.unwrap();
        let hits = store
            .reservations_by_anchor(DateAnchor::CheckIn, day(10, 0), day(11, 0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }
}
