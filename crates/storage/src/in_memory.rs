//! In-memory store: useful for testing and ephemeral runs.
//!
//! One lock guards all tables, so every trait method is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innkeep_core::error::StorageError;
use innkeep_core::knowledge::{CategoryStat, KnowledgeEntry, KnowledgeSource};
use innkeep_core::message::{Message, SenderRole};
use innkeep_core::reservation::Reservation;
use innkeep_core::store::{AppliedOutcome, ReplyOutcomeUpdate, Store};
use innkeep_core::template::{DateAnchor, MessageTemplate, ScheduledSendLog};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: i64,
    reservations: Vec<Reservation>,
    messages: Vec<Message>,
    knowledge: Vec<KnowledgeEntry>,
    stats: Vec<CategoryStat>,
    templates: Vec<MessageTemplate>,
    send_log: Vec<ScheduledSendLog>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_knowledge(&mut self, entry: &KnowledgeEntry) -> i64 {
        let id = self.allocate_id();
        let mut entry = entry.clone();
        entry.id = id;
        self.knowledge.push(entry);
        id
    }
}

/// A store that keeps every table in a Vec.
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_time(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    messages
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn reservation(&self, id: i64) -> Result<Option<Reservation>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .reservations
            .iter_mut()
            .find(|r| r.external_id == reservation.external_id)
        {
            let id = existing.id;
            *existing = Reservation {
                id,
                ..reservation.clone()
            };
            return Ok(id);
        }
        let id = tables.allocate_id();
        tables.reservations.push(Reservation {
            id,
            ..reservation.clone()
        });
        Ok(id)
    }

    async fn reservations_by_anchor(
        &self,
        anchor: DateAnchor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StorageError> {
        let tables = self.tables.read().await;
        let date_of = |r: &Reservation| match anchor {
            DateAnchor::CheckIn => r.check_in,
            DateAnchor::CheckOut => r.check_out,
        };
        let mut hits: Vec<Reservation> = tables
            .reservations
            .iter()
            .filter(|r| date_of(r) >= start && date_of(r) < end)
            .cloned()
            .collect();
        hits.sort_by(|a, b| date_of(a).cmp(&date_of(b)).then(a.id.cmp(&b.id)));
        Ok(hits)
    }

    async fn conversation(&self, reservation_id: i64) -> Result<Vec<Message>, StorageError> {
        let tables = self.tables.read().await;
        Ok(sorted_by_time(
            tables
                .messages
                .iter()
                .filter(|m| m.reservation_id == reservation_id && m.is_conversational())
                .cloned()
                .collect(),
        ))
    }

    async fn last_guest_message_before(
        &self,
        reservation_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Option<Message>, StorageError> {
        let tables = self.tables.read().await;
        let earlier = sorted_by_time(
            tables
                .messages
                .iter()
                .filter(|m| {
                    m.reservation_id == reservation_id
                        && m.sender == SenderRole::Guest
                        && m.timestamp < before
                })
                .cloned()
                .collect(),
        );
        Ok(earlier.into_iter().last())
    }

    async fn insert_message(&self, message: &Message) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.reservations.iter().any(|r| r.id == message.reservation_id) {
            return Err(StorageError::Constraint(format!(
                "message references unknown reservation {}",
                message.reservation_id
            )));
        }
        let id = tables.allocate_id();
        let mut message = message.clone();
        message.id = id;
        tables.messages.push(message);
        Ok(id)
    }

    async fn host_message_bodies(&self) -> Result<Vec<(i64, String)>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.sender == SenderRole::Host)
            .map(|m| (m.id, m.body.clone()))
            .collect())
    }

    async fn set_template_flags(&self, template_ids: &[i64]) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        let mut flagged = 0;
        for message in tables.messages.iter_mut().filter(|m| m.sender == SenderRole::Host) {
            message.is_template = template_ids.contains(&message.id);
            if message.is_template {
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn active_knowledge(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.knowledge.iter().filter(|e| e.active).cloned().collect())
    }

    async fn learned_knowledge(&self, category: &str) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .knowledge
            .iter()
            .filter(|e| e.source == KnowledgeSource::Learned && e.category == category)
            .cloned()
            .collect())
    }

    async fn insert_knowledge(&self, entry: &KnowledgeEntry) -> Result<i64, StorageError> {
        Ok(self.tables.write().await.push_knowledge(entry))
    }

    async fn replace_imported_knowledge(
        &self,
        entries: &[KnowledgeEntry],
        replace: bool,
    ) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        if replace {
            tables
                .knowledge
                .retain(|e| e.source != KnowledgeSource::Imported);
        }
        for entry in entries {
            tables.push_knowledge(entry);
        }
        Ok(entries.len())
    }

    async fn deactivate_knowledge(&self, id: i64) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        match tables.knowledge.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.active = false;
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_reply_outcome(
        &self,
        update: ReplyOutcomeUpdate,
    ) -> Result<AppliedOutcome, StorageError> {
        let mut tables = self.tables.write().await;

        let position = match tables.stats.iter().position(|s| s.category == update.category) {
            Some(i) => i,
            None => {
                tables.stats.push(CategoryStat::new(update.category));
                tables.stats.len() - 1
            }
        };
        let stat = &mut tables.stats[position];
        stat.total_drafts += 1;
        if update.unedited {
            stat.sent_unedited += 1;
        }
        stat.updated_at = Utc::now();
        let stat = stat.clone();

        let knowledge_id = update.learned.as_ref().map(|entry| tables.push_knowledge(entry));
        Ok(AppliedOutcome { stat, knowledge_id })
    }

    async fn category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        let tables = self.tables.read().await;
        let mut stats = tables.stats.clone();
        stats.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()));
        Ok(stats)
    }

    async fn insert_template(&self, template: &MessageTemplate) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let mut template = template.clone();
        template.id = id;
        tables.templates.push(template);
        Ok(id)
    }

    async fn enabled_templates(&self) -> Result<Vec<MessageTemplate>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.templates.iter().filter(|t| t.enabled).cloned().collect())
    }

    async fn send_logged(
        &self,
        template_id: i64,
        reservation_id: i64,
    ) -> Result<bool, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .send_log
            .iter()
            .any(|l| l.template_id == template_id && l.reservation_id == reservation_id))
    }

    async fn record_scheduled_send(&self, log: &ScheduledSendLog) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        if tables
            .send_log
            .iter()
            .any(|l| l.template_id == log.template_id && l.reservation_id == log.reservation_id)
        {
            return Ok(false);
        }
        let id = tables.allocate_id();
        let mut log = log.clone();
        log.id = id;
        tables.send_log.push(log);
        Ok(true)
    }
}
