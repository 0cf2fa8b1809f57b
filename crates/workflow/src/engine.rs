//! The template trigger engine.
//!
//! One scan walks every enabled template, finds the reservations whose
//! anchor date puts them on today's trigger day, and sends each
//! (template, reservation) pair at most once. The send log is the only
//! state: a pair with a log row is done, a pair without one is retried on
//! the next scan until the trigger day ends.

use crate::placeholders::render_template;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use innkeep_core::channel::MessageSender;
use innkeep_core::error::{Error, Result};
use innkeep_core::reservation::Reservation;
use innkeep_core::store::Store;
use innkeep_core::template::{MessageTemplate, ScheduledSendLog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Enabled templates evaluated.
    pub templates: usize,
    /// Templates skipped for an unrecognized trigger.
    pub unknown_triggers: usize,
    /// (template, reservation) pairs on their trigger day.
    pub candidates: usize,
    pub sent: usize,
    pub skipped_scope: usize,
    pub skipped_hour: usize,
    pub already_sent: usize,
    /// Pairs left pending after a send or storage failure.
    pub failed: usize,
}

enum PairOutcome {
    Sent,
    OutOfScope,
    BeforeSendHour,
    AlreadySent,
}

pub struct TemplateEngine {
    store: Arc<dyn Store>,
    sender: Arc<dyn MessageSender>,
    utc_offset: FixedOffset,
}

impl TemplateEngine {
    pub fn new(store: Arc<dyn Store>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            store,
            sender,
            utc_offset: Utc.fix(),
        }
    }

    /// Compute "today" and the send-hour gate at a fixed UTC offset.
    pub fn with_utc_offset_hours(mut self, hours: i32) -> Result<Self> {
        self.utc_offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| Error::InvalidInput(format!("UTC offset {hours}h is out of range")))?;
        Ok(self)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Run one full scan as of `now`.
    ///
    /// Only loading the template list can fail the scan. A failed lookup or
    /// send is logged and counted in `failed`, and its pair stays pending.
    pub async fn run_scan(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        let local = now.with_timezone(&self.utc_offset);
        let today = local.date_naive();
        let hour = local.hour();

        let templates = self.store.enabled_templates().await?;
        let mut report = ScanReport {
            templates: templates.len(),
            ..ScanReport::default()
        };

        for template in &templates {
            let Some((anchor, offset)) = template.trigger.anchor() else {
                warn!(
                    template = %template.name,
                    trigger = %template.trigger,
                    "Unknown trigger, skipping template"
                );
                report.unknown_triggers += 1;
                continue;
            };

            // Fires on anchor + offset == today, so the anchor is today - offset.
            let anchor_day = today - Duration::days(offset);
            let (start, end) = self.day_bounds(anchor_day);

            let reservations = match self.store.reservations_by_anchor(anchor, start, end).await {
                Ok(reservations) => reservations,
                Err(e) => {
                    error!(
                        template = %template.name,
                        error = %e,
                        "Failed to load reservations for template"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            debug!(
                template = %template.name,
                anchor = anchor.as_str(),
                day = %anchor_day,
                candidates = reservations.len(),
                "Template candidates"
            );

            for reservation in &reservations {
                report.candidates += 1;
                match self.process_pair(template, reservation, hour, now).await {
                    Ok(PairOutcome::Sent) => report.sent += 1,
                    Ok(PairOutcome::OutOfScope) => report.skipped_scope += 1,
                    Ok(PairOutcome::BeforeSendHour) => report.skipped_hour += 1,
                    Ok(PairOutcome::AlreadySent) => report.already_sent += 1,
                    Err(e) => {
                        error!(
                            template = %template.name,
                            reservation = %reservation.external_id,
                            error = %e,
                            "Scheduled message failed; will retry next scan"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        if report.sent > 0 || report.failed > 0 {
            info!(sent = report.sent, failed = report.failed, "Template scan complete");
        } else {
            debug!(?report, "Template scan complete");
        }
        Ok(report)
    }

    async fn process_pair(
        &self,
        template: &MessageTemplate,
        reservation: &Reservation,
        hour: u32,
        now: DateTime<Utc>,
    ) -> Result<PairOutcome> {
        if !template.applies_to(reservation.property.as_ref()) {
            return Ok(PairOutcome::OutOfScope);
        }
        if hour < template.send_hour {
            return Ok(PairOutcome::BeforeSendHour);
        }
        if self.store.send_logged(template.id, reservation.id).await? {
            return Ok(PairOutcome::AlreadySent);
        }

        let body = render_template(&template.body, reservation, &self.utc_offset);
        self.sender
            .send_message(&reservation.external_id, &body)
            .await?;

        // The message is out: a log failure from here on must not turn into a resend.
        let log = ScheduledSendLog {
            id: 0,
            template_id: template.id,
            reservation_id: reservation.id,
            sent_at: now,
            body,
        };
        match self.store.record_scheduled_send(&log).await {
            Ok(true) => {}
            Ok(false) => warn!(
                template = %template.name,
                reservation = %reservation.external_id,
                "Send log row already existed"
            ),
            Err(e) => error!(
                template = %template.name,
                reservation = %reservation.external_id,
                error = %e,
                "Scheduled message sent but not logged"
            ),
        }

        info!(
            template = %template.name,
            reservation = %reservation.external_id,
            channel = self.sender.name(),
            "Scheduled message sent"
        );
        Ok(PairOutcome::Sent)
    }

    /// `[midnight, next midnight)` of `day` at the engine's offset, in UTC.
    fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let shift = Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        let start = Utc.from_utc_datetime(&(day.and_time(NaiveTime::MIN) - shift));
        (start, start + Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use innkeep_core::error::ChannelError;
    use innkeep_core::reservation::PropertyScope;
    use innkeep_core::template::TriggerKind;
    use innkeep_storage::InMemoryStore;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records deliveries; fails for the listed reservation external ids.
    #[derive(Default)]
    struct ScriptedSender {
        fail_for: HashSet<String>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSender {
        fn failing_for(ids: &[&str]) -> Self {
            Self {
                fail_for: ids.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSender for ScriptedSender {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send_message(
            &self,
            reservation_external_id: &str,
            body: &str,
        ) -> std::result::Result<(), ChannelError> {
            if self.fail_for.contains(reservation_external_id) {
                return Err(ChannelError::DeliveryFailed {
                    channel: "scripted".into(),
                    reason: "HTTP 503".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((reservation_external_id.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    async fn add_reservation(
        store: &InMemoryStore,
        external_id: &str,
        name: &str,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        property: Option<PropertyScope>,
    ) -> i64 {
        let mut r = Reservation::new(external_id, name, check_in, check_out);
        r.property = property;
        store.upsert_reservation(&r).await.unwrap()
    }

    async fn add_template(store: &InMemoryStore, template: MessageTemplate) -> i64 {
        store.insert_template(&template).await.unwrap()
    }

    fn day_before_checkin() -> MessageTemplate {
        MessageTemplate::new(
            "Pre-arrival",
            TriggerKind::DayBeforeCheckIn,
            "Hi {guest_name}, see you on {check_in}!",
        )
        .with_send_hour(14)
    }

    #[tokio::test]
    async fn day_before_checkin_fires_once_on_d_minus_1() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-1", "Maria Lopez", at(15, 15, 0), at(17, 10, 0), None).await;
        add_template(&store, day_before_checkin()).await;

        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store.clone(), sender.clone());

        // D-2 and D: nothing matches.
        assert_eq!(engine.run_scan(at(13, 16, 0)).await.unwrap().candidates, 0);
        assert_eq!(engine.run_scan(at(15, 16, 0)).await.unwrap().candidates, 0);

        // D-1: sent exactly once across repeated scans.
        let first = engine.run_scan(at(14, 15, 0)).await.unwrap();
        assert_eq!(first.sent, 1);
        let second = engine.run_scan(at(14, 15, 1)).await.unwrap();
        assert_eq!(second.sent, 0);
        assert_eq!(second.already_sent, 1);

        assert_eq!(
            sender.sent(),
            vec![("HT-1".to_string(), "Hi Maria, see you on 15 Mar!".to_string())]
        );
    }

    #[tokio::test]
    async fn hour_gate_defers_until_send_hour() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-1", "Maria", at(15, 15, 0), at(17, 10, 0), None).await;
        add_template(&store, day_before_checkin()).await;
        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store.clone(), sender.clone());

        let early = engine.run_scan(at(14, 13, 59)).await.unwrap();
        assert_eq!(early.skipped_hour, 1);
        assert!(sender.sent().is_empty());

        let on_time = engine.run_scan(at(14, 14, 0)).await.unwrap();
        assert_eq!(on_time.sent, 1);
    }

    #[tokio::test]
    async fn any_arrival_time_within_the_day_counts() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-early", "A", at(15, 0, 0), at(16, 10, 0), None).await;
        add_reservation(&store, "HT-late", "B", at(15, 23, 59), at(16, 10, 0), None).await;
        add_reservation(&store, "HT-next", "C", at(16, 0, 0), at(17, 10, 0), None).await;
        add_template(&store, day_before_checkin()).await;
        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store, sender.clone());

        let report = engine.run_scan(at(14, 18, 0)).await.unwrap();
        assert_eq!(report.sent, 2);
        let ids: Vec<String> = sender.sent().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["HT-early", "HT-late"]);
    }

    #[tokio::test]
    async fn send_failure_does_not_block_others_and_is_retried() {
        let store = Arc::new(InMemoryStore::new());
        let (arrival, departure) = (at(15, 12, 0), at(18, 10, 0));
        let failing = add_reservation(&store, "HT-down", "Ana", arrival, departure, None).await;
        let arrival = at(15, 16, 0);
        let healthy = add_reservation(&store, "HT-up", "Ben", arrival, departure, None).await;
        let template_id = add_template(&store, day_before_checkin()).await;

        let sender = Arc::new(ScriptedSender::failing_for(&["HT-down"]));
        let engine = TemplateEngine::new(store.clone(), sender.clone());

        let report = engine.run_scan(at(14, 15, 0)).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(sender.sent()[0].0, "HT-up");
        assert!(store.send_logged(template_id, healthy).await.unwrap());
        assert!(!store.send_logged(template_id, failing).await.unwrap());

        // Collaborator recovers later the same day: the failed pair is retried.
        let recovered = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store.clone(), recovered.clone());
        let report = engine.run_scan(at(14, 15, 1)).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.already_sent, 1);
        assert_eq!(recovered.sent()[0].0, "HT-down");
    }

    #[tokio::test]
    async fn property_scope_filter() {
        let store = Arc::new(InMemoryStore::new());
        let house = |code: &str| Some(PropertyScope::House(code.into()));
        add_reservation(&store, "HT-193", "A", at(15, 15, 0), at(16, 10, 0), house("193")).await;
        add_reservation(&store, "HT-195", "B", at(15, 15, 0), at(16, 10, 0), house("195")).await;
        let all = Some(PropertyScope::All);
        add_reservation(&store, "HT-both", "C", at(15, 15, 0), at(16, 10, 0), all).await;
        add_reservation(&store, "HT-none", "D", at(15, 15, 0), at(16, 10, 0), None).await;
        add_template(
            &store,
            day_before_checkin().with_scope(PropertyScope::House("193".into())),
        )
        .await;

        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store, sender.clone());
        let report = engine.run_scan(at(14, 15, 0)).await.unwrap();

        assert_eq!(report.skipped_scope, 1);
        assert_eq!(report.sent, 3);
        assert!(!sender.sent().iter().any(|(id, _)| id == "HT-195"));
    }

    #[tokio::test]
    async fn checkout_triggers_use_checkout_date() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-1", "Tom", at(10, 15, 0), at(14, 10, 0), None).await;
        add_template(
            &store,
            MessageTemplate::new(
                "Checkout reminder",
                TriggerKind::DayBeforeCheckOut,
                "Check-out {check_out}",
            )
            .with_send_hour(9),
        )
        .await;
        add_template(
            &store,
            MessageTemplate::new("Goodbye", TriggerKind::CheckOutDay, "Safe travels {guest_name}")
                .with_send_hour(9),
        )
        .await;
        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store, sender.clone());

        assert_eq!(engine.run_scan(at(13, 9, 0)).await.unwrap().sent, 1);
        assert_eq!(engine.run_scan(at(14, 9, 0)).await.unwrap().sent, 1);
        let bodies: Vec<String> = sender.sent().into_iter().map(|(_, b)| b).collect();
        assert_eq!(bodies, vec!["Check-out 14 Mar", "Safe travels Tom"]);
    }

    #[tokio::test]
    async fn day_after_checkin() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-1", "Tom", at(10, 15, 0), at(14, 10, 0), None).await;
        add_template(
            &store,
            MessageTemplate::new("Settling in", TriggerKind::DayAfterCheckIn, "All good?")
                .with_send_hour(10),
        )
        .await;
        let engine = TemplateEngine::new(store, Arc::new(ScriptedSender::default()));

        assert_eq!(engine.run_scan(at(10, 12, 0)).await.unwrap().sent, 0);
        assert_eq!(engine.run_scan(at(11, 12, 0)).await.unwrap().sent, 1);
    }

    #[tokio::test]
    async fn unknown_trigger_and_disabled_templates_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        add_reservation(&store, "HT-1", "Tom", at(15, 15, 0), at(16, 10, 0), None).await;
        add_template(
            &store,
            MessageTemplate::new("Legacy", TriggerKind::from_label("week_before_checkin"), "x")
                .with_send_hour(0),
        )
        .await;
        let mut disabled = day_before_checkin();
        disabled.enabled = false;
        add_template(&store, disabled).await;

        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store, sender.clone());
        let report = engine.run_scan(at(14, 20, 0)).await.unwrap();
        assert_eq!(report.templates, 1);
        assert_eq!(report.unknown_triggers, 1);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn utc_offset_moves_today_and_hour() {
        let store = Arc::new(InMemoryStore::new());
        // 15:00 local on 15 Mar at UTC+10.
        add_reservation(&store, "HT-1", "Kai", at(15, 5, 0), at(17, 0, 0), None).await;
        add_template(&store, day_before_checkin().with_send_hour(9)).await;

        let sender = Arc::new(ScriptedSender::default());
        let engine = TemplateEngine::new(store, sender.clone())
            .with_utc_offset_hours(10)
            .unwrap();

        // 14 Mar 10:30 local.
        let report = engine.run_scan(at(14, 0, 30)).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(sender.sent()[0].1, "Hi Kai, see you on 15 Mar!");
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        let engine = TemplateEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(ScriptedSender::default()),
        );
        assert!(engine.with_utc_offset_hours(30).is_err());
    }
}
