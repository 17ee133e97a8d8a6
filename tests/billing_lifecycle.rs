//! Integration tests for the subscription billing lifecycle.
//!
//! These tests wire the real ingestor and workers to the in-memory
//! adapters and drive them with a manual clock, covering:
//!
//! 1. Signed webhook deliveries and the idempotency ledger
//! 2. Escalation from rejected payments to past_due and suspension
//! 3. Reminder, penalty and grace-expiry sweeps at exact day offsets
//! 4. Recovery of suspended subscriptions by approved payments
//! 5. Redelivery after a gateway outage mid-event
//!
//! Signature headers are computed by hand here the same way the gateway
//! computes them: HMAC-SHA256 over `id=<resource>&type=<type>&ts=<ts>`.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tokio::sync::mpsc;

use backline::adapters::memory::{
    InMemoryBillingStore, InMemoryNotifier, InMemoryReminderLog, InMemoryWebhookLedger,
    StubPaymentGateway,
};
use backline::application::webhook::{
    IngestOutcome, SkipReason, WebhookError, WebhookIngestor, WebhookVerifier,
};
use backline::application::workers::{GraceExpiryWorker, PenaltyWorker, ReminderWorker};
use backline::domain::billing::{
    GatewayEvent, GatewayEventData, Payment, PaymentStatus, Subscription, SubscriptionStatus,
};
use backline::domain::foundation::{
    Clock, ManualClock, PaymentId, PlanId, SubscriptionId, Timestamp, UserId,
};
use backline::ports::{GatewayError, NotificationKind, NotificationRequest, PaymentDetail};

// ===== Test Infrastructure =====

const WEBHOOK_SECRET: &str = "lifecycle-suite-shared-secret";
const PLAN: i64 = 7;
const AMOUNT_CENTS: i64 = 10_000;

fn epoch() -> Timestamp {
    Timestamp::from_unix_secs(1_700_000_000)
}

/// The full billing engine assembled over in-memory adapters.
struct BillingApp {
    store: Arc<InMemoryBillingStore>,
    ledger: Arc<InMemoryWebhookLedger>,
    reminder_log: Arc<InMemoryReminderLog>,
    gateway: Arc<StubPaymentGateway>,
    notifier: Arc<InMemoryNotifier>,
    clock: Arc<ManualClock>,
    ingestor: WebhookIngestor,
    reminder: ReminderWorker,
    penalty: PenaltyWorker,
    grace_expiry: GraceExpiryWorker,
    /// Held open for the whole test; dropping it would close the
    /// ingestor's queue and fail post-commit sends.
    webhook_queue: mpsc::Receiver<NotificationRequest>,
}

fn billing_app() -> BillingApp {
    let store = Arc::new(InMemoryBillingStore::new());
    let ledger = Arc::new(InMemoryWebhookLedger::new());
    let reminder_log = Arc::new(InMemoryReminderLog::new());
    let gateway = Arc::new(StubPaymentGateway::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let (tx, rx) = mpsc::channel(32);

    let ingestor = WebhookIngestor::new(
        WebhookVerifier::new(SecretString::new(WEBHOOK_SECRET.to_string())),
        ledger.clone(),
        store.clone(),
        gateway.clone(),
        clock.clone(),
        tx,
    );
    let reminder = ReminderWorker::new(
        store.clone(),
        reminder_log.clone(),
        notifier.clone(),
        clock.clone(),
    );
    let penalty = PenaltyWorker::new(store.clone(), notifier.clone(), clock.clone());
    let grace_expiry = GraceExpiryWorker::new(store.clone(), notifier.clone(), clock.clone());

    BillingApp {
        store,
        ledger,
        reminder_log,
        gateway,
        notifier,
        clock,
        ingestor,
        reminder,
        penalty,
        grace_expiry,
        webhook_queue: rx,
    }
}

impl BillingApp {
    /// Seeds an active monthly subscription for the user.
    fn seed_subscriber(&self, user: i64) -> Subscription {
        let subscription = Subscription::start(
            SubscriptionId::new(),
            UserId::new(user).unwrap(),
            PlanId::new(PLAN).unwrap(),
            Some(format!("user{user}@example.com")),
            self.clock.now(),
        );
        self.store.seed_subscription(subscription.clone());
        subscription
    }

    /// Seeds a pending invoice against the subscription.
    fn seed_invoice(
        &self,
        subscription: &Subscription,
        transaction: &str,
        due: Timestamp,
    ) -> Payment {
        let payment = Payment::pending(
            PaymentId::new(),
            subscription.user_id,
            subscription.id,
            transaction,
            AMOUNT_CENTS,
            due,
            self.clock.now(),
        );
        self.store.seed_payment(payment.clone());
        payment
    }

    /// Scripts the gateway detail lookup for a transaction.
    fn script_payment(&self, transaction: &str, status: &str, user: i64) {
        let date_approved = (status == "approved").then(|| self.clock.now());
        self.gateway.respond(
            transaction,
            PaymentDetail {
                id: transaction.to_string(),
                status: status.to_string(),
                external_reference: Some(format!("{user}-{PLAN}")),
                transaction_amount: AMOUNT_CENTS,
                currency: "ARS".to_string(),
                date_approved,
            },
        );
    }

    /// Scripts the gateway, then delivers a freshly signed
    /// `payment.updated` event.
    async fn deliver_payment(
        &self,
        event_id: i64,
        transaction: &str,
        status: &str,
        user: i64,
    ) -> Result<IngestOutcome, WebhookError> {
        self.script_payment(transaction, status, user);
        let event = payment_event(event_id, transaction);
        let header = self.sign(&event);
        self.ingestor.ingest(event, &header).await
    }

    fn sign(&self, event: &GatewayEvent) -> String {
        signature_header(
            &event.data.id,
            &event.event_type,
            self.clock.now().as_unix_secs(),
        )
    }

    fn subscription_of(&self, user: i64) -> Subscription {
        self.store
            .subscription_for_user(UserId::new(user).unwrap())
            .expect("subscription seeded")
    }

    /// Notification kinds queued by the webhook path since the last drain.
    fn drain_webhook_kinds(&mut self) -> Vec<NotificationKind> {
        let mut kinds = Vec::new();
        while let Ok(request) = self.webhook_queue.try_recv() {
            kinds.push(request.kind);
        }
        kinds
    }
}

fn payment_event(event_id: i64, transaction: &str) -> GatewayEvent {
    GatewayEvent {
        id: event_id,
        action: "payment.updated".to_string(),
        data: GatewayEventData {
            id: transaction.to_string(),
        },
        event_type: "payment".to_string(),
    }
}

/// Signs the canonical manifest the way the gateway does.
fn signature_header(resource_id: &str, event_type: &str, ts: i64) -> String {
    let manifest = format!("id={resource_id}&type={event_type}&ts={ts}");
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(manifest.as_bytes());
    format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}

// ===== Integration Tests =====

/// An approved payment activates the subscription, restarts the billing
/// period, marks the ledger row processed, and queues both notifications.
#[tokio::test]
async fn approved_payment_activates_subscription_end_to_end() {
    let mut app = billing_app();
    app.seed_subscriber(42);
    app.clock.advance_days(10);
    let paid_at = app.clock.now();

    let outcome = app
        .deliver_payment(1001, "pay_100", "approved", 42)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Processed);
    assert!(app.ledger.is_processed("1001"));

    let payment = app
        .store
        .payment_by_transaction("pay_100")
        .expect("payment recorded");
    assert_eq!(payment.status, PaymentStatus::Approved);
    assert_eq!(payment.total_amount, AMOUNT_CENTS);
    assert!(payment.paid_at.is_some());

    let subscription = app.subscription_of(42);
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.current_period_start, paid_at);
    assert_eq!(subscription.next_billing_date, paid_at.add_months(1));
    assert!(subscription.grace_period_end.is_none());

    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentReceived,
            NotificationKind::SubscriptionActivated,
        ]
    );
}

/// Redelivering a processed event acknowledges without touching billing
/// state, the gateway, or the notification queue.
#[tokio::test]
async fn redelivered_event_is_acknowledged_without_reprocessing() {
    let mut app = billing_app();
    app.seed_subscriber(42);

    let first = app
        .deliver_payment(1001, "pay_100", "approved", 42)
        .await
        .unwrap();
    assert_eq!(first, IngestOutcome::Processed);
    let after_first = app.subscription_of(42);
    app.drain_webhook_kinds();

    app.clock.advance_secs(30);
    let second = app
        .deliver_payment(1001, "pay_100", "approved", 42)
        .await
        .unwrap();

    assert_eq!(second, IngestOutcome::AlreadyProcessed);
    assert_eq!(
        app.gateway.call_count(),
        1,
        "the claim short-circuits before the gateway lookup"
    );
    assert_eq!(app.store.payment_count(), 1);
    assert_eq!(app.ledger.row_count(), 1);
    assert_eq!(app.subscription_of(42).updated_at, after_first.updated_at);
    assert!(app.drain_webhook_kinds().is_empty());
}

/// Two interleaved deliveries of one event id converge on a single
/// ledger row and a single payment row.
#[tokio::test]
async fn concurrent_deliveries_converge_on_one_payment() {
    let app = billing_app();
    app.seed_subscriber(42);
    app.script_payment("pay_100", "approved", 42);

    let header = signature_header("pay_100", "payment", epoch().as_unix_secs());
    let (first, second) = tokio::join!(
        app.ingestor.ingest(payment_event(1001, "pay_100"), &header),
        app.ingestor.ingest(payment_event(1001, "pay_100"), &header),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    assert!(outcomes.contains(&IngestOutcome::Processed));
    assert_eq!(app.ledger.row_count(), 1);
    assert_eq!(app.store.payment_count(), 1);
    assert!(app.ledger.is_processed("1001"));
    assert_eq!(app.subscription_of(42).status, SubscriptionStatus::Active);
}

/// The first rejection opens a 3-day grace window; a later rejection
/// never moves the deadline.
#[tokio::test]
async fn grace_deadline_is_anchored_by_the_first_rejection() {
    let mut app = billing_app();
    app.seed_subscriber(42);

    app.deliver_payment(2001, "pay_r1", "rejected", 42)
        .await
        .unwrap();
    let demoted = app.subscription_of(42);
    assert_eq!(demoted.status, SubscriptionStatus::PastDue);
    let deadline = demoted.grace_period_end.expect("grace window opened");
    assert_eq!(deadline, epoch().plus_days(3));

    app.clock.advance_days(1);
    app.deliver_payment(2002, "pay_r2", "rejected", 42)
        .await
        .unwrap();

    let still_demoted = app.subscription_of(42);
    assert_eq!(still_demoted.status, SubscriptionStatus::PastDue);
    assert_eq!(
        still_demoted.grace_period_end,
        Some(deadline),
        "the second failure keeps the original deadline"
    );
    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentFailed,
            NotificationKind::PaymentFailed,
        ]
    );
}

/// Three straight rejections walk active -> past_due -> suspended, and
/// suspension clears the grace deadline.
#[tokio::test]
async fn third_straight_rejection_suspends() {
    let mut app = billing_app();
    app.seed_subscriber(42);

    for (event_id, transaction) in [(2001, "pay_r1"), (2002, "pay_r2"), (2003, "pay_r3")] {
        app.deliver_payment(event_id, transaction, "rejected", 42)
            .await
            .unwrap();
        app.clock.advance_secs(3_600);
    }

    let subscription = app.subscription_of(42);
    assert_eq!(subscription.status, SubscriptionStatus::Suspended);
    assert!(subscription.grace_period_end.is_none());
    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentFailed,
            NotificationKind::PaymentFailed,
            NotificationKind::SubscriptionSuspended,
        ]
    );
}

/// A stale rejection arriving after suspension records the payment but
/// never pulls the subscription back into past_due.
#[tokio::test]
async fn rejection_after_suspension_only_records_the_payment() {
    let mut app = billing_app();
    app.seed_subscriber(42);
    for (event_id, transaction) in [(2001, "pay_r1"), (2002, "pay_r2"), (2003, "pay_r3")] {
        app.deliver_payment(event_id, transaction, "rejected", 42)
            .await
            .unwrap();
    }
    app.drain_webhook_kinds();

    app.clock.advance_days(1);
    let outcome = app
        .deliver_payment(2004, "pay_r4", "rejected", 42)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Processed);
    assert_eq!(app.store.payment_count(), 4);
    let subscription = app.subscription_of(42);
    assert_eq!(subscription.status, SubscriptionStatus::Suspended);
    assert!(subscription.grace_period_end.is_none());
    assert!(
        app.drain_webhook_kinds().is_empty(),
        "no escalation fires for a suspended subscription"
    );
}

/// An approved payment recovers a suspended subscription into a fresh
/// active period.
#[tokio::test]
async fn approved_payment_reactivates_a_suspended_subscription() {
    let mut app = billing_app();
    app.seed_subscriber(42);
    for (event_id, transaction) in [(2001, "pay_r1"), (2002, "pay_r2"), (2003, "pay_r3")] {
        app.deliver_payment(event_id, transaction, "rejected", 42)
            .await
            .unwrap();
    }
    assert_eq!(app.subscription_of(42).status, SubscriptionStatus::Suspended);
    app.drain_webhook_kinds();

    app.clock.advance_days(2);
    let recovered_at = app.clock.now();
    app.deliver_payment(2010, "pay_ok", "approved", 42)
        .await
        .unwrap();

    let subscription = app.subscription_of(42);
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert!(subscription.grace_period_end.is_none());
    assert_eq!(subscription.current_period_start, recovered_at);
    assert_eq!(subscription.next_billing_date, recovered_at.add_months(1));
    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentReceived,
            NotificationKind::SubscriptionActivated,
        ]
    );
}

/// Seven days past due with a 2-day grace: 5 billable days at 5% plus
/// 0.5% per day, rounded half-up on the cent.
#[tokio::test]
async fn penalty_sweep_applies_the_published_breakdown() {
    let app = billing_app();
    let subscription = app.seed_subscriber(42);
    let due = epoch();
    app.seed_invoice(&subscription, "inv_100", due);
    app.clock.set(due.plus_days(7));

    let report = app.penalty.run_once().await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed, 0);

    let payment = app.store.payment_by_transaction("inv_100").unwrap();
    assert_eq!(payment.penalty_fee, 750);
    assert_eq!(payment.total_amount, 10_750);
    assert_eq!(payment.status, PaymentStatus::Pending);

    let demoted = app.subscription_of(42);
    assert_eq!(demoted.status, SubscriptionStatus::PastDue);
    assert_eq!(demoted.grace_period_end, Some(due.plus_days(10)));

    let sent = app.notifier.delivered_of_kind(NotificationKind::PenaltyApplied);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].metadata["penalty_cents"], 750);
    assert_eq!(sent[0].metadata["days_late"], 5);
}

/// A second sweep finds nothing: penalized rows leave the scan.
#[tokio::test]
async fn penalty_lands_exactly_once() {
    let app = billing_app();
    let subscription = app.seed_subscriber(42);
    app.seed_invoice(&subscription, "inv_100", epoch());
    app.clock.set(epoch().plus_days(7));
    app.penalty.run_once().await.unwrap();

    app.clock.advance_days(1);
    let second = app.penalty.run_once().await.unwrap();

    assert_eq!(second.checked, 0);
    assert_eq!(second.applied, 0);
    let payment = app.store.payment_by_transaction("inv_100").unwrap();
    assert_eq!(payment.total_amount, 10_750);
    assert_eq!(
        app.notifier
            .delivered_of_kind(NotificationKind::PenaltyApplied)
            .len(),
        1
    );
}

/// One poisoned row does not stop the sweep: the rest are penalized and
/// the failure is counted for the next pass.
#[tokio::test]
async fn penalty_sweep_survives_a_poisoned_row() {
    let app = billing_app();
    let mut invoices = Vec::new();
    for user in 1..=3 {
        let subscription = app.seed_subscriber(user);
        invoices.push(app.seed_invoice(&subscription, &format!("inv_{user}"), epoch()));
    }
    app.store.fail_payment_updates_for(invoices[1].id);
    app.clock.set(epoch().plus_days(7));

    let report = app.penalty.run_once().await.unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        app.store
            .payment_by_transaction("inv_1")
            .unwrap()
            .penalty_fee,
        750
    );
    assert_eq!(
        app.store
            .payment_by_transaction("inv_2")
            .unwrap()
            .penalty_fee,
        0,
        "the poisoned row is untouched"
    );
    assert_eq!(
        app.store
            .payment_by_transaction("inv_3")
            .unwrap()
            .penalty_fee,
        750
    );
    assert_eq!(app.subscription_of(2).status, SubscriptionStatus::Active);
}

/// Only lapsed grace windows are suspended; running windows survive the
/// sweep untouched.
#[tokio::test]
async fn grace_sweep_suspends_only_lapsed_windows() {
    let app = billing_app();
    let mut lapsed = app.seed_subscriber(1);
    lapsed.mark_past_due(epoch().plus_days(2), epoch()).unwrap();
    app.store.seed_subscription(lapsed);
    let mut running = app.seed_subscriber(2);
    running.mark_past_due(epoch().plus_days(5), epoch()).unwrap();
    app.store.seed_subscription(running);
    app.clock.set(epoch().plus_days(3));

    let report = app.grace_expiry.run_once().await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(app.subscription_of(1).status, SubscriptionStatus::Suspended);
    assert!(app.subscription_of(1).grace_period_end.is_none());
    assert_eq!(app.subscription_of(2).status, SubscriptionStatus::PastDue);

    let sent = app.notifier.delivered_of_kind(NotificationKind::GraceExpired);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, UserId::new(1).unwrap());
}

/// Reminders go out at the configured day marks and only once per mark.
#[tokio::test]
async fn reminder_goes_out_once_per_window() {
    let app = billing_app();
    let subscription = app.seed_subscriber(42);
    let due = subscription.next_billing_date;
    app.clock.set(due.minus_days(3));

    let report = app.reminder.run_once().await.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(app.reminder_log.sent_count(), 1);

    let again = app.reminder.run_once().await.unwrap();
    assert_eq!(again.applied, 0, "a same-day rerun is deduplicated");
    assert_eq!(app.reminder_log.sent_count(), 1);

    let sent = app.notifier.delivered_of_kind(NotificationKind::PaymentReminder);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].metadata["days_before"], 3);
    assert_eq!(sent[0].recipient, "user42@example.com");
}

/// The whole dunning arc: reminder before the due date, penalty and
/// demotion after it, suspension when the window lapses, recovery when
/// the invoice is finally approved.
#[tokio::test]
async fn overdue_invoice_walks_the_full_dunning_path() {
    let mut app = billing_app();
    let subscription = app.seed_subscriber(42);
    let due = subscription.next_billing_date;
    app.seed_invoice(&subscription, "inv_cycle", due);

    // Three days out: one reminder.
    app.clock.set(due.minus_days(3));
    let reminded = app.reminder.run_once().await.unwrap();
    assert_eq!(reminded.applied, 1);

    // Three days late: penalty plus demotion to past_due.
    app.clock.set(due.plus_days(3));
    let penalized = app.penalty.run_once().await.unwrap();
    assert_eq!(penalized.applied, 1);
    let invoice = app.store.payment_by_transaction("inv_cycle").unwrap();
    assert_eq!(invoice.penalty_fee, 550);
    let demoted = app.subscription_of(42);
    assert_eq!(demoted.status, SubscriptionStatus::PastDue);
    assert_eq!(demoted.grace_period_end, Some(due.plus_days(6)));

    // Past the deadline: the sweep suspends.
    app.clock.set(due.plus_days(7));
    let swept = app.grace_expiry.run_once().await.unwrap();
    assert_eq!(swept.applied, 1);
    assert_eq!(app.subscription_of(42).status, SubscriptionStatus::Suspended);

    // The invoice settles: an approved webhook recovers the subscription.
    app.clock.advance_days(1);
    let settled_at = app.clock.now();
    let outcome = app
        .deliver_payment(9001, "inv_cycle", "approved", 42)
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Processed);

    let recovered = app.subscription_of(42);
    assert_eq!(recovered.status, SubscriptionStatus::Active);
    assert!(recovered.grace_period_end.is_none());
    assert_eq!(recovered.next_billing_date, settled_at.add_months(1));

    let settled = app.store.payment_by_transaction("inv_cycle").unwrap();
    assert_eq!(settled.status, PaymentStatus::Approved);
    assert_eq!(settled.total_amount, 10_550, "the late fee survives settlement");
    assert_eq!(
        app.store.payment_count(),
        1,
        "the webhook updated the invoice in place"
    );

    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentReceived,
            NotificationKind::SubscriptionActivated,
        ]
    );
    assert_eq!(
        app.notifier
            .delivered_of_kind(NotificationKind::PaymentReminder)
            .len(),
        1
    );
    assert_eq!(
        app.notifier
            .delivered_of_kind(NotificationKind::PenaltyApplied)
            .len(),
        1
    );
    assert_eq!(
        app.notifier
            .delivered_of_kind(NotificationKind::GraceExpired)
            .len(),
        1
    );
}

/// A gateway outage fails the event but leaves the claim unprocessed, so
/// the gateway's redelivery of the same id completes the work.
#[tokio::test]
async fn gateway_outage_leaves_the_event_claimable() {
    let mut app = billing_app();
    app.seed_subscriber(42);
    app.gateway
        .fail("pay_out", GatewayError::timeout("Payment detail lookup"));

    let event = payment_event(3001, "pay_out");
    let header = app.sign(&event);
    let err = app.ingestor.ingest(event, &header).await.unwrap_err();

    assert!(matches!(err, WebhookError::Gateway(_)));
    assert!(err.is_retryable());
    assert_eq!(
        app.ledger.row_count(),
        1,
        "the claim is ledgered before the lookup"
    );
    assert!(!app.ledger.is_processed("3001"));
    assert_eq!(app.store.payment_count(), 0);

    // The gateway recovers and redelivers the same event id.
    app.clock.advance_secs(60);
    let outcome = app
        .deliver_payment(3001, "pay_out", "approved", 42)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Processed);
    assert!(app.ledger.is_processed("3001"));
    assert_eq!(app.subscription_of(42).status, SubscriptionStatus::Active);
    assert_eq!(
        app.drain_webhook_kinds(),
        vec![
            NotificationKind::PaymentReceived,
            NotificationKind::SubscriptionActivated,
        ]
    );
}

/// A payment for an unknown user is a terminal skip: marked processed so
/// the gateway stops redelivering it.
#[tokio::test]
async fn unknown_subscriber_is_skipped_terminally() {
    let app = billing_app();

    let outcome = app
        .deliver_payment(4001, "pay_x", "approved", 99)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        IngestOutcome::Skipped(SkipReason::SubscriptionNotFound)
    );
    assert!(app.ledger.is_processed("4001"));
    assert_eq!(app.store.payment_count(), 0);

    let redelivered = app
        .deliver_payment(4001, "pay_x", "approved", 99)
        .await
        .unwrap();
    assert_eq!(redelivered, IngestOutcome::AlreadyProcessed);
}
