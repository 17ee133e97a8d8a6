//! Webhook ingestor - Orchestrates idempotent gateway event handling.
//!
//! This is the write path of the billing engine: every state change a
//! webhook can cause flows through here. The pipeline is
//!
//! 1. Verify the signature (reject before anything touches storage)
//! 2. Claim the event id in the idempotency ledger
//! 3. Route on the closed event kind
//! 4. For payment updates: fetch the authoritative detail, correlate,
//!    and apply every write inside a single store transaction
//! 5. Flip the ledger row to processed only after the commit
//! 6. Enqueue notifications (best-effort, after the commit)
//!
//! ## Failure semantics
//!
//! Anything that fails between claim and mark leaves the ledger row
//! unprocessed, so the gateway's redelivery of the same event id re-runs
//! the flow from the top. Deterministic dead ends (no subscription,
//! malformed reference, unknown status) are skips: logged, marked
//! processed, never retried.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::errors::WebhookError;
use super::signature::WebhookVerifier;
use crate::domain::billing::{
    consecutive_failures, DunningPolicy, ExternalReference, GatewayEvent, GatewayEventKind,
    Payment, PaymentStatus, Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{Clock, PaymentId, Timestamp};
use crate::ports::{
    BillingStore, BillingTxn, ClaimOutcome, LedgerEntry, NotificationKind, NotificationRequest,
    PaymentDetail, PaymentGateway, WebhookLedger,
};

/// What ingesting one delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Billing writes applied and the ledger row flipped to processed.
    Processed,

    /// Recognized but action-free branch (placeholders, unhandled kinds);
    /// ledgered and marked processed without billing writes.
    Recorded,

    /// The ledger already holds this event id as processed.
    AlreadyProcessed,

    /// A concurrent delivery of the same event id won the insert race.
    InFlight,

    /// Claimed, then found to be a deterministic no-op; marked processed.
    Skipped(SkipReason),
}

/// Why a claimed payment event produced no billing writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Gateway detail carried no external reference.
    MissingExternalReference,

    /// External reference did not parse as `{userId}-{planId}`.
    MalformedExternalReference,

    /// No subscription exists for the referenced user.
    SubscriptionNotFound,

    /// Gateway status outside the recognized set.
    UnknownPaymentStatus,
}

/// Outcome of the payment-update flow, before ledger bookkeeping.
enum PaymentFlow {
    Applied(Vec<NotificationRequest>),
    Skipped(SkipReason),
}

/// Ingests gateway webhook deliveries with exactly-once side effects.
pub struct WebhookIngestor {
    verifier: WebhookVerifier,
    ledger: Arc<dyn WebhookLedger>,
    store: Arc<dyn BillingStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    notifications: mpsc::Sender<NotificationRequest>,
    dunning: DunningPolicy,
}

impl WebhookIngestor {
    /// Creates an ingestor with the default dunning policy.
    pub fn new(
        verifier: WebhookVerifier,
        ledger: Arc<dyn WebhookLedger>,
        store: Arc<dyn BillingStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        notifications: mpsc::Sender<NotificationRequest>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            store,
            gateway,
            clock,
            notifications,
            dunning: DunningPolicy::default(),
        }
    }

    /// Overrides the dunning policy (grace days, scan window).
    pub fn with_dunning_policy(mut self, dunning: DunningPolicy) -> Self {
        self.dunning = dunning;
        self
    }

    /// Ingest one signed delivery.
    ///
    /// # Errors
    ///
    /// - Signature-class errors (401) happen before the ledger is touched
    /// - `Gateway`/`Database` errors leave the claimed row unprocessed so
    ///   redelivery retries the event
    pub async fn ingest(
        &self,
        event: GatewayEvent,
        signature_header: &str,
    ) -> Result<IngestOutcome, WebhookError> {
        let now = self.clock.now();

        // 1. Authenticate before anything touches storage
        self.verifier.verify(&event, signature_header, now)?;

        // 2. Claim the event id
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        let entry = LedgerEntry::received(event.event_id(), event.action.clone(), payload, now);
        match self
            .ledger
            .claim(entry)
            .await
            .map_err(WebhookError::Database)?
        {
            ClaimOutcome::Accepted => {}
            ClaimOutcome::AlreadyProcessed => {
                tracing::debug!(event_id = %event.event_id(), "event already processed, skipping");
                return Ok(IngestOutcome::AlreadyProcessed);
            }
            ClaimOutcome::InFlight => {
                tracing::debug!(event_id = %event.event_id(), "event claimed by a concurrent delivery");
                return Ok(IngestOutcome::InFlight);
            }
        }

        // 3. Route on the closed event kind
        match event.kind() {
            GatewayEventKind::PaymentUpdated => match self.handle_payment(&event, now).await? {
                PaymentFlow::Applied(requests) => {
                    self.mark_processed(&event).await?;
                    for request in requests {
                        self.enqueue(request);
                    }
                    Ok(IngestOutcome::Processed)
                }
                PaymentFlow::Skipped(reason) => {
                    self.mark_processed(&event).await?;
                    Ok(IngestOutcome::Skipped(reason))
                }
            },
            kind @ (GatewayEventKind::PaymentCreated
            | GatewayEventKind::SubscriptionCreated
            | GatewayEventKind::SubscriptionUpdated) => {
                tracing::debug!(
                    event_id = %event.event_id(),
                    kind = ?kind,
                    resource = %event.resource_id(),
                    "recorded event without billing action"
                );
                self.mark_processed(&event).await?;
                Ok(IngestOutcome::Recorded)
            }
            GatewayEventKind::Unhandled => {
                tracing::debug!(
                    event_id = %event.event_id(),
                    event_type = %event.event_type,
                    action = %event.action,
                    "ignoring unhandled event kind"
                );
                self.mark_processed(&event).await?;
                Ok(IngestOutcome::Recorded)
            }
        }
    }

    /// The payment-update flow: fetch, correlate, apply in one transaction.
    async fn handle_payment(
        &self,
        event: &GatewayEvent,
        now: Timestamp,
    ) -> Result<PaymentFlow, WebhookError> {
        // The webhook body is only a pointer; ask the gateway what the
        // payment actually is.
        let detail = self
            .gateway
            .fetch_payment_detail(event.resource_id())
            .await
            .map_err(|err| WebhookError::Gateway(err.into()))?;

        // Correlate back to a local user via the external reference.
        let Some(raw_reference) = detail.external_reference.as_deref() else {
            tracing::warn!(
                event_id = %event.event_id(),
                payment = %detail.id,
                "payment detail carries no external reference, skipping"
            );
            return Ok(PaymentFlow::Skipped(SkipReason::MissingExternalReference));
        };
        let reference: ExternalReference = match raw_reference.parse() {
            Ok(reference) => reference,
            Err(err) => {
                tracing::warn!(
                    event_id = %event.event_id(),
                    payment = %detail.id,
                    reference = %raw_reference,
                    error = %err,
                    "unparseable external reference, skipping"
                );
                return Ok(PaymentFlow::Skipped(SkipReason::MalformedExternalReference));
            }
        };

        let Some(status) = detail.parsed_status() else {
            tracing::warn!(
                event_id = %event.event_id(),
                payment = %detail.id,
                status = %detail.status,
                "unrecognized payment status, no state change"
            );
            return Ok(PaymentFlow::Skipped(SkipReason::UnknownPaymentStatus));
        };

        // Everything below is one atomic unit; the row lock on the
        // subscription serializes concurrent events for the same user.
        let mut txn = self.store.begin().await.map_err(WebhookError::Database)?;

        let Some(mut subscription) = txn
            .find_subscription_for_update(reference.user_id)
            .await
            .map_err(WebhookError::Database)?
        else {
            tracing::warn!(
                event_id = %event.event_id(),
                user_id = %reference.user_id,
                "payment references a user with no subscription, skipping"
            );
            return Ok(PaymentFlow::Skipped(SkipReason::SubscriptionNotFound));
        };

        let payment = self
            .upsert_payment(txn.as_mut(), &detail, status, &subscription, now)
            .await?;

        let mut requests = Vec::new();
        match status {
            PaymentStatus::Approved => {
                subscription
                    .activate(now)
                    .map_err(WebhookError::Database)?;
                txn.update_subscription(&subscription)
                    .await
                    .map_err(WebhookError::Database)?;

                requests.extend(self.notification(
                    &subscription,
                    NotificationKind::PaymentReceived,
                    serde_json::json!({
                        "amount_cents": payment.total_amount,
                        "currency": detail.currency,
                    }),
                ));
                requests.extend(self.notification(
                    &subscription,
                    NotificationKind::SubscriptionActivated,
                    serde_json::json!({
                        "next_billing_date": subscription.next_billing_date,
                    }),
                ));
            }
            PaymentStatus::Rejected => {
                // Re-read happened under the row lock above. Suspended
                // subscriptions never re-enter past_due from stale
                // failures, and cancelled ones are out of dunning's reach.
                if matches!(
                    subscription.status,
                    SubscriptionStatus::Suspended | SubscriptionStatus::Cancelled
                ) {
                    tracing::debug!(
                        event_id = %event.event_id(),
                        subscription_id = %subscription.id,
                        status = ?subscription.status,
                        "rejection recorded without escalation"
                    );
                } else {
                    let statuses = txn
                        .recent_payment_statuses(&subscription.id, self.dunning.scan_window)
                        .await
                        .map_err(WebhookError::Database)?;
                    let failures = consecutive_failures(statuses);
                    let step = self.dunning.escalate(failures, subscription.grace_period_end, now);
                    subscription
                        .apply_escalation(step, now)
                        .map_err(WebhookError::Database)?;
                    txn.update_subscription(&subscription)
                        .await
                        .map_err(WebhookError::Database)?;

                    if subscription.status == SubscriptionStatus::Suspended {
                        requests.extend(self.notification(
                            &subscription,
                            NotificationKind::SubscriptionSuspended,
                            serde_json::json!({ "consecutive_failures": failures }),
                        ));
                    } else {
                        requests.extend(self.notification(
                            &subscription,
                            NotificationKind::PaymentFailed,
                            serde_json::json!({ "attempt": failures }),
                        ));
                    }
                }
            }
            PaymentStatus::Pending | PaymentStatus::Refunded => {
                // Payment row updated; the subscription does not move.
            }
        }

        txn.commit().await.map_err(WebhookError::Database)?;
        Ok(PaymentFlow::Applied(requests))
    }

    /// Insert or update the payment row keyed by gateway transaction id.
    async fn upsert_payment(
        &self,
        txn: &mut dyn BillingTxn,
        detail: &PaymentDetail,
        status: PaymentStatus,
        subscription: &Subscription,
        now: Timestamp,
    ) -> Result<Payment, WebhookError> {
        let metadata = serde_json::to_value(detail).unwrap_or(serde_json::Value::Null);

        match txn
            .find_payment_by_transaction(&detail.id)
            .await
            .map_err(WebhookError::Database)?
        {
            Some(mut payment) => {
                payment.record_gateway_status(status, detail.date_approved, metadata, now);
                txn.update_payment(&payment)
                    .await
                    .map_err(WebhookError::Database)?;
                Ok(payment)
            }
            None => {
                let payment = Payment::from_gateway(
                    PaymentId::new(),
                    subscription.user_id,
                    subscription.id,
                    detail.id.clone(),
                    detail.transaction_amount,
                    status,
                    detail.date_approved,
                    metadata,
                    now,
                );
                txn.insert_payment(&payment)
                    .await
                    .map_err(WebhookError::Database)?;
                Ok(payment)
            }
        }
    }

    async fn mark_processed(&self, event: &GatewayEvent) -> Result<(), WebhookError> {
        self.ledger
            .mark_processed(&event.event_id(), self.clock.now())
            .await
            .map_err(WebhookError::Database)
    }

    /// Builds a request when the subscription has somewhere to send it.
    fn notification(
        &self,
        subscription: &Subscription,
        kind: NotificationKind,
        metadata: serde_json::Value,
    ) -> Option<NotificationRequest> {
        let email = subscription.notify_email.as_ref()?;
        Some(NotificationRequest::new(subscription.user_id, kind, email).with_metadata(metadata))
    }

    /// Best-effort enqueue; a full or closed queue drops the request.
    fn enqueue(&self, request: NotificationRequest) {
        if let Err(err) = self.notifications.try_send(request) {
            let request = err.into_inner();
            tracing::warn!(
                kind = %request.kind,
                user_id = %request.user_id,
                "notification queue full or closed, dropping"
            );
        }
    }
}
