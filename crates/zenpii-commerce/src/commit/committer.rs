//! The three commit paths.

use super::error::CommitError;
use super::notify::OrderNotification;
use super::order::{CreatedOrder, Order, PaymentMethod};
use super::pending::{PendingRedirect, PendingRedirects, PendingStatus};
use super::reconcile::ReconciliationCase;
use crate::checkout::{CheckoutSession, Submission};
use crate::payment::{
    CurrencyConverter, GatewayError, GatewayPaymentRequest, RedirectGateway,
};
use crate::ports::{
    HostedCaptureProvider, MarketplaceApi, NoopNotifier, OrderNotifier, ReconciliationSink,
};
use crate::ApiError;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use zenpii_cache::SessionId;

/// Where to send the buyer for a redirect payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedirectTicket {
    /// Echoed back by the gateway as the transaction reference.
    pub correlation_id: String,
    pub payment_url: String,
    pub amount: Decimal,
}

#[derive(Clone)]
struct RedirectLeg {
    gateway: RedirectGateway,
    pending: PendingRedirects,
}

/// Turns a quoted session into a server-side order.
#[derive(Clone)]
pub struct OrderCommitter {
    marketplace: Arc<dyn MarketplaceApi>,
    reconciliation: Arc<dyn ReconciliationSink>,
    notifier: Arc<dyn OrderNotifier>,
    reconciliation_attempts: u32,
    redirect: Option<RedirectLeg>,
}

impl OrderCommitter {
    pub fn new(
        marketplace: Arc<dyn MarketplaceApi>,
        reconciliation: Arc<dyn ReconciliationSink>,
    ) -> Self {
        Self {
            marketplace,
            reconciliation,
            notifier: Arc::new(NoopNotifier),
            reconciliation_attempts: 1,
            redirect: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Extra order-creation attempts after a payment was taken.
    pub fn with_reconciliation_attempts(mut self, attempts: u32) -> Self {
        self.reconciliation_attempts = attempts;
        self
    }

    pub fn with_redirect(mut self, gateway: RedirectGateway, pending: PendingRedirects) -> Self {
        self.redirect = Some(RedirectLeg { gateway, pending });
        self
    }

    /// Cash on delivery: one `createOrder`, no retry.
    pub async fn cash_on_delivery(&self, session: &mut CheckoutSession) -> Result<Order, CommitError> {
        let method = PaymentMethod::CashOnDelivery;
        let submission = session.begin_submit(method)?;

        match self
            .marketplace
            .create_order(&submission.auth, &submission.cart_id, &submission.body)
            .await
        {
            Ok(created) => Ok(self.commit(session, submission, created)),
            Err(source) => Err(abort(session, method, source)),
        }
    }

    /// Hosted capture: convert, open an intent, capture, then create the
    /// order. A capture is never repeated for the same session, including
    /// when the capture call itself ends with an unknown outcome.
    pub async fn hosted_capture(
        &self,
        session: &mut CheckoutSession,
        provider: &dyn HostedCaptureProvider,
        converter: &CurrencyConverter,
    ) -> Result<Order, CommitError> {
        let method = PaymentMethod::HostedCapture;
        let submission = session.begin_submit(method)?;

        let conversion = converter.convert(submission.quote.charge()).await;
        if conversion.used_fallback {
            warn!(checkout = %submission.checkout_id, rate = %conversion.rate, "charging with fallback exchange rate");
        }

        let intent = match provider
            .create_intent(conversion.amount, &submission.checkout_id)
            .await
        {
            Ok(intent) => intent,
            Err(source) => return Err(abort(session, method, source)),
        };
        let receipt = match provider.capture(&intent).await {
            Ok(receipt) => receipt,
            Err(source) if source.outcome_unknown() => {
                // The capture may have happened.
                warn!(checkout = %submission.checkout_id, intent = %intent.id, error = %source, "capture outcome unknown");
                let err = self.escalate(&submission, intent.id.clone(), source).await;
                session.mark_paid_without_order(intent.id, err.to_string());
                return Err(err);
            }
            Err(source) => return Err(abort(session, method, source)),
        };
        info!(checkout = %submission.checkout_id, capture = %receipt.capture_id, amount = %receipt.amount.display(), "payment captured");
        session.record_capture(receipt.clone());

        match self.create_paid_order(&submission).await {
            Ok(created) => Ok(self.commit(session, submission, created)),
            Err(source) => {
                let err = self
                    .escalate(&submission, receipt.capture_id.clone(), source)
                    .await;
                session.mark_paid_without_order(receipt.capture_id, err.to_string());
                Err(err)
            }
        }
    }

    /// Freeze the submission in the pending store and build the gateway URL.
    pub async fn begin_redirect(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<RedirectTicket, CommitError> {
        let leg = self.redirect_leg()?;
        let submission = session.begin_submit(PaymentMethod::RedirectGateway)?;

        let correlation_id = SessionId::generate();
        let request = GatewayPaymentRequest {
            txn_ref: correlation_id.to_string(),
            amount: submission.body.amount_from_user,
            cart_id: submission.cart_id.clone(),
            store_id: submission.store_id.clone(),
            created_at: Utc::now(),
        };
        let payment_url = match leg.gateway.build_payment_url(&request) {
            Ok(url) => url,
            Err(e) => {
                session.abort_submission(e.to_string());
                return Err(e.into());
            }
        };

        let record = PendingRedirect {
            correlation_id: correlation_id.clone(),
            submission,
            status: PendingStatus::AwaitingReturn,
            created_at: request.created_at,
        };
        if let Err(e) = leg.pending.save(&record) {
            session.abort_submission(e.to_string());
            return Err(e.into());
        }

        info!(checkout = %session.id(), correlation = %correlation_id, "redirecting buyer to gateway");
        Ok(RedirectTicket {
            correlation_id: correlation_id.to_string(),
            payment_url,
            amount: request.amount,
        })
    }

    /// Handle the gateway sending the buyer back.
    ///
    /// The return must carry a valid signature, a success code, a known
    /// correlation id and the quoted amount before `createOrder` runs.
    /// Concurrent returns for one checkout race to claim its pending record
    /// and only the winner creates the order.
    pub async fn complete_redirect(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<Order, CommitError> {
        let leg = self.redirect_leg()?;
        let ret = leg.gateway.verify_return(query)?;

        let id = SessionId::new(ret.txn_ref.clone());
        let pending = leg
            .pending
            .load(&id)?
            .ok_or_else(|| CommitError::UnknownRedirect(ret.txn_ref.clone()))?;
        let reference = ret.transaction_no.clone().unwrap_or_else(|| ret.txn_ref.clone());

        if let Some(err) = replayed(&pending.status, &ret.txn_ref, &reference) {
            return Err(err);
        }

        if !ret.is_success() {
            info!(correlation = %id, code = %ret.response_code, "buyer did not complete gateway payment");
            leg.pending.discard(&id)?;
            return Err(CommitError::PaymentNotCompleted {
                code: ret.response_code,
            });
        }

        if let Err(status) = leg.pending.claim(&id)? {
            info!(correlation = %id, "gateway return lost the race for its pending checkout");
            return Err(replayed(&status, &ret.txn_ref, &reference)
                .unwrap_or_else(|| CommitError::RedirectInProgress(ret.txn_ref.clone())));
        }

        let submission = pending.submission;
        let expected = submission.body.amount_from_user.round_dp(2);
        if ret.amount != expected {
            let err = CommitError::AmountMismatch {
                expected,
                got: ret.amount,
            };
            let _ = self
                .escalate(&submission, reference, ApiError::Server(err.to_string()))
                .await;
            if let Err(e) = leg.pending.mark_escalated(&id, &err.to_string()) {
                error!(correlation = %id, error = %e, "failed to mark pending checkout escalated");
            }
            return Err(err);
        }

        match self.create_paid_order(&submission).await {
            Ok(created) => {
                if let Err(e) = leg.pending.mark_completed(&id, &created.order_id) {
                    warn!(correlation = %id, error = %e, "order created but pending record not updated");
                }
                let order = submission.into_order(created);
                self.announce(&order);
                info!(order = %order.id, correlation = %id, "gateway order committed");
                Ok(order)
            }
            Err(source) => {
                let err = self.escalate(&submission, reference, source).await;
                if let Err(e) = leg.pending.mark_escalated(&id, &err.to_string()) {
                    error!(correlation = %id, error = %e, "failed to mark pending checkout escalated");
                }
                Err(err)
            }
        }
    }

    fn redirect_leg(&self) -> Result<&RedirectLeg, CommitError> {
        self.redirect
            .as_ref()
            .ok_or(CommitError::Gateway(GatewayError::NotConfigured("redirect gateway")))
    }

    /// `createOrder` after payment: one call plus the reconciliation
    /// attempts, all carrying the same idempotency key.
    async fn create_paid_order(&self, submission: &Submission) -> Result<CreatedOrder, ApiError> {
        let mut attempt = 0;
        loop {
            match self
                .marketplace
                .create_order(&submission.auth, &submission.cart_id, &submission.body)
                .await
            {
                Ok(created) => return Ok(created),
                Err(e) if attempt < self.reconciliation_attempts => {
                    attempt += 1;
                    warn!(
                        checkout = %submission.checkout_id,
                        attempt,
                        error = %e,
                        "order creation failed after payment, retrying with same key"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn escalate(
        &self,
        submission: &Submission,
        reference: String,
        source: ApiError,
    ) -> CommitError {
        let case = ReconciliationCase {
            reference: reference.clone(),
            checkout_id: submission.checkout_id.clone(),
            method: submission.method,
            buyer_id: submission.auth.buyer_id.clone(),
            cart_id: submission.cart_id.clone(),
            store_id: submission.store_id.clone(),
            body: submission.body.clone(),
            last_error: source.to_string(),
            raised_at: Utc::now(),
        };
        if let Err(e) = self.reconciliation.escalate(case).await {
            error!(reference = %reference, error = %e, "reconciliation escalation failed");
        }
        CommitError::PostPayment {
            method: submission.method,
            reference,
            source,
        }
    }

    fn commit(&self, session: &mut CheckoutSession, submission: Submission, created: CreatedOrder) -> Order {
        let order = submission.into_order(created);
        self.announce(&order);
        session.mark_committed(order.clone());
        order
    }

    fn announce(&self, order: &Order) {
        self.notifier.notify(OrderNotification {
            object_id: order.id.clone(),
            from: order.buyer_id.clone(),
            to: order.store_id.clone(),
        });
    }
}

/// The error for a return whose pending checkout no longer awaits one.
fn replayed(status: &PendingStatus, txn_ref: &str, reference: &str) -> Option<CommitError> {
    match status {
        PendingStatus::AwaitingReturn => None,
        PendingStatus::Processing => Some(CommitError::RedirectInProgress(txn_ref.to_string())),
        PendingStatus::Completed { order_id } => Some(CommitError::AlreadyCompleted {
            reference: txn_ref.to_string(),
            order_id: order_id.to_string(),
        }),
        PendingStatus::Escalated { reason } => Some(CommitError::PostPayment {
            method: PaymentMethod::RedirectGateway,
            reference: reference.to_string(),
            source: ApiError::Server(reason.clone()),
        }),
    }
}

fn abort(session: &mut CheckoutSession, method: PaymentMethod, source: ApiError) -> CommitError {
    warn!(checkout = %session.id(), method = method.as_str(), error = %source, "submission failed before payment");
    session.abort_submission(source.to_string());
    CommitError::PrePayment { method, source }
}
