//! Checkout session state machine.

use super::contact::ContactInfo;
use super::validation::{CheckoutValidation, RequiredField};
use crate::commit::{BuyerAuth, CommitError, CreatedOrder, Order, OrderBody, PaymentMethod};
use crate::config::CheckoutConfig;
use crate::ids::{CartId, CheckoutId, CommissionId, StoreId, UserId};
use crate::payment::CaptureReceipt;
use crate::ports::MarketplaceApi;
use crate::retry::with_retries;
use crate::settlement::{
    check_commission_rate, compose_quote, compute_commission_split, compute_product_totals,
    compute_shipping_split, CommissionRate, Level, LineItem, OrderQuote,
};
use crate::shipping::{ShippingQuote, ShippingQuoter};
use crate::{ApiError, CommerceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators a session quotes against.
#[derive(Clone)]
pub struct CheckoutDeps {
    pub marketplace: Arc<dyn MarketplaceApi>,
    pub shipping: ShippingQuoter,
    pub config: CheckoutConfig,
}

impl CheckoutDeps {
    pub fn new(
        marketplace: Arc<dyn MarketplaceApi>,
        shipping: ShippingQuoter,
        config: CheckoutConfig,
    ) -> Self {
        let shipping = shipping.with_retries(config.quote_retries);
        Self {
            marketplace,
            shipping,
            config,
        }
    }
}

/// The signed-in buyer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerAccount {
    pub auth: BuyerAuth,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Saved addresses, default first.
    pub addresses: Vec<String>,
}

impl BuyerAccount {
    pub fn id(&self) -> &UserId {
        &self.auth.buyer_id
    }
}

/// The cart being checked out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSnapshot {
    pub id: CartId,
    pub store_id: StoreId,
    /// Ship-from address of the store.
    pub store_address: String,
    pub items: Vec<LineItem>,
}

impl CartSnapshot {
    fn check_items(&self) -> Result<(), CommerceError> {
        for item in &self.items {
            item.validate()?;
            if item.store_id != self.store_id {
                return Err(CommerceError::MixedStores {
                    expected: self.store_id.to_string(),
                    found: item.store_id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Quote inputs are being fetched.
    Initializing,
    /// A quote is available and editable.
    Quoted,
    /// One commit path is in flight.
    Submitting,
    /// The order exists.
    Committed,
    /// Stopped. A recoverable failure can be retried; a paid checkout
    /// without an order cannot.
    Failed { recoverable: bool },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Quoted => write!(f, "quoted"),
            SessionState::Submitting => write!(f, "submitting"),
            SessionState::Committed => write!(f, "committed"),
            SessionState::Failed { recoverable: true } => write!(f, "failed"),
            SessionState::Failed { recoverable: false } => write!(f, "failed (needs reconciliation)"),
        }
    }
}

/// A remote input to the quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuoteInput {
    StoreLevel,
    BuyerLevel,
    Commission,
    Origin,
    Destination,
    Shipping,
}

impl QuoteInput {
    pub fn label(&self) -> &'static str {
        match self {
            QuoteInput::StoreLevel => "store level",
            QuoteInput::BuyerLevel => "buyer level",
            QuoteInput::Commission => "commission",
            QuoteInput::Origin => "store location",
            QuoteInput::Destination => "delivery location",
            QuoteInput::Shipping => "shipping fee",
        }
    }
}

/// A composed quote and the inputs it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuote {
    pub quote: OrderQuote,
    pub shipping: ShippingQuote,
    pub commission: Option<CommissionRate>,
    pub store_level: Option<Level>,
    pub buyer_level: Option<Level>,
    /// Inputs that fell back to a default after their lookup failed.
    pub degraded: Vec<QuoteInput>,
    /// Address the shipping fee was quoted for.
    pub destination_address: String,
}

impl ResolvedQuote {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// A resolved ticket, to be handed back to the session.
#[derive(Debug, Clone)]
pub struct QuoteOutcome {
    pub generation: u64,
    pub result: Result<ResolvedQuote, CommerceError>,
}

/// What [`CheckoutSession::apply_quote`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteApplied {
    Applied,
    /// The outcome belonged to an older generation and was dropped.
    Stale,
}

/// A snapshot of quote inputs for one generation.
///
/// Holds no reference to the session, so it can be resolved while the
/// session keeps accepting edits.
#[must_use = "a quote ticket does nothing until resolved and applied"]
#[derive(Clone)]
pub struct QuoteTicket {
    generation: u64,
    deps: CheckoutDeps,
    cart: CartSnapshot,
    buyer_id: UserId,
    destination_address: String,
}

impl fmt::Debug for QuoteTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuoteTicket")
            .field("generation", &self.generation)
            .field("cart", &self.cart.id)
            .field("destination_address", &self.destination_address)
            .finish()
    }
}

impl QuoteTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fetch every input, then compose. Lookup failures fall back to zero
    /// and are reported as degraded; only a misconfiguration fails.
    pub async fn resolve(self) -> QuoteOutcome {
        let generation = self.generation;
        let result = self.compute().await;
        QuoteOutcome { generation, result }
    }

    async fn compute(self) -> Result<ResolvedQuote, CommerceError> {
        self.cart.check_items()?;

        let api = &*self.deps.marketplace;
        let retries = self.deps.config.quote_retries;
        let store_id = &self.cart.store_id;
        let buyer_id = &self.buyer_id;
        let store_address = self.cart.store_address.as_str();
        let destination_address = self.destination_address.as_str();

        let (store_level, buyer_level, commission, origin, destination) = futures::join!(
            lookup(QuoteInput::StoreLevel, retries, move || api.store_level(store_id)),
            lookup(QuoteInput::BuyerLevel, retries, move || api.buyer_level(buyer_id)),
            lookup(QuoteInput::Commission, retries, move || api.commission_by_store(store_id)),
            lookup(QuoteInput::Origin, retries, move || api.resolve_location(store_address)),
            lookup(QuoteInput::Destination, retries, move || {
                api.resolve_location(destination_address)
            }),
        );

        let mut degraded = Vec::new();
        let store_level = store_level.unwrap_or_else(|input| fallback(&mut degraded, input));
        let buyer_level = buyer_level.unwrap_or_else(|input| fallback(&mut degraded, input));
        let commission = commission.unwrap_or_else(|input| fallback(&mut degraded, input));
        let origin = origin.unwrap_or_else(|input| fallback(&mut degraded, input));
        let destination = destination.unwrap_or_else(|input| fallback(&mut degraded, input));

        if let Some(c) = &commission {
            if c.store_id != self.cart.store_id {
                warn!(expected = %self.cart.store_id, got = %c.store_id, "commission belongs to another store");
            }
        }
        check_commission_rate(store_level.as_ref(), commission.as_ref())?;

        let items = &self.cart.items;
        let totals = compute_product_totals(items, buyer_level.as_ref());

        let quoter = &self.deps.shipping;
        let shipping = quoter
            .quote(
                quoter.origin_or_default(origin),
                quoter.destination_or_default(destination),
                totals.total_list_price,
            )
            .await;
        if !shipping.is_chargeable() {
            degraded.push(QuoteInput::Shipping);
        }

        let shipping_split = compute_shipping_split(shipping.fee_before_discount, buyer_level.as_ref());
        let commission_split =
            compute_commission_split(items, store_level.as_ref(), commission.as_ref());
        let quote = compose_quote(
            &totals,
            &shipping_split,
            &commission_split,
            self.deps.config.currency,
        );
        quote.verify_balanced()?;

        degraded.sort();
        Ok(ResolvedQuote {
            quote,
            shipping,
            commission,
            store_level,
            buyer_level,
            degraded,
            destination_address: self.destination_address,
        })
    }
}

async fn lookup<T, F, Fut>(
    input: QuoteInput,
    retries: u32,
    call: F,
) -> Result<Option<T>, QuoteInput>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    with_retries(input.label(), retries, call).await.map_err(|e| {
        warn!(input = input.label(), error = %e, "quote input unavailable, using default");
        input
    })
}

fn fallback<T>(degraded: &mut Vec<QuoteInput>, input: QuoteInput) -> Option<T> {
    degraded.push(input);
    None
}

/// Everything a commit path needs, captured when submission starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub checkout_id: CheckoutId,
    pub auth: BuyerAuth,
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub contact: ContactInfo,
    pub commission_id: CommissionId,
    pub quote: OrderQuote,
    pub method: PaymentMethod,
    pub body: OrderBody,
}

impl Submission {
    pub fn into_order(self, created: CreatedOrder) -> Order {
        Order {
            id: created.order_id,
            cart_id: self.cart_id,
            store_id: self.store_id,
            buyer_id: self.auth.buyer_id,
            contact: self.contact,
            commission_id: self.commission_id,
            quote: self.quote,
            payment_method: self.method,
            is_paid_before: self.body.is_paid_before,
            idempotency_key: self.checkout_id,
            user: created.user,
        }
    }
}

/// One checkout attempt.
pub struct CheckoutSession {
    id: CheckoutId,
    deps: CheckoutDeps,
    buyer: BuyerAccount,
    cart: CartSnapshot,
    contact: ContactInfo,
    state: SessionState,
    generation: u64,
    quote: Option<ResolvedQuote>,
    capture: Option<CaptureReceipt>,
    order: Option<Order>,
    last_error: Option<String>,
    reconciliation_reference: Option<String>,
}

impl fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

impl CheckoutSession {
    /// Open a session with contact details prefilled from the account.
    pub fn new(deps: CheckoutDeps, buyer: BuyerAccount, cart: CartSnapshot) -> Self {
        let contact = ContactInfo::new(
            buyer.first_name.clone(),
            buyer.last_name.clone(),
            buyer.phone.clone(),
            buyer.addresses.first().cloned().unwrap_or_default(),
        );
        Self {
            id: CheckoutId::generate(),
            deps,
            buyer,
            cart,
            contact,
            state: SessionState::Initializing,
            generation: 0,
            quote: None,
            capture: None,
            order: None,
            last_error: None,
            reconciliation_reference: None,
        }
    }

    pub fn id(&self) -> &CheckoutId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buyer(&self) -> &BuyerAccount {
        &self.buyer
    }

    pub fn cart(&self) -> &CartSnapshot {
        &self.cart
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.deps.config
    }

    /// The current quote, if the latest generation has resolved.
    pub fn quote(&self) -> Option<&ResolvedQuote> {
        self.quote.as_ref()
    }

    pub fn capture(&self) -> Option<&CaptureReceipt> {
        self.capture.as_ref()
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Payment reference for a paid checkout that has no order.
    pub fn reconciliation_reference(&self) -> Option<&str> {
        self.reconciliation_reference.as_deref()
    }

    /// Start a new quote generation, invalidating any in flight.
    pub fn begin_requote(&mut self) -> Result<QuoteTicket, CommitError> {
        self.ensure_editable("requote")?;
        self.generation += 1;
        self.state = SessionState::Initializing;
        self.quote = None;
        debug!(checkout = %self.id, generation = self.generation, "requote started");
        Ok(QuoteTicket {
            generation: self.generation,
            deps: self.deps.clone(),
            cart: self.cart.clone(),
            buyer_id: self.buyer.id().clone(),
            destination_address: self.contact.address.clone(),
        })
    }

    /// Install a resolved quote unless a newer generation has started.
    pub fn apply_quote(&mut self, outcome: QuoteOutcome) -> QuoteApplied {
        if outcome.generation != self.generation || self.state != SessionState::Initializing {
            debug!(
                checkout = %self.id,
                stale = outcome.generation,
                current = self.generation,
                "dropping stale quote"
            );
            return QuoteApplied::Stale;
        }

        match outcome.result {
            Ok(resolved) => {
                if resolved.is_degraded() {
                    warn!(checkout = %self.id, degraded = ?resolved.degraded, "quote uses fallback inputs");
                }
                debug!(checkout = %self.id, amount_from_user = %resolved.quote.amount_from_user, "quote applied");
                self.quote = Some(resolved);
                self.last_error = None;
                self.state = SessionState::Quoted;
            }
            Err(e) => {
                warn!(checkout = %self.id, error = %e, "quote failed");
                self.last_error = Some(e.to_string());
                self.state = SessionState::Failed { recoverable: true };
            }
        }
        QuoteApplied::Applied
    }

    /// Requote and wait for the result.
    pub async fn refresh(&mut self) -> Result<QuoteApplied, CommitError> {
        let ticket = self.begin_requote()?;
        let outcome = ticket.resolve().await;
        Ok(self.apply_quote(outcome))
    }

    /// Change the delivery address.
    pub fn set_address(&mut self, address: impl Into<String>) -> Result<QuoteTicket, CommitError> {
        self.edit_contact(|c| c.address = address.into())
    }

    /// Edit receiver details.
    pub fn edit_contact<F>(&mut self, edit: F) -> Result<QuoteTicket, CommitError>
    where
        F: FnOnce(&mut ContactInfo),
    {
        self.ensure_editable("edit contact")?;
        edit(&mut self.contact);
        self.begin_requote()
    }

    /// Reset the receiver name to the account's.
    pub fn use_registered_name(&mut self) -> Result<QuoteTicket, CommitError> {
        let (first, last) = (self.buyer.first_name.clone(), self.buyer.last_name.clone());
        self.edit_contact(|c| {
            c.first_name = first;
            c.last_name = last;
        })
    }

    /// Reset the receiver phone to the account's.
    pub fn use_registered_phone(&mut self) -> Result<QuoteTicket, CommitError> {
        let phone = self.buyer.phone.clone();
        self.edit_contact(|c| c.phone = phone)
    }

    /// Replace the cart contents.
    pub fn set_items(&mut self, items: Vec<LineItem>) -> Result<QuoteTicket, CommitError> {
        self.ensure_editable("edit cart")?;
        self.cart.items = items;
        self.begin_requote()
    }

    /// Leave a recoverable failure and quote again.
    pub fn retry(&mut self) -> Result<QuoteTicket, CommitError> {
        match self.state {
            SessionState::Failed { recoverable: true } => {
                self.last_error = None;
                self.begin_requote()
            }
            state => Err(CommitError::InvalidState {
                state,
                action: "retry",
            }),
        }
    }

    /// Check everything that gates submission.
    pub fn validate(&self) -> CheckoutValidation {
        let mut missing = Vec::new();
        if self.cart.id.is_empty() {
            missing.push(RequiredField::CartId);
        }

        let (quote_ready, degraded) = match &self.quote {
            Some(resolved) => {
                let q = &resolved.quote;
                if resolved.commission.as_ref().map_or(true, |c| c.id.is_empty()) {
                    missing.push(RequiredField::CommissionId);
                }
                if !resolved.shipping.is_chargeable() || q.shipping_fee_before_discount <= Decimal::ZERO {
                    missing.push(RequiredField::ShippingFee);
                }
                if q.amount_from_user <= Decimal::ZERO {
                    missing.push(RequiredField::AmountFromUser);
                }
                if q.amount_from_store < Decimal::ZERO {
                    missing.push(RequiredField::AmountFromStore);
                }
                if q.amount_to_store <= Decimal::ZERO {
                    missing.push(RequiredField::AmountToStore);
                }
                // May be negative, but must close the split exactly.
                if q.amount_to_zenpii != q.amount_from_user - q.amount_to_store {
                    missing.push(RequiredField::AmountToZenpii);
                }
                (true, resolved.degraded.clone())
            }
            None => (false, Vec::new()),
        };

        CheckoutValidation {
            contact: self.contact.validate(),
            quote_ready,
            missing,
            degraded,
        }
    }

    /// Leave `Quoted` for `Submitting`, freezing the order body.
    pub(crate) fn begin_submit(&mut self, method: PaymentMethod) -> Result<Submission, CommitError> {
        match self.state {
            SessionState::Quoted => {}
            SessionState::Initializing => return Err(CommitError::QuoteNotReady),
            state => {
                return Err(CommitError::InvalidState {
                    state,
                    action: "submit",
                })
            }
        }
        if self.capture.is_some() {
            return Err(CommitError::InvalidState {
                state: self.state,
                action: "submit after capture",
            });
        }

        let validation = self.validate();
        if !validation.is_ready() {
            return Err(CommitError::Validation(validation));
        }
        let resolved = self.quote.as_ref().ok_or(CommitError::QuoteNotReady)?;
        let commission = resolved
            .commission
            .as_ref()
            .ok_or(CommitError::QuoteNotReady)?;

        resolved.quote.verify_balanced().map_err(CommitError::Inconsistent)?;
        let body = OrderBody::from_quote(
            &self.contact,
            commission.id.clone(),
            &resolved.quote,
            method.is_paid_before(),
            self.id.clone(),
        );
        body.verify_balanced().map_err(CommitError::Inconsistent)?;

        if body.amount_to_zenpii < Decimal::ZERO {
            warn!(
                checkout = %self.id,
                amount_to_zenpii = %body.amount_to_zenpii,
                "platform nets a loss on this order"
            );
        }

        self.state = SessionState::Submitting;
        info!(checkout = %self.id, method = method.as_str(), amount = %body.amount_from_user, "submitting order");
        Ok(Submission {
            checkout_id: self.id.clone(),
            auth: self.buyer.auth.clone(),
            cart_id: self.cart.id.clone(),
            store_id: self.cart.store_id.clone(),
            contact: self.contact.clone(),
            commission_id: commission.id.clone(),
            quote: resolved.quote,
            method,
            body,
        })
    }

    /// Fold a gateway return into a session still held in this process.
    pub fn finish_redirect(&mut self, result: &Result<Order, CommitError>) {
        if self.state != SessionState::Submitting {
            return;
        }
        match result {
            Ok(order) => self.mark_committed(order.clone()),
            Err(e @ CommitError::PostPayment { reference, .. }) => {
                self.mark_paid_without_order(reference.clone(), e.to_string())
            }
            Err(e @ CommitError::AmountMismatch { .. }) => {
                self.mark_paid_without_order(self.id.to_string(), e.to_string())
            }
            // Another return owns the order; stay submitted.
            Err(CommitError::RedirectInProgress(_) | CommitError::AlreadyCompleted { .. }) => {}
            Err(e) => self.abort_submission(e.to_string()),
        }
    }

    /// A commit step failed before any money moved.
    pub(crate) fn abort_submission(&mut self, reason: String) {
        self.last_error = Some(reason);
        self.state = SessionState::Quoted;
    }

    pub(crate) fn record_capture(&mut self, receipt: CaptureReceipt) {
        self.capture = Some(receipt);
    }

    pub(crate) fn mark_committed(&mut self, order: Order) {
        info!(checkout = %self.id, order = %order.id, "order committed");
        self.order = Some(order);
        self.last_error = None;
        self.state = SessionState::Committed;
    }

    /// Money was taken and no order exists.
    pub(crate) fn mark_paid_without_order(&mut self, reference: String, reason: String) {
        self.reconciliation_reference = Some(reference);
        self.last_error = Some(reason);
        self.state = SessionState::Failed { recoverable: false };
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), CommitError> {
        match self.state {
            SessionState::Initializing
            | SessionState::Quoted
            | SessionState::Failed { recoverable: true } => Ok(()),
            state => Err(CommitError::InvalidState { state, action }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CarrierApi;
    use crate::shipping::{FeeRequest, LocationCode};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct Market {
        commission_fee: Decimal,
    }

    #[async_trait]
    impl MarketplaceApi for Market {
        async fn store_level(&self, _: &StoreId) -> Result<Option<Level>, ApiError> {
            Ok(Some(Level::new(0, dec!(3)).unwrap()))
        }
        async fn buyer_level(&self, _: &UserId) -> Result<Option<Level>, ApiError> {
            Ok(Some(Level::new(0, dec!(10)).unwrap()))
        }
        async fn commission_by_store(&self, s: &StoreId) -> Result<Option<CommissionRate>, ApiError> {
            Ok(Some(
                CommissionRate::new("comm1", s.as_str(), self.commission_fee).unwrap(),
            ))
        }
        async fn resolve_location(&self, _: &str) -> Result<Option<LocationCode>, ApiError> {
            Ok(Some(LocationCode::new(1442, Some("20109".into()))))
        }
        async fn create_order(
            &self,
            _: &BuyerAuth,
            _: &CartId,
            _: &OrderBody,
        ) -> Result<CreatedOrder, ApiError> {
            Err(ApiError::Server("not used".into()))
        }
    }

    struct Carrier;

    #[async_trait]
    impl CarrierApi for Carrier {
        async fn available_services(&self, _: u32, _: u32) -> Result<Vec<u32>, ApiError> {
            Ok(vec![53320])
        }
        async fn quote_fee(&self, _: &FeeRequest) -> Result<Decimal, ApiError> {
            Ok(dec!(30000))
        }
    }

    fn session(commission_fee: Decimal) -> CheckoutSession {
        let config = CheckoutConfig::default();
        let deps = CheckoutDeps::new(
            Arc::new(Market { commission_fee }),
            ShippingQuoter::new(Arc::new(Carrier), config.shipping.clone()),
            config,
        );
        let buyer = BuyerAccount {
            auth: BuyerAuth {
                buyer_id: UserId::new("u1"),
                access_token: "t".into(),
            },
            first_name: "An".into(),
            last_name: "Tran".into(),
            phone: "0981234567".into(),
            addresses: vec!["1 Le Loi, Q1".into()],
        };
        let cart = CartSnapshot {
            id: CartId::new("cart1"),
            store_id: StoreId::new("s1"),
            store_address: "2 Hai Ba Trung".into(),
            items: vec![
                LineItem::new("x", dec!(100000), dec!(90000), 2, "s1").unwrap(),
                LineItem::new("y", dec!(50000), dec!(50000), 1, "s1").unwrap(),
            ],
        };
        CheckoutSession::new(deps, buyer, cart)
    }

    #[tokio::test]
    async fn test_refresh_quotes_session() {
        let mut s = session(dec!(10));
        assert_eq!(s.state(), SessionState::Initializing);
        assert_eq!(s.refresh().await.unwrap(), QuoteApplied::Applied);
        assert_eq!(s.state(), SessionState::Quoted);

        let q = s.quote().unwrap().quote;
        assert_eq!(q.amount_from_user, dec!(234000));
        assert_eq!(q.amount_to_zenpii, dec!(20100));
        assert!(s.validate().is_ready());
    }

    #[tokio::test]
    async fn test_edit_returns_to_initializing() {
        let mut s = session(dec!(10));
        s.refresh().await.unwrap();
        let ticket = s.set_address("9 Nguyen Hue").unwrap();
        assert_eq!(s.state(), SessionState::Initializing);
        assert!(s.quote().is_none());
        assert_eq!(ticket.generation(), s.generation());
    }

    #[tokio::test]
    async fn test_stale_ticket_dropped() {
        let mut s = session(dec!(10));
        let old = s.begin_requote().unwrap();
        let new = s.set_address("9 Nguyen Hue").unwrap();

        let new_outcome = new.resolve().await;
        let old_outcome = old.resolve().await;
        assert_eq!(s.apply_quote(new_outcome), QuoteApplied::Applied);
        assert_eq!(s.apply_quote(old_outcome), QuoteApplied::Stale);
        assert_eq!(s.quote().unwrap().destination_address, "9 Nguyen Hue");
    }

    #[tokio::test]
    async fn test_negative_commission_fails_recoverably() {
        let mut s = session(dec!(1));
        s.refresh().await.unwrap();
        assert_eq!(s.state(), SessionState::Failed { recoverable: true });
        assert!(s.last_error().unwrap().contains("Negative effective commission"));
        assert!(s.retry().is_ok());
        assert_eq!(s.state(), SessionState::Initializing);
    }

    #[tokio::test]
    async fn test_invalid_contact_blocks_submit() {
        let mut s = session(dec!(10));
        let ticket = s.edit_contact(|c| c.phone = "12".into()).unwrap();
        let outcome = ticket.resolve().await;
        s.apply_quote(outcome);

        let err = s.begin_submit(PaymentMethod::CashOnDelivery).unwrap_err();
        match err {
            CommitError::Validation(v) => {
                assert!(!v.contact.phone);
                assert!(v.contact.first_name);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.state(), SessionState::Quoted);

        s.use_registered_phone().unwrap();
        assert_eq!(s.contact().phone, "0981234567");
    }

    #[tokio::test]
    async fn test_unbalanced_platform_amount_blocks_submit() {
        let mut s = session(dec!(10));
        s.refresh().await.unwrap();
        if let Some(resolved) = s.quote.as_mut() {
            resolved.quote.amount_to_zenpii += dec!(1);
        }

        let validation = s.validate();
        assert_eq!(validation.missing, vec![RequiredField::AmountToZenpii]);
        assert!(!validation.is_ready());
        assert!(matches!(
            s.begin_submit(PaymentMethod::CashOnDelivery),
            Err(CommitError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_before_quote() {
        let mut s = session(dec!(10));
        assert!(matches!(
            s.begin_submit(PaymentMethod::CashOnDelivery),
            Err(CommitError::QuoteNotReady)
        ));
    }

    #[tokio::test]
    async fn test_mixed_store_cart_fails() {
        let mut s = session(dec!(10));
        let items = vec![LineItem::new("z", dec!(1), dec!(1), 1, "other").unwrap()];
        let ticket = s.set_items(items).unwrap();
        let outcome = ticket.resolve().await;
        assert!(matches!(outcome.result, Err(CommerceError::MixedStores { .. })));
    }
}
