//! Order bodies and committed orders.

use crate::checkout::ContactInfo;
use crate::ids::{CartId, CheckoutId, CommissionId, OrderId, StoreId, UserId};
use crate::settlement::OrderQuote;
use crate::CommerceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    CashOnDelivery,
    /// Hosted card/wallet capture.
    HostedCapture,
    /// Redirect to an external bank gateway.
    RedirectGateway,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cod",
            PaymentMethod::HostedCapture => "hosted_capture",
            PaymentMethod::RedirectGateway => "redirect_gateway",
        }
    }

    /// Whether the buyer pays before the order exists.
    pub fn is_paid_before(&self) -> bool {
        !matches!(self, PaymentMethod::CashOnDelivery)
    }
}

/// Credentials for the order-creation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerAuth {
    pub buyer_id: UserId,
    pub access_token: String,
}

/// The body sent to `createOrder`, in the server's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    /// Shipping fee after the buyer level discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_fee: Decimal,
    pub commission_id: CommissionId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_from_user: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_from_store: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_to_store: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_to_zenpii: Decimal,
    pub is_paid_before: bool,
    /// Ties retries of the same checkout to a single order.
    pub idempotency_key: CheckoutId,
}

impl OrderBody {
    /// Build a body from a contact and a quote.
    pub fn from_quote(
        contact: &ContactInfo,
        commission_id: CommissionId,
        quote: &OrderQuote,
        is_paid_before: bool,
        idempotency_key: CheckoutId,
    ) -> Self {
        Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            shipping_fee: quote.shipping_fee_after_discount,
            commission_id,
            amount_from_user: quote.amount_from_user,
            amount_from_store: quote.amount_from_store,
            amount_to_store: quote.amount_to_store,
            amount_to_zenpii: quote.amount_to_zenpii,
            is_paid_before,
            idempotency_key,
        }
    }

    /// Re-check the split on the exact values about to be sent.
    pub fn verify_balanced(&self) -> Result<(), CommerceError> {
        if self.amount_from_user != self.amount_to_store + self.amount_to_zenpii {
            return Err(CommerceError::UnbalancedSettlement {
                from_user: self.amount_from_user,
                to_store: self.amount_to_store,
                to_platform: self.amount_to_zenpii,
            });
        }
        Ok(())
    }
}

/// What the server returns after creating an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    /// Refreshed buyer account payload, passed through untouched.
    pub user: Option<serde_json::Value>,
}

/// A committed order as the engine saw it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub buyer_id: UserId,
    pub contact: ContactInfo,
    pub commission_id: CommissionId,
    /// Snapshot of the quote the buyer accepted.
    pub quote: OrderQuote,
    pub payment_method: PaymentMethod,
    pub is_paid_before: bool,
    pub idempotency_key: CheckoutId,
    /// Refreshed buyer account payload from the server.
    pub user: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn quote() -> OrderQuote {
        crate::settlement::settle(
            &[crate::settlement::LineItem::new("x", dec!(100), dec!(100), 1, "s").unwrap()],
            None,
            None,
            None,
            dec!(10),
            Currency::VND,
        )
    }

    #[test]
    fn test_wire_format() {
        let body = OrderBody::from_quote(
            &ContactInfo::new("An", "Tran", "0981234567", "1 Le Loi"),
            CommissionId::new("c1"),
            &quote(),
            false,
            CheckoutId::new("chk_1"),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["firstName"], "An");
        assert_eq!(json["commissionId"], "c1");
        assert_eq!(json["amountFromUser"], 110.0);
        assert_eq!(json["shippingFee"], 10.0);
        assert_eq!(json["isPaidBefore"], false);
        assert_eq!(json["idempotencyKey"], "chk_1");
    }

    #[test]
    fn test_payment_method_flags() {
        assert!(!PaymentMethod::CashOnDelivery.is_paid_before());
        assert!(PaymentMethod::HostedCapture.is_paid_before());
        assert!(PaymentMethod::RedirectGateway.is_paid_before());
    }
}
