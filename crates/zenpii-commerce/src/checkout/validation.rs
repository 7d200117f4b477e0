//! Submission gate.

use super::contact::ContactValidity;
use super::session::QuoteInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An order field that is missing or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequiredField {
    CartId,
    CommissionId,
    ShippingFee,
    AmountFromUser,
    AmountFromStore,
    AmountToStore,
    AmountToZenpii,
}

impl RequiredField {
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::CartId => "cart",
            RequiredField::CommissionId => "commission",
            RequiredField::ShippingFee => "shipping fee",
            RequiredField::AmountFromUser => "amount from buyer",
            RequiredField::AmountFromStore => "amount from store",
            RequiredField::AmountToStore => "amount to store",
            RequiredField::AmountToZenpii => "amount to platform",
        }
    }
}

/// Everything that blocks submission, reported per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutValidation {
    pub contact: ContactValidity,
    /// False while a quote is still being computed.
    pub quote_ready: bool,
    pub missing: Vec<RequiredField>,
    /// Quote inputs showing fallback values.
    pub degraded: Vec<QuoteInput>,
}

impl CheckoutValidation {
    pub fn is_ready(&self) -> bool {
        self.contact.all_valid()
            && self.quote_ready
            && self.missing.is_empty()
            && self.degraded.is_empty()
    }
}

impl fmt::Display for CheckoutValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut problems = Vec::new();
        let c = &self.contact;
        for (ok, name) in [
            (c.first_name, "first name"),
            (c.last_name, "last name"),
            (c.phone, "phone"),
            (c.address, "address"),
        ] {
            if !ok {
                problems.push(format!("invalid {}", name));
            }
        }
        if !self.quote_ready {
            problems.push("quote pending".to_string());
        }
        problems.extend(self.missing.iter().map(|m| format!("missing {}", m.label())));
        problems.extend(self.degraded.iter().map(|d| format!("{} unavailable", d.label())));

        if problems.is_empty() {
            write!(f, "ready")
        } else {
            write!(f, "{}", problems.join(", "))
        }
    }
}
