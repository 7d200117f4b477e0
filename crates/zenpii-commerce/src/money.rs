//! Money and decimal utilities.
//!
//! Amounts are exact decimals. The marketplace server stores prices as
//! decimal wrappers (`{"$numberDecimal": "90000"}`) which are parsed here
//! without ever failing: malformed or missing values read as zero.

use crate::CommerceError;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// Vietnamese dong, the storefront's pricing currency.
    #[default]
    VND,
    /// US dollar, the hosted card/wallet settlement currency.
    USD,
    EUR,
}

impl Currency {
    /// Get the currency code (e.g., "VND").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::VND => "VND",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }

    /// Get the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::VND => "\u{20ab}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::VND => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "VND" => Some(Currency::VND),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Exact amount in major units.
    pub amount: Decimal,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value.
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Round to the currency's minor unit.
    pub fn rounded(&self) -> Self {
        Self::new(
            self.amount.round_dp_with_strategy(
                self.currency.decimal_places(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            self.currency,
        )
    }

    /// Add another Money value of the same currency.
    pub fn try_add(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency))
    }

    /// Subtract another Money value of the same currency.
    pub fn try_subtract(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    /// Convert into another currency at `rate` units of `to` per unit of `self`.
    pub fn convert(&self, rate: Decimal, to: Currency) -> Money {
        Money::new(self.amount * rate, to).rounded()
    }

    /// Format as a display string with symbol (e.g., "234.000₫").
    pub fn display(&self) -> String {
        format!("{}{}", format_for_display(self.amount), self.currency.symbol())
    }

    /// Format as a display string without symbol.
    pub fn display_amount(&self) -> String {
        format_for_display(self.amount)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), CommerceError> {
        if self.currency != other.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// A decimal as the marketplace server sends it.
///
/// Accepts `{"$numberDecimal": "1.5"}`, plain JSON numbers and numeric
/// strings. Anything else, including `null`, deserializes to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ServerDecimal(pub Decimal);

impl ServerDecimal {
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for ServerDecimal {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl<'de> Deserialize<'de> for ServerDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self(parse_decimal(&value)))
    }
}

/// Parse a server-supplied decimal, degrading to zero on missing or malformed input.
pub fn parse_decimal(value: &serde_json::Value) -> Decimal {
    use serde_json::Value;

    match value {
        Value::Object(map) => map
            .get("$numberDecimal")
            .map(parse_decimal)
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => parse_decimal_str(s),
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        _ => Decimal::ZERO,
    }
}

fn parse_decimal_str(s: &str) -> Decimal {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

/// Apply a percentage discount: `amount * (100 - percent) / 100`.
///
/// A zero percent returns `amount` untouched.
pub fn apply_discount(amount: Decimal, discount_percent: Decimal) -> Decimal {
    if discount_percent.is_zero() {
        return amount;
    }
    amount * (dec!(100) - discount_percent) / dec!(100)
}

/// Percent saved between a listed price and a sale price, rounded to a whole number.
pub fn discount_percent_between(price: Decimal, sale_price: Decimal) -> Decimal {
    if price.is_zero() {
        return Decimal::ZERO;
    }
    ((price - sale_price) / price * dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with `.` thousands separators and `,` decimals.
///
/// At most three fraction digits are shown. No currency symbol.
pub fn format_for_display(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (plain, String::new()),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(&frac_part);
    }
    out
}

/// Validate a percentage lies within 0..=100.
pub fn ensure_percent(value: Decimal) -> Result<Decimal, CommerceError> {
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(CommerceError::PercentOutOfRange(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_decimal_wrapper() {
        assert_eq!(parse_decimal(&json!({"$numberDecimal": "90000"})), dec!(90000));
        assert_eq!(parse_decimal(&json!({"$numberDecimal": "12.5"})), dec!(12.5));
    }

    #[test]
    fn test_parse_decimal_plain_values() {
        assert_eq!(parse_decimal(&json!(30000)), dec!(30000));
        assert_eq!(parse_decimal(&json!("7.25")), dec!(7.25));
        assert_eq!(parse_decimal(&json!(0.5)), dec!(0.5));
    }

    #[test]
    fn test_parse_decimal_degrades_to_zero() {
        assert_eq!(parse_decimal(&json!(null)), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!({})), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!({"$numberDecimal": "abc"})), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!([1, 2])), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!(true)), Decimal::ZERO);
    }

    #[test]
    fn test_server_decimal_deserialize() {
        #[derive(Deserialize)]
        struct Level {
            discount: ServerDecimal,
            #[serde(default)]
            missing: ServerDecimal,
        }
        let level: Level =
            serde_json::from_value(json!({"discount": {"$numberDecimal": "10"}})).unwrap();
        assert_eq!(level.discount.value(), dec!(10));
        assert_eq!(level.missing.value(), Decimal::ZERO);
    }

    #[test]
    fn test_apply_discount() {
        assert_eq!(apply_discount(dec!(230000), dec!(10)), dec!(207000));
        assert_eq!(apply_discount(dec!(30000), dec!(10)), dec!(27000));
        assert_eq!(apply_discount(dec!(123.45), Decimal::ZERO), dec!(123.45));
        assert_eq!(apply_discount(dec!(5000), dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_format_for_display() {
        assert_eq!(format_for_display(dec!(234000)), "234.000");
        assert_eq!(format_for_display(dec!(1234567.5)), "1.234.567,5");
        assert_eq!(format_for_display(dec!(999)), "999");
        assert_eq!(format_for_display(dec!(0)), "0");
        assert_eq!(format_for_display(dec!(-20100)), "-20.100");
        assert_eq!(format_for_display(dec!(1.23456)), "1,235");
    }

    #[test]
    fn test_money_display() {
        let m = Money::new(dec!(234000), Currency::VND);
        assert_eq!(m.display(), "234.000\u{20ab}");
    }

    #[test]
    fn test_money_convert_rounds_to_cents() {
        let m = Money::new(dec!(234000), Currency::VND);
        let usd = m.convert(dec!(0.00004), Currency::USD);
        assert_eq!(usd.amount, dec!(9.36));
        assert_eq!(usd.currency, Currency::USD);
    }

    #[test]
    fn test_money_currency_mismatch() {
        let vnd = Money::new(dec!(1000), Currency::VND);
        let usd = Money::new(dec!(1), Currency::USD);
        assert!(matches!(
            vnd.try_add(&usd),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
        assert_eq!(vnd.try_subtract(&vnd).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn test_discount_percent_between() {
        assert_eq!(discount_percent_between(dec!(100000), dec!(90000)), dec!(10));
        assert_eq!(discount_percent_between(dec!(3), dec!(2)), dec!(33));
        assert_eq!(discount_percent_between(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("vnd"), Some(Currency::VND));
        assert_eq!(Currency::from_code("INVALID"), None);
    }
}
