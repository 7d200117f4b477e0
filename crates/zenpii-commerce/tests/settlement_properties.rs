//! Property-based tests for the settlement calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;
use zenpii_commerce::money::apply_discount;
use zenpii_commerce::settlement::{settle, CommissionRate, Level, LineItem};
use zenpii_commerce::Currency;

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000, 0u32..3).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=1000).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn item_strategy() -> impl Strategy<Value = LineItem> {
    (1i64..10_000_000, 0u32..=100, 1u32..20).prop_map(|(price, sale_pct, qty)| {
        let price = Decimal::from(price);
        let sale = price * Decimal::from(sale_pct) / Decimal::ONE_HUNDRED;
        LineItem::new("p", price, sale, qty, "s").expect("generated item is valid")
    })
}

fn level_strategy() -> impl Strategy<Value = Option<Level>> {
    proptest::option::of(percent_strategy().prop_map(|d| Level::new(0, d).expect("valid percent")))
}

// Property: the buyer's payment always splits exactly
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn split_always_balances(
        items in proptest::collection::vec(item_strategy(), 0..6),
        buyer in level_strategy(),
        store in level_strategy(),
        fee in proptest::option::of(percent_strategy()),
        shipping in amount_strategy(),
    ) {
        let commission = fee.map(|f| CommissionRate::new("c", "s", f).expect("valid percent"));
        let q = settle(&items, buyer.as_ref(), store.as_ref(), commission.as_ref(), shipping, Currency::VND);

        prop_assert_eq!(q.amount_from_user, q.amount_to_store + q.amount_to_zenpii);
        prop_assert!(q.verify_balanced().is_ok());
        prop_assert_eq!(q.amount_to_store + q.amount_from_store, q.total_sale_price);
    }
}

// Property: discount identities
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn zero_discount_is_identity(x in amount_strategy()) {
        let out = apply_discount(x, Decimal::ZERO);
        prop_assert_eq!(out, x);
        prop_assert_eq!(out.scale(), x.scale());
    }

    #[test]
    fn full_discount_is_zero(x in amount_strategy()) {
        prop_assert_eq!(apply_discount(x, Decimal::ONE_HUNDRED), Decimal::ZERO);
    }

    #[test]
    fn larger_discount_never_costs_more(
        x in amount_strategy(),
        a in percent_strategy(),
        b in percent_strategy(),
    ) {
        let (d1, d2) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(apply_discount(x, d1) >= apply_discount(x, d2));
    }
}
