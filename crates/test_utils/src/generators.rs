//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::{Currency, Money};
use domain_receivables::GstRegime;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating valid Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::INR),
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::AED),
        Just(Currency::SGD),
    ]
}

/// Strategy for generating a GST regime
pub fn regime_strategy() -> impl Strategy<Value = GstRegime> {
    prop_oneof![Just(GstRegime::IntraState), Just(GstRegime::InterState)]
}

/// Strategy for generating valid positive amounts in paise
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for generating positive 2dp amounts
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    positive_amount_minor_strategy().prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating positive INR Money values
pub fn inr_money_strategy() -> impl Strategy<Value = Money> {
    amount_strategy().prop_map(|amount| Money::new(amount, Currency::INR))
}

/// Strategy for generating valid GST rate percentages (0.00 to 100.00)
pub fn gst_rate_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for generating the GST slab rates actually used in practice
pub fn gst_slab_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::ZERO),
        Just(Decimal::from(5)),
        Just(Decimal::from(12)),
        Just(Decimal::from(18)),
        Just(Decimal::from(28)),
    ]
}

/// Strategy for generating 3dp quantities
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 3))
}

/// Strategy for generating valid state codes
pub fn state_code_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("27"), // Maharashtra
        Just("29"), // Karnataka
        Just("33"), // Tamil Nadu
        Just("07"), // Delhi
        Just("24"), // Gujarat
        Just("09"), // Uttar Pradesh
    ]
}
