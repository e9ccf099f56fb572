//! Tests for kernel money utilities

use core_kernel::{parse_amount, round_money, round_qty, Currency, Money, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_round_money_half_up_at_boundary() {
    // Half-up, not banker's rounding: .005 goes up, .015 goes up
    assert_eq!(round_money(dec!(0.005)), dec!(0.01));
    assert_eq!(round_money(dec!(0.015)), dec!(0.02));
    assert_eq!(round_money(dec!(0.025)), dec!(0.03));
}

#[test]
fn test_round_money_negative_values() {
    assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    assert_eq!(round_money(dec!(-1.004)), dec!(-1.00));
}

#[test]
fn test_round_qty_three_decimals() {
    assert_eq!(round_qty(dec!(0.1234)), dec!(0.123));
    assert_eq!(round_qty(dec!(0.1235)), dec!(0.124));
}

#[test]
fn test_parse_amount_variants() {
    assert_eq!(parse_amount("1000").unwrap(), dec!(1000));
    assert_eq!(parse_amount("1000.505").unwrap(), dec!(1000.505));
    assert_eq!(parse_amount("-3.2").unwrap(), dec!(-3.2));
    assert!(parse_amount("").is_err());
    assert!(parse_amount("12,000").is_err());
}

#[test]
fn test_money_parse_and_display() {
    let m = Money::parse("2360.00", Currency::INR).unwrap();
    assert_eq!(m.amount(), dec!(2360.00));
    assert_eq!(m.to_string(), "₹ 2360.00");
}

#[test]
fn test_money_arithmetic_full_precision() {
    let a = Money::new(dec!(0.105), Currency::INR);
    let b = Money::new(dec!(0.105), Currency::INR);
    let sum = a.checked_add(&b).unwrap();
    // Intermediate sum is exact; rounding happens only when asked for
    assert_eq!(sum.amount(), dec!(0.210));
    assert_eq!(sum.rounded().amount(), dec!(0.21));
}

#[test]
fn test_currency_from_str() {
    assert_eq!("inr".parse::<Currency>().unwrap(), Currency::INR);
    assert!(matches!(
        "XYZ".parse::<Currency>(),
        Err(MoneyError::UnknownCurrency(_))
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rounding_is_idempotent(mantissa in -1_000_000_000i64..1_000_000_000i64, scale in 0u32..6u32) {
            let value = Decimal::new(mantissa, scale);
            let once = round_money(value);
            prop_assert_eq!(once, round_money(once));
        }

        #[test]
        fn rounded_value_within_half_cent(mantissa in -1_000_000_000i64..1_000_000_000i64, scale in 0u32..6u32) {
            let value = Decimal::new(mantissa, scale);
            let diff = (round_money(value) - value).abs();
            prop_assert!(diff <= dec!(0.005));
        }
    }
}
