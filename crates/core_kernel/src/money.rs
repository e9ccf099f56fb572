//! Money types with precise decimal arithmetic
//!
//! All monetary values are `rust_decimal::Decimal`s, never binary floats.
//! Arithmetic runs at full precision; rounding happens only at the edges,
//! with round-half-up to 2 decimal places for money and 3 for quantities.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
    AED,
    SGD,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::AED => "AED",
            Currency::SGD => "S$",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::SGD => "SGD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AED" => Ok(Currency::AED),
            "SGD" => Ok(Currency::SGD),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Rounds a monetary value to exactly 2 decimal places, half-up
///
/// This is the rounding applied at every persistence/output boundary.
/// Intermediate arithmetic stays at full precision.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a quantity to 3 decimal places, half-up
pub fn round_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a string into a decimal amount
///
/// # Errors
///
/// Returns `MoneyError::InvalidAmount` if the input is not a valid decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, MoneyError> {
    Decimal::from_str(input.trim())
        .map_err(|_| MoneyError::InvalidAmount(input.to_string()))
}

/// Converts an f64 into a decimal amount
///
/// Floats never carry money through the engine; this exists only for
/// ingesting external inputs that arrive as floating point.
///
/// # Errors
///
/// Returns `MoneyError::InvalidAmount` for NaN or infinite inputs.
pub fn amount_from_f64(value: f64) -> Result<Decimal, MoneyError> {
    Decimal::try_from(value).map_err(|_| MoneyError::InvalidAmount(value.to_string()))
}

/// A monetary amount with associated currency
///
/// `Money` keeps the full decimal precision of its amount; callers round
/// via [`Money::rounded`] (or [`round_money`]) when persisting or
/// displaying, matching how the totals engine rounds at the edges only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value at full precision
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Parses a string amount into Money
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` on unparsable input.
    pub fn parse(input: &str, currency: Currency) -> Result<Self, MoneyError> {
        Ok(Self::new(parse_amount(input)?, currency))
    }

    /// Creates Money from whole currency units
    pub fn from_major(units: i64, currency: Currency) -> Self {
        Self::new(Decimal::from(units), currency)
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns this value rounded to 2 decimal places, half-up
    pub fn rounded(&self) -> Self {
        Self {
            amount: round_money(self.amount),
            currency: self.currency,
        }
    }

    /// Checked addition that fails on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that fails on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Multiplies by a scalar (e.g. a quantity or a rate factor)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Clamps this value to an upper bound in the same currency
    ///
    /// Used by payment application: `paid_amount` never exceeds
    /// `grand_total`.
    pub fn clamp_max(&self, max: &Money) -> Result<Money, MoneyError> {
        if self.currency != max.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                max.currency.to_string(),
            ));
        }
        if self.amount > max.amount {
            Ok(*max)
        } else {
            Ok(*self)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency.symbol(), self.amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other)
            .expect("Currency mismatch in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other)
            .expect("Currency mismatch in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_money_is_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn round_qty_is_three_places() {
        assert_eq!(round_qty(dec!(1.0005)), dec!(1.001));
        assert_eq!(round_qty(dec!(2.5)), dec!(2.500));
    }

    #[test]
    fn parse_amount_accepts_decimal_strings() {
        assert_eq!(parse_amount("100.50").unwrap(), dec!(100.50));
        assert_eq!(parse_amount(" 42 ").unwrap(), dec!(42));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(matches!(
            parse_amount("not-a-number"),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn f64_conversion_rejects_non_finite() {
        assert_eq!(amount_from_f64(99.5).unwrap(), dec!(99.5));
        assert!(amount_from_f64(f64::NAN).is_err());
        assert!(amount_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn from_major_is_whole_units() {
        let m = Money::from_major(2360, Currency::INR);
        assert_eq!(m.amount(), dec!(2360));
    }

    #[test]
    fn money_keeps_full_precision_until_rounded() {
        let m = Money::new(dec!(10.12345), Currency::INR);
        assert_eq!(m.amount(), dec!(10.12345));
        assert_eq!(m.rounded().amount(), dec!(10.12));
    }

    #[test]
    fn currency_mismatch_is_an_error() {
        let inr = Money::new(dec!(100), Currency::INR);
        let usd = Money::new(dec!(100), Currency::USD);
        assert!(matches!(
            inr.checked_add(&usd),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn clamp_max_caps_overpayment() {
        let paid = Money::new(dec!(2500), Currency::INR);
        let total = Money::new(dec!(2360), Currency::INR);
        assert_eq!(paid.clamp_max(&total).unwrap(), total);

        let under = Money::new(dec!(1000), Currency::INR);
        assert_eq!(under.clamp_max(&total).unwrap(), under);
    }
}
