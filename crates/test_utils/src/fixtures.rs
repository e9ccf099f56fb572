//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities across the
//! receivables engine. These fixtures are designed to be consistent and
//! predictable for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, CustomerId, InvoiceId, Money, PaymentId};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a standard INR amount for testing
    pub fn inr_100() -> Money {
        Money::new(dec!(100.00), Currency::INR)
    }

    /// Creates a typical invoice-sized amount
    pub fn inr_invoice_total() -> Money {
        Money::new(dec!(2360.00), Currency::INR)
    }

    /// Creates a partial payment amount
    pub fn inr_partial_payment() -> Money {
        Money::new(dec!(1000.00), Currency::INR)
    }

    /// Creates a zero amount
    pub fn inr_zero() -> Money {
        Money::zero(Currency::INR)
    }

    /// Creates a USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard invoice date (Apr 1, 2025 — Indian fiscal year start)
    pub fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    /// Due date thirty days after the standard invoice date
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    /// A "today" before the due date
    pub fn before_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()
    }

    /// A "today" after the due date
    pub fn after_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()
    }

    /// Standard payment receipt timestamp
    pub fn payment_received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 20, 10, 30, 0).unwrap()
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    /// A well-formed invoice number
    pub fn invoice_number() -> &'static str {
        "INV-2025-00042"
    }

    /// A well-formed bank reference
    pub fn bank_reference() -> &'static str {
        "UTR-20250420-001"
    }

    /// An HSN code for electronics
    pub fn hsn_code() -> &'static str {
        "8517"
    }

    /// Maharashtra state code
    pub fn state_maharashtra() -> &'static str {
        "27"
    }

    /// Karnataka state code
    pub fn state_karnataka() -> &'static str {
        "29"
    }
}

impl StringFixtures {
    /// A random company name for customer records
    pub fn random_company_name() -> String {
        use fake::faker::company::en::CompanyName;
        use fake::Fake;
        CompanyName().fake()
    }

    /// A random product description
    pub fn random_product_description() -> String {
        use fake::faker::lorem::en::Words;
        use fake::Fake;
        let words: Vec<String> = Words(2..5).fake();
        words.join(" ")
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a fresh customer id
    pub fn customer_id() -> CustomerId {
        CustomerId::new()
    }

    /// Creates a fresh invoice id
    pub fn invoice_id() -> InvoiceId {
        InvoiceId::new()
    }

    /// Creates a fresh payment id
    pub fn payment_id() -> PaymentId {
        PaymentId::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_dates_are_ordered() {
        assert!(TemporalFixtures::invoice_date() < TemporalFixtures::due_date());
        assert!(TemporalFixtures::before_due() < TemporalFixtures::due_date());
        assert!(TemporalFixtures::after_due() > TemporalFixtures::due_date());
    }

    #[test]
    fn money_fixtures_use_inr() {
        assert_eq!(MoneyFixtures::inr_100().currency(), Currency::INR);
        assert!(MoneyFixtures::inr_zero().is_zero());
    }
}
