//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_receivables::{Invoice, PaymentStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more
/// than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={:?}, expected={:?}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().code(),
        money.amount()
    );
}

/// Asserts that an invoice's derived totals are internally consistent
///
/// Checks the aggregation identities: total_tax is the component sum,
/// grand_total = subtotal + total_tax, balance = grand_total - paid.
///
/// # Panics
///
/// Panics with a description of the first identity that fails
pub fn assert_invoice_consistent(invoice: &Invoice) {
    let component_sum = invoice.cgst_amount.amount()
        + invoice.sgst_amount.amount()
        + invoice.igst_amount.amount();
    assert_eq!(
        invoice.total_tax.amount(),
        component_sum,
        "total_tax {} does not equal component sum {}",
        invoice.total_tax.amount(),
        component_sum
    );

    assert_eq!(
        invoice.grand_total.amount(),
        invoice.subtotal.amount() + invoice.total_tax.amount(),
        "grand_total is not subtotal + total_tax"
    );

    assert_eq!(
        invoice.balance_amount.amount(),
        invoice.grand_total.amount() - invoice.paid_amount.amount(),
        "balance is not grand_total - paid_amount"
    );

    assert!(
        invoice.paid_amount.amount() <= invoice.grand_total.amount(),
        "paid_amount {} exceeds grand_total {}",
        invoice.paid_amount.amount(),
        invoice.grand_total.amount()
    );
}

/// Asserts that an invoice carries the expected payment status
pub fn assert_payment_status(invoice: &Invoice, expected: PaymentStatus) {
    assert_eq!(
        invoice.payment_status, expected,
        "Invoice {} has payment status {:?}, expected {:?} (paid {} of {})",
        invoice.invoice_number,
        invoice.payment_status,
        expected,
        invoice.paid_amount.amount(),
        invoice.grand_total.amount()
    );
}
