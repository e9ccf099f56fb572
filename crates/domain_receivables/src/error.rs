//! Receivables domain errors

use core_kernel::{InvoiceId, MoneyError, PaymentId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the receivables domain
#[derive(Debug, Error)]
pub enum ReceivablesError {
    /// A monetary or quantity input could not be parsed or is out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// GST rate outside the 0-100 percent range
    #[error("Invalid GST rate: {0} (must be between 0 and 100)")]
    InvalidRate(Decimal),

    /// Second allocation row attempted for an existing (payment, invoice) pair
    #[error("Allocation already exists for payment {payment_id} and invoice {invoice_id}")]
    DuplicateAllocation {
        payment_id: PaymentId,
        invoice_id: InvoiceId,
    },

    /// Allocation set would exceed the parent payment's amount
    #[error("Allocations for payment {payment_id} would exceed its amount: requested {requested}, available {available}")]
    AllocationExceedsPayment {
        payment_id: PaymentId,
        requested: Decimal,
        available: Decimal,
    },

    /// Invoice still referenced by allocation rows
    #[error("Delete restricted: {0}")]
    DeleteRestricted(String),

    /// Mutation attempted on a cancelled invoice (workflow-layer check)
    #[error("Invoice is locked: {0}")]
    InvoiceLocked(String),

    /// Payment not found in the ledger
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Payment id already recorded in the ledger
    #[error("Payment already recorded: {0}")]
    PaymentAlreadyRecorded(String),

    /// Money arithmetic failure (currency mismatch etc.)
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}
