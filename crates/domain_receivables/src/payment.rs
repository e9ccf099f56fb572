//! Customer payments
//!
//! A payment is received at customer level and later split across one or
//! more invoices by the allocation ledger. Payments are immutable once
//! allocations reference them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AllocationId, CustomerId, InvoiceId, Money, PaymentId};

/// Payment method tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankTransfer,
    Upi,
    Card,
    Cheque,
    Cash,
    Other,
}

impl PaymentMethod {
    /// Canonical uppercase form, matching the stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cheque => "CHEQUE",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "UPI" => Ok(PaymentMethod::Upi),
            "CARD" => Ok(PaymentMethod::Card),
            "CHEQUE" => Ok(PaymentMethod::Cheque),
            "CASH" => Ok(PaymentMethod::Cash),
            "OTHER" => Ok(PaymentMethod::Other),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// A customer-level payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Paying customer
    pub customer_id: CustomerId,
    /// Payment amount
    pub amount: Money,
    /// When the payment was received
    pub paid_at: DateTime<Utc>,
    /// Payment method
    pub method: PaymentMethod,
    /// External reference (bank ref, UTR, transaction id)
    pub reference: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment received now
    pub fn new(customer_id: CustomerId, amount: Money, method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new_v7(),
            customer_id,
            amount,
            paid_at: now,
            method,
            reference: None,
            created_at: now,
        }
    }

    /// Sets the external reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the received timestamp
    pub fn with_paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = paid_at;
        self
    }
}

/// A record of how much of a payment was applied to one invoice
///
/// At most one allocation row exists per (payment, invoice) pair; top-ups
/// update `amount_applied` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Row identifier
    pub id: AllocationId,
    /// Funding payment
    pub payment_id: PaymentId,
    /// Funded invoice
    pub invoice_id: InvoiceId,
    /// Amount applied to this invoice
    pub amount_applied: Money,
    /// When the allocation was written
    pub allocated_at: DateTime<Utc>,
}
