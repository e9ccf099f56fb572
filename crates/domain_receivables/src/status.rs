//! Payment status derivation
//!
//! A pure state machine re-run after every total or payment change.
//! UNPAID → PARTIAL → PAID, with OVERDUE as a date-dependent overlay and
//! CANCELLED as an absorbing state this machine never enters or exits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived payment classification, distinct from the coarser lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    /// Canonical uppercase form, matching the stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Overdue => "OVERDUE",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(PaymentStatus::Unpaid),
            "PARTIAL" => Ok(PaymentStatus::Partial),
            "PAID" => Ok(PaymentStatus::Paid),
            "OVERDUE" => Ok(PaymentStatus::Overdue),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

impl InvoiceStatus {
    /// Canonical uppercase form, matching the stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Issued => "ISSUED",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "ISSUED" => Ok(InvoiceStatus::Issued),
            "PARTIAL" => Ok(InvoiceStatus::Partial),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Derives the payment status from amounts and the due date
///
/// Branch order matters: a past-due invoice with a partial payment is
/// OVERDUE, not PARTIAL.
pub fn derive_payment_status(
    grand_total: Decimal,
    paid_amount: Decimal,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> PaymentStatus {
    let balance = grand_total - paid_amount;
    if grand_total <= Decimal::ZERO {
        PaymentStatus::Unpaid
    } else if balance <= Decimal::ZERO {
        PaymentStatus::Paid
    } else if due_date.is_some_and(|due| due < today) {
        PaymentStatus::Overdue
    } else if paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// Mirrors a payment status into the coarse lifecycle status
///
/// CANCELLED is never overwritten. PARTIAL only promotes a Draft invoice;
/// an already-issued invoice keeps its status on partial payment (the
/// lifecycle is a one-way ratchet away from Draft).
pub fn mirror_status(current: InvoiceStatus, payment_status: PaymentStatus) -> InvoiceStatus {
    if current == InvoiceStatus::Cancelled {
        return current;
    }
    match payment_status {
        PaymentStatus::Paid => InvoiceStatus::Paid,
        PaymentStatus::Overdue => InvoiceStatus::Overdue,
        PaymentStatus::Partial if current == InvoiceStatus::Draft => InvoiceStatus::Partial,
        _ => current,
    }
}
