//! Receivables Domain - GST Billing & Payment Allocation
//!
//! This crate implements the accounts-receivable core: tax-inclusive
//! invoice totals, payment application, payment-status derivation, and
//! the allocation ledger that splits customer payments across invoices.
//!
//! # Components
//!
//! - [`gst`]: per-line GST breakdown (CGST/SGST vs IGST) and regime
//!   resolution from state codes
//! - [`invoice`]: the invoice aggregate — totals recomputation and
//!   single-invoice payment application
//! - [`status`]: the payment-status state machine
//! - [`payment`]: customer payments and allocation rows
//! - [`allocation`]: the allocation ledger with its uniqueness and cap
//!   invariants
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_receivables::{Invoice, InvoiceLine, GstRegime};
//!
//! let mut invoice = Invoice::new(customer_id, GstRegime::IntraState, Currency::INR, today);
//! invoice.add_line(InvoiceLine::new("Widget", price).with_quantity(qty)?);
//! invoice.recompute(today)?;
//! invoice.apply_payment(amount, today)?;
//! ```

pub mod allocation;
pub mod error;
pub mod gst;
pub mod invoice;
pub mod payment;
pub mod status;

pub use allocation::{AllocationLedger, AllocationOutcome};
pub use error::ReceivablesError;
pub use gst::{
    calculate_gst, compute_breakdown, determine_regime, GstBreakdown, GstBreakup, GstRegime,
    TaxMode,
};
pub use invoice::{Invoice, InvoiceLine};
pub use payment::{Payment, PaymentAllocation, PaymentMethod};
pub use status::{derive_payment_status, mirror_status, InvoiceStatus, PaymentStatus};
