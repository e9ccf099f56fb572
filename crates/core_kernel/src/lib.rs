//! Core Kernel - Foundational types for the accounts-receivable engine
//!
//! This crate provides the building blocks used across the domain and
//! infrastructure crates:
//! - Money types with precise decimal arithmetic and the rounding rules
//!   required for tax-compliant invoicing
//! - Strongly-typed identifiers
//! - The `Clock` seam that supplies "today" for overdue derivation

pub mod clock;
pub mod error;
pub mod identifiers;
pub mod money;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use identifiers::{
    AllocationId, CustomerId, InvoiceId, InvoiceLineId, PaymentId, ProductId,
};
pub use money::{amount_from_f64, parse_amount, round_money, round_qty, Currency, Money, MoneyError};
