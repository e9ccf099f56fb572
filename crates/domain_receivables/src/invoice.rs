//! Invoice aggregate
//!
//! The invoice owns its line items and the seven derived monetary fields.
//! Totals are recomputed from the full line set via [`Invoice::recompute`];
//! mutating a line does not recompute implicitly — callers write the line,
//! then call `recompute`, so the dependency is visible in their control
//! flow.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{round_money, round_qty, Currency, CustomerId, InvoiceId, InvoiceLineId, Money, ProductId};

use crate::error::ReceivablesError;
use crate::gst::{compute_breakdown, GstRegime};
use crate::status::{derive_payment_status, mirror_status, InvoiceStatus, PaymentStatus};

/// A line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Line identifier
    pub id: InvoiceLineId,
    /// Optional product reference
    pub product_id: Option<ProductId>,
    /// Description shown on the document
    pub description: String,
    /// Quantity, 3 decimal places
    pub quantity: Decimal,
    /// Unit of measure
    pub unit: String,
    /// Unit price, 2 decimal places
    pub unit_price: Money,
    /// Total GST percentage for this line (e.g. 18 for 18%)
    pub gst_rate: Decimal,
    /// HSN code for tax classification
    pub hsn_code: Option<String>,
}

impl InvoiceLine {
    /// Creates a new line with quantity 1.000 and no tax
    pub fn new(description: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: InvoiceLineId::new_v7(),
            product_id: None,
            description: description.into(),
            quantity: round_qty(Decimal::ONE),
            unit: "PCS".to_string(),
            unit_price: unit_price.rounded(),
            gst_rate: Decimal::ZERO,
            hsn_code: None,
        }
    }

    /// Sets the quantity (rounded to 3 decimal places)
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for negative quantities.
    pub fn with_quantity(mut self, quantity: Decimal) -> Result<Self, ReceivablesError> {
        if quantity < Decimal::ZERO {
            return Err(ReceivablesError::InvalidAmount(format!(
                "quantity must be non-negative, got {quantity}"
            )));
        }
        self.quantity = round_qty(quantity);
        Ok(self)
    }

    /// Sets the GST rate percentage
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` if outside [0, 100].
    pub fn with_gst_rate(mut self, rate: Decimal) -> Result<Self, ReceivablesError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(ReceivablesError::InvalidRate(rate));
        }
        self.gst_rate = rate;
        Ok(self)
    }

    /// Sets the product reference
    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Sets the HSN code
    pub fn with_hsn(mut self, hsn: impl Into<String>) -> Self {
        self.hsn_code = Some(hsn.into());
        self
    }

    /// Sets the unit of measure
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Derived line total: quantity × unit price, rounded to 2 decimals
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity).rounded()
    }

    /// Unrounded taxable value used by the totals engine
    fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price.amount()
    }
}

/// A sales invoice with GST totals and payment tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Human-readable invoice number, unique and immutable once issued
    pub invoice_number: String,
    /// Customer being billed
    pub customer_id: CustomerId,
    /// Issue date
    pub invoice_date: NaiveDate,
    /// Payment due date
    pub due_date: Option<NaiveDate>,
    /// Lifecycle status
    pub status: InvoiceStatus,
    /// Tax regime, applied uniformly to all lines
    pub regime: GstRegime,
    /// Invoice currency
    pub currency: Currency,
    /// Line items
    pub lines: Vec<InvoiceLine>,
    /// Sum of line subtotals
    pub subtotal: Money,
    /// Central GST component
    pub cgst_amount: Money,
    /// State GST component
    pub sgst_amount: Money,
    /// Integrated GST component
    pub igst_amount: Money,
    /// cgst + sgst + igst
    pub total_tax: Money,
    /// subtotal + total_tax
    pub grand_total: Money,
    /// Cumulative payments applied
    pub paid_amount: Money,
    /// grand_total - paid_amount, never negative
    pub balance_amount: Money,
    /// Derived payment classification
    pub payment_status: PaymentStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new draft invoice with zero totals
    pub fn new(
        customer_id: CustomerId,
        regime: GstRegime,
        currency: Currency,
        invoice_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        let zero = Money::zero(currency);

        Self {
            id: InvoiceId::new_v7(),
            invoice_number: generate_invoice_number(),
            customer_id,
            invoice_date,
            due_date: None,
            status: InvoiceStatus::Draft,
            regime,
            currency,
            lines: Vec::new(),
            subtotal: zero,
            cgst_amount: zero,
            sgst_amount: zero,
            igst_amount: zero,
            total_tax: zero,
            grand_total: zero,
            paid_amount: zero,
            balance_amount: zero,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets an explicit invoice number
    pub fn with_invoice_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = number.into();
        self
    }

    /// Adds a line item
    ///
    /// Does not recompute totals; call [`Invoice::recompute`] after the
    /// line set is settled.
    pub fn add_line(&mut self, line: InvoiceLine) {
        self.lines.push(line);
    }

    /// Removes a line by id, returning whether a line was removed
    pub fn remove_line(&mut self, line_id: InvoiceLineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        self.lines.len() != before
    }

    /// Replaces a line in place by id, returning whether a match was found
    pub fn replace_line(&mut self, line: InvoiceLine) -> bool {
        match self.lines.iter_mut().find(|l| l.id == line.id) {
            Some(slot) => {
                *slot = line;
                true
            }
            None => false,
        }
    }

    /// Recomputes all derived totals from the current line set
    ///
    /// Idempotent: calling twice with no line changes yields identical
    /// totals. Per-line tax components are rounded before summation; the
    /// aggregates are re-rounded at the end. The payment status machine
    /// re-runs against `today`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` if any line carries a rate outside [0, 100].
    pub fn recompute(&mut self, today: NaiveDate) -> Result<(), ReceivablesError> {
        let mut subtotal = Decimal::ZERO;
        let mut cgst = Decimal::ZERO;
        let mut sgst = Decimal::ZERO;
        let mut igst = Decimal::ZERO;

        for line in &self.lines {
            let line_subtotal = line.subtotal();
            subtotal += line_subtotal;

            let breakdown = compute_breakdown(line_subtotal, line.gst_rate, self.regime)?;
            cgst += breakdown.cgst;
            sgst += breakdown.sgst;
            igst += breakdown.igst;
        }

        let total_tax = cgst + sgst + igst;
        let grand_total = subtotal + total_tax;

        self.subtotal = Money::new(round_money(subtotal), self.currency);
        self.cgst_amount = Money::new(round_money(cgst), self.currency);
        self.sgst_amount = Money::new(round_money(sgst), self.currency);
        self.igst_amount = Money::new(round_money(igst), self.currency);
        self.total_tax = Money::new(round_money(total_tax), self.currency);
        self.grand_total = Money::new(round_money(grand_total), self.currency);

        // Totals may have shrunk below what was already paid
        self.paid_amount = self.paid_amount.clamp_max(&self.grand_total)?;
        self.refresh_balance_and_status(today);

        debug!(
            invoice = %self.invoice_number,
            subtotal = %self.subtotal.amount(),
            total_tax = %self.total_tax.amount(),
            grand_total = %self.grand_total.amount(),
            "recomputed invoice totals"
        );

        Ok(())
    }

    /// Applies a payment amount to this invoice
    ///
    /// Non-positive amounts are a documented no-op. Overpayment is clamped
    /// to the grand total; the residual is the caller's concern. Returns
    /// whether the payment changed the invoice.
    ///
    /// # Errors
    ///
    /// Returns a currency mismatch error if internal amounts disagree,
    /// which indicates a construction bug rather than bad input.
    pub fn apply_payment(
        &mut self,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<bool, ReceivablesError> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            debug!(
                invoice = %self.invoice_number,
                %amount,
                "ignoring non-positive payment amount"
            );
            return Ok(false);
        }

        let applied = self
            .paid_amount
            .checked_add(&Money::new(amount, self.currency))?;
        self.paid_amount = applied.rounded().clamp_max(&self.grand_total)?;
        self.refresh_balance_and_status(today);

        Ok(true)
    }

    /// Pays off the open balance in one step
    ///
    /// # Errors
    ///
    /// Propagates currency mismatch errors from payment application.
    pub fn mark_paid(&mut self, today: NaiveDate) -> Result<(), ReceivablesError> {
        let open = self.balance_amount.amount();
        self.apply_payment(open, today)?;
        Ok(())
    }

    /// Issues the invoice
    pub fn issue(&mut self) {
        if self.status == InvoiceStatus::Draft {
            self.status = InvoiceStatus::Issued;
            self.updated_at = Utc::now();
        }
    }

    /// Cancels the invoice; cancellation is absorbing
    pub fn cancel(&mut self) {
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Workflow-layer guard against mutating a cancelled invoice
    ///
    /// The engine itself does not block recompute or payment application
    /// on cancelled invoices (historical behavior); workflow layers that
    /// want the stricter behavior call this first.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceLocked` if the invoice is cancelled.
    pub fn ensure_mutable(&self) -> Result<(), ReceivablesError> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(ReceivablesError::InvoiceLocked(
                self.invoice_number.clone(),
            ));
        }
        Ok(())
    }

    /// Returns the open balance
    pub fn balance_due(&self) -> Money {
        self.balance_amount
    }

    /// Returns true if the invoice is past due with an open balance
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.payment_status == PaymentStatus::Overdue
            || (self.due_date.is_some_and(|due| due < today)
                && self.balance_amount.is_positive()
                && self.status != InvoiceStatus::Cancelled)
    }

    fn refresh_balance_and_status(&mut self, today: NaiveDate) {
        let balance = self.grand_total.amount() - self.paid_amount.amount();
        self.balance_amount = Money::new(round_money(balance), self.currency);
        self.payment_status = derive_payment_status(
            self.grand_total.amount(),
            self.paid_amount.amount(),
            self.due_date,
            today,
        );
        self.status = mirror_status(self.status, self.payment_status);
        self.updated_at = Utc::now();
    }
}

/// Generates a unique invoice number
fn generate_invoice_number() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("INV-{}", duration.as_nanos() % 10_000_000_000_000)
}
