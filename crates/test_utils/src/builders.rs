//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible
//! defaults. These builders allow tests to specify only the relevant
//! fields while using defaults for everything else.

use chrono::NaiveDate;
use core_kernel::{Currency, CustomerId, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_receivables::{GstRegime, Invoice, InvoiceLine, Payment, PaymentMethod};

use crate::fixtures::{StringFixtures, TemporalFixtures};

/// Builder for constructing test invoices
///
/// Defaults to an intra-state INR invoice dated at the fiscal year start
/// with no lines. Totals are recomputed on build.
pub struct TestInvoiceBuilder {
    customer_id: CustomerId,
    regime: GstRegime,
    currency: Currency,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    invoice_number: Option<String>,
    lines: Vec<InvoiceLine>,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            customer_id: CustomerId::new(),
            regime: GstRegime::IntraState,
            currency: Currency::INR,
            invoice_date: TemporalFixtures::invoice_date(),
            due_date: None,
            invoice_number: None,
            lines: Vec::new(),
        }
    }

    /// Sets the customer
    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    /// Sets the tax regime
    pub fn with_regime(mut self, regime: GstRegime) -> Self {
        self.regime = regime;
        self
    }

    /// Sets the invoice date
    pub fn with_invoice_date(mut self, date: NaiveDate) -> Self {
        self.invoice_date = date;
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Sets an explicit invoice number
    pub fn with_invoice_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }

    /// Adds a pre-built line
    pub fn with_line(mut self, line: InvoiceLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Adds a simple line: description, quantity, unit price, GST rate
    pub fn with_simple_line(
        mut self,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        gst_rate: Decimal,
    ) -> Self {
        let line = InvoiceLine::new(description, Money::new(unit_price, self.currency))
            .with_quantity(quantity)
            .expect("test quantity must be non-negative")
            .with_gst_rate(gst_rate)
            .expect("test GST rate must be in range");
        self.lines.push(line);
        self
    }

    /// Adds the standard two-line scenario: 2 × ₹500 + 1 × ₹1000 at 18%
    pub fn with_standard_lines(self) -> Self {
        self.with_simple_line("Item A", dec!(2), dec!(500), dec!(18))
            .with_simple_line("Item B", dec!(1), dec!(1000), dec!(18))
    }

    /// Builds the invoice and recomputes its totals as of `today`
    pub fn build(self, today: NaiveDate) -> Invoice {
        let mut invoice = Invoice::new(
            self.customer_id,
            self.regime,
            self.currency,
            self.invoice_date,
        );
        if let Some(due) = self.due_date {
            invoice = invoice.with_due_date(due);
        }
        if let Some(number) = self.invoice_number {
            invoice = invoice.with_invoice_number(number);
        }
        for line in self.lines {
            invoice.add_line(line);
        }
        invoice
            .recompute(today)
            .expect("builder lines must carry valid rates");
        invoice
    }
}

/// Builder for constructing test payments
pub struct TestPaymentBuilder {
    customer_id: CustomerId,
    amount: Money,
    method: PaymentMethod,
    reference: Option<String>,
}

impl Default for TestPaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPaymentBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            customer_id: CustomerId::new(),
            amount: Money::new(dec!(1000.00), Currency::INR),
            method: PaymentMethod::BankTransfer,
            reference: Some(StringFixtures::bank_reference().to_string()),
        }
    }

    /// Sets the paying customer
    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    /// Sets the payment amount
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the payment method
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the external reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Builds the payment
    pub fn build(self) -> Payment {
        let mut payment = Payment::new(self.customer_id, self.amount, self.method)
            .with_paid_at(TemporalFixtures::payment_received());
        if let Some(reference) = self.reference {
            payment = payment.with_reference(reference);
        }
        payment
    }
}
