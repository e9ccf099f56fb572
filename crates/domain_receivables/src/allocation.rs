//! Payment allocation ledger
//!
//! Records how customer-level payments are split across invoices.
//!
//! # Invariants
//!
//! - At most one allocation row per (payment, invoice) pair
//! - The allocation sum for a payment never exceeds the payment amount
//! - An invoice referenced by allocations cannot be deleted; deleting a
//!   payment cascades its allocations
//!
//! Allocation writes are independent of payment application on the
//! invoice: callers orchestrating "record a payment and fund these
//! invoices" invoke both, in one storage transaction (the repository's
//! `allocate_payment` does exactly that).

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::info;

use core_kernel::{round_money, AllocationId, CustomerId, InvoiceId, Money, PaymentId};

use crate::error::ReceivablesError;
use crate::invoice::Invoice;
use crate::payment::{Payment, PaymentAllocation};
use crate::status::InvoiceStatus;

/// Outcome of an upserting allocation write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// A new allocation row was created
    Created,
    /// An existing row's amount was updated in place
    Updated,
}

/// In-memory allocation ledger
///
/// Mirrors the storage-layer constraints so domain logic and tests can
/// exercise them without a database.
#[derive(Debug, Default)]
pub struct AllocationLedger {
    payments: HashMap<PaymentId, Payment>,
    allocations: HashMap<(PaymentId, InvoiceId), PaymentAllocation>,
}

impl AllocationLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a payment in the ledger
    ///
    /// # Errors
    ///
    /// Returns `PaymentAlreadyRecorded` for a duplicate payment id.
    pub fn record_payment(&mut self, payment: Payment) -> Result<(), ReceivablesError> {
        if self.payments.contains_key(&payment.id) {
            return Err(ReceivablesError::PaymentAlreadyRecorded(
                payment.id.to_string(),
            ));
        }
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    /// Looks up a payment
    pub fn payment(&self, payment_id: &PaymentId) -> Option<&Payment> {
        self.payments.get(payment_id)
    }

    /// Looks up the allocation for a (payment, invoice) pair
    pub fn allocation(
        &self,
        payment_id: &PaymentId,
        invoice_id: &InvoiceId,
    ) -> Option<&PaymentAllocation> {
        self.allocations.get(&(*payment_id, *invoice_id))
    }

    /// All allocations funded by one payment
    pub fn allocations_for_payment(&self, payment_id: &PaymentId) -> Vec<&PaymentAllocation> {
        self.allocations
            .values()
            .filter(|a| a.payment_id == *payment_id)
            .collect()
    }

    /// Total amount applied against one invoice, across all payments
    pub fn allocated_to_invoice(&self, invoice_id: &InvoiceId) -> Decimal {
        self.allocations
            .values()
            .filter(|a| a.invoice_id == *invoice_id)
            .map(|a| a.amount_applied.amount())
            .sum()
    }

    /// Writes an allocation, updating the existing row for the pair if any
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment is not recorded
    /// - `InvalidAmount` for non-positive amounts
    /// - `AllocationExceedsPayment` if the payment's allocation sum would
    ///   exceed its amount
    pub fn allocate(
        &mut self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount_applied: Decimal,
    ) -> Result<(AllocationOutcome, &PaymentAllocation), ReceivablesError> {
        let amount_applied = round_money(amount_applied);
        self.check_allocation(payment_id, invoice_id, amount_applied)?;

        let currency = self.payments[&payment_id].amount.currency();
        let key = (payment_id, invoice_id);
        let outcome = if let Some(existing) = self.allocations.get_mut(&key) {
            existing.amount_applied = Money::new(amount_applied, currency);
            existing.allocated_at = Utc::now();
            AllocationOutcome::Updated
        } else {
            self.allocations.insert(
                key,
                PaymentAllocation {
                    id: AllocationId::new_v7(),
                    payment_id,
                    invoice_id,
                    amount_applied: Money::new(amount_applied, currency),
                    allocated_at: Utc::now(),
                },
            );
            AllocationOutcome::Created
        };

        info!(
            payment = %payment_id,
            invoice = %invoice_id,
            amount = %amount_applied,
            ?outcome,
            "allocation written"
        );

        Ok((outcome, &self.allocations[&key]))
    }

    /// Writes an allocation, failing if a row already exists for the pair
    ///
    /// This is the strict variant matching the storage layer's unique
    /// constraint; callers that want top-up semantics use
    /// [`AllocationLedger::allocate`].
    ///
    /// # Errors
    ///
    /// As [`AllocationLedger::allocate`], plus `DuplicateAllocation` when
    /// the pair already has a row.
    pub fn insert_allocation(
        &mut self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount_applied: Decimal,
    ) -> Result<&PaymentAllocation, ReceivablesError> {
        if self.allocations.contains_key(&(payment_id, invoice_id)) {
            return Err(ReceivablesError::DuplicateAllocation {
                payment_id,
                invoice_id,
            });
        }
        let (_, allocation) = self.allocate(payment_id, invoice_id, amount_applied)?;
        Ok(allocation)
    }

    /// Deletes a payment and cascades to its allocations
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if the payment is not recorded.
    pub fn remove_payment(&mut self, payment_id: &PaymentId) -> Result<(), ReceivablesError> {
        if self.payments.remove(payment_id).is_none() {
            return Err(ReceivablesError::PaymentNotFound(payment_id.to_string()));
        }
        self.allocations.retain(|(pid, _), _| pid != payment_id);
        Ok(())
    }

    /// Guards invoice deletion: restricted while allocations reference it
    ///
    /// # Errors
    ///
    /// Returns `DeleteRestricted` if any allocation references the invoice.
    pub fn ensure_invoice_deletable(&self, invoice_id: &InvoiceId) -> Result<(), ReceivablesError> {
        let referencing = self
            .allocations
            .values()
            .filter(|a| a.invoice_id == *invoice_id)
            .count();
        if referencing > 0 {
            return Err(ReceivablesError::DeleteRestricted(format!(
                "invoice {invoice_id} has {referencing} allocation(s); reallocate or delete them first"
            )));
        }
        Ok(())
    }

    /// Outstanding balance for a customer
    ///
    /// Σ grand_total of the customer's Issued/Partial invoices minus
    /// Σ amount_applied of allocations against those invoices. Derived,
    /// never stored.
    pub fn outstanding_for_customer(
        &self,
        customer_id: &CustomerId,
        invoices: &[Invoice],
    ) -> Decimal {
        let open: Vec<&Invoice> = invoices
            .iter()
            .filter(|inv| {
                inv.customer_id == *customer_id
                    && matches!(inv.status, InvoiceStatus::Issued | InvoiceStatus::Partial)
            })
            .collect();

        let invoiced: Decimal = open.iter().map(|inv| inv.grand_total.amount()).sum();
        let allocated: Decimal = open
            .iter()
            .map(|inv| self.allocated_to_invoice(&inv.id))
            .sum();

        round_money(invoiced - allocated)
    }

    fn check_allocation(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount_applied: Decimal,
    ) -> Result<(), ReceivablesError> {
        let payment = self
            .payments
            .get(&payment_id)
            .ok_or_else(|| ReceivablesError::PaymentNotFound(payment_id.to_string()))?;

        if amount_applied <= Decimal::ZERO {
            return Err(ReceivablesError::InvalidAmount(format!(
                "allocation amount must be positive, got {amount_applied}"
            )));
        }

        // Sum over the payment's other allocations; the pair being written
        // is replaced, not added to.
        let others: Decimal = self
            .allocations
            .values()
            .filter(|a| a.payment_id == payment_id && a.invoice_id != invoice_id)
            .map(|a| a.amount_applied.amount())
            .sum();
        let available = payment.amount.amount() - others;
        if amount_applied > available {
            return Err(ReceivablesError::AllocationExceedsPayment {
                payment_id,
                requested: amount_applied,
                available,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentMethod;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn payment_of(amount: Decimal) -> Payment {
        Payment::new(
            CustomerId::new(),
            Money::new(amount, Currency::INR),
            PaymentMethod::BankTransfer,
        )
    }

    #[test]
    fn second_write_for_same_pair_updates_in_place() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(1000));
        let payment_id = payment.id;
        let invoice_id = InvoiceId::new();
        ledger.record_payment(payment).unwrap();

        let (outcome, _) = ledger.allocate(payment_id, invoice_id, dec!(400)).unwrap();
        assert_eq!(outcome, AllocationOutcome::Created);

        let (outcome, allocation) = ledger.allocate(payment_id, invoice_id, dec!(600)).unwrap();
        assert_eq!(outcome, AllocationOutcome::Updated);
        assert_eq!(allocation.amount_applied.amount(), dec!(600));
        assert_eq!(ledger.allocations_for_payment(&payment_id).len(), 1);
    }

    #[test]
    fn strict_insert_rejects_duplicates() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(1000));
        let payment_id = payment.id;
        let invoice_id = InvoiceId::new();
        ledger.record_payment(payment).unwrap();

        ledger
            .insert_allocation(payment_id, invoice_id, dec!(400))
            .unwrap();
        let result = ledger.insert_allocation(payment_id, invoice_id, dec!(100));
        assert!(matches!(
            result,
            Err(ReceivablesError::DuplicateAllocation { .. })
        ));
    }

    #[test]
    fn allocations_cannot_exceed_payment_amount() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(1000));
        let payment_id = payment.id;
        ledger.record_payment(payment).unwrap();

        ledger
            .allocate(payment_id, InvoiceId::new(), dec!(700))
            .unwrap();
        let result = ledger.allocate(payment_id, InvoiceId::new(), dec!(400));
        assert!(matches!(
            result,
            Err(ReceivablesError::AllocationExceedsPayment { .. })
        ));

        // Topping up an existing row replaces its amount, so this is fine
        let invoice = InvoiceId::new();
        ledger.allocate(payment_id, invoice, dec!(100)).unwrap();
        ledger.allocate(payment_id, invoice, dec!(300)).unwrap();
    }

    #[test]
    fn deleting_payment_cascades_allocations() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(500));
        let payment_id = payment.id;
        let invoice_id = InvoiceId::new();
        ledger.record_payment(payment).unwrap();
        ledger.allocate(payment_id, invoice_id, dec!(500)).unwrap();

        ledger.remove_payment(&payment_id).unwrap();
        assert!(ledger.allocation(&payment_id, &invoice_id).is_none());
        assert!(ledger.ensure_invoice_deletable(&invoice_id).is_ok());
    }

    #[test]
    fn invoice_deletion_restricted_while_referenced() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(500));
        let payment_id = payment.id;
        let invoice_id = InvoiceId::new();
        ledger.record_payment(payment).unwrap();
        ledger.allocate(payment_id, invoice_id, dec!(200)).unwrap();

        assert!(matches!(
            ledger.ensure_invoice_deletable(&invoice_id),
            Err(ReceivablesError::DeleteRestricted(_))
        ));
    }

    #[test]
    fn non_positive_allocation_is_rejected() {
        let mut ledger = AllocationLedger::new();
        let payment = payment_of(dec!(500));
        let payment_id = payment.id;
        ledger.record_payment(payment).unwrap();

        assert!(matches!(
            ledger.allocate(payment_id, InvoiceId::new(), dec!(0)),
            Err(ReceivablesError::InvalidAmount(_))
        ));
    }

    #[test]
    fn unknown_payment_is_an_error() {
        let mut ledger = AllocationLedger::new();
        assert!(matches!(
            ledger.allocate(PaymentId::new(), InvoiceId::new(), dec!(10)),
            Err(ReceivablesError::PaymentNotFound(_))
        ));
    }
}
