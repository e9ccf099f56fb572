//! Receivables repository implementation
//!
//! This module provides database access for invoices, payments, and the
//! allocation ledger. Writes that touch invoice totals serialize on the
//! invoice row with `SELECT ... FOR UPDATE` so concurrent payments cannot
//! interleave their read-modify-write cycles.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use core_kernel::{Clock, Currency, CustomerId, InvoiceId, Money, PaymentId, SystemClock};
use domain_receivables::{
    GstRegime, Invoice, InvoiceLine, InvoiceStatus, Payment, PaymentMethod, PaymentStatus,
    ReceivablesError,
};

use crate::error::DatabaseError;

/// Repository for invoices, payments, and payment allocations
///
/// All mutating operations are transactional. The repository carries a
/// [`Clock`] so that status derivation is testable against a fixed date.
#[derive(Clone)]
pub struct ReceivablesRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl ReceivablesRepository {
    /// Creates a new repository using the system clock
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a repository with an explicit clock
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    // ------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------

    /// Persists a new invoice with its lines in a single transaction
    #[instrument(skip(self, invoice), fields(invoice = %invoice.invoice_number))]
    pub async fn create_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        insert_invoice_header(&mut tx, invoice).await?;
        insert_lines(&mut tx, invoice).await?;
        tx.commit().await?;

        info!(invoice = %invoice.invoice_number, "invoice created");
        Ok(())
    }

    /// Loads an invoice with its lines
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no invoice exists with the given id
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            "SELECT * FROM invoices WHERE invoice_id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", id))?;

        let lines = sqlx::query_as::<_, InvoiceLineRow>(
            "SELECT * FROM invoice_lines WHERE invoice_id = $1 ORDER BY line_id",
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await?;

        row.into_domain(lines)
    }

    /// Replaces an invoice's line set and recomputes its totals
    ///
    /// The two-step protocol made explicit: the caller hands over the full
    /// desired line set, and this method writes it and derives the totals
    /// inside one transaction.
    #[instrument(skip(self, lines))]
    pub async fn replace_lines_and_recompute(
        &self,
        id: InvoiceId,
        lines: Vec<InvoiceLine>,
    ) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, id).await?;

        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await?;

        invoice.lines = lines;
        invoice.recompute(self.clock.today())?;

        insert_lines(&mut tx, &invoice).await?;
        update_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;

        Ok(invoice)
    }

    /// Re-derives an invoice's totals and statuses from its stored lines
    pub async fn recompute_invoice(&self, id: InvoiceId) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, id).await?;
        invoice.recompute(self.clock.today())?;
        update_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Applies a payment amount directly to a single invoice
    ///
    /// Non-positive amounts are a no-op, mirroring the domain rule.
    #[instrument(skip(self))]
    pub async fn apply_payment(
        &self,
        id: InvoiceId,
        amount: Decimal,
    ) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, id).await?;
        invoice.apply_payment(amount, self.clock.today())?;
        update_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Deletes an invoice
    ///
    /// # Errors
    ///
    /// Returns `Domain(DeleteRestricted)` if any payment allocation still
    /// references the invoice; line rows cascade.
    pub async fn delete_invoice(&self, id: InvoiceId) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(DatabaseError::not_found("Invoice", id))
            }
            Ok(_) => Ok(()),
            Err(e) => match DatabaseError::from(&e) {
                DatabaseError::ForeignKeyViolation(_) => Err(DatabaseError::Domain(
                    ReceivablesError::DeleteRestricted(format!(
                        "invoice {id} has payment allocations"
                    )),
                )),
                other => Err(other),
            },
        }
    }

    /// Lists invoices past their due date with an open balance
    pub async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<Invoice>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT * FROM invoices
            WHERE due_date < $1
              AND balance_amount > 0
              AND status NOT IN ('CANCELLED', 'PAID')
            ORDER BY due_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_domain(Vec::new())).collect()
    }

    // ------------------------------------------------------------------
    // Payments and allocations
    // ------------------------------------------------------------------

    /// Records a payment and allocates it across invoices atomically
    ///
    /// The request is validated up front, then each allocation is written
    /// and applied to the target invoice's paid total. Either every
    /// allocation lands or none do. Re-allocating to an invoice the payment
    /// already covers goes through [`allocate_payment_topup`].
    ///
    /// [`allocate_payment_topup`]: ReceivablesRepository::allocate_payment_topup
    ///
    /// # Errors
    ///
    /// Returns `Domain(AllocationExceedsPayment)` if the allocations sum to
    /// more than the payment amount, and `Domain(DuplicateAllocation)` if
    /// an invoice id appears more than once in the request
    #[instrument(skip(self, payment, allocations), fields(payment = %payment.id))]
    pub async fn allocate_payment(
        &self,
        payment: &Payment,
        allocations: &[(InvoiceId, Decimal)],
    ) -> Result<(), DatabaseError> {
        validate_allocation_request(payment, allocations)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ar_payments
                (payment_id, customer_id, amount, currency, paid_at, method, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(payment.customer_id))
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.paid_at)
        .bind(payment.method.as_str())
        .bind(payment.reference.as_deref())
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        for (invoice_id, amount) in allocations {
            sqlx::query(
                r#"
                INSERT INTO ar_payment_allocations
                    (allocation_id, payment_id, invoice_id, amount_applied, allocated_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(Uuid::from(payment.id))
            .bind(Uuid::from(*invoice_id))
            .bind(amount)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            let mut invoice = lock_invoice(&mut tx, *invoice_id).await?;
            invoice.apply_payment(*amount, self.clock.today())?;
            update_invoice_totals(&mut tx, &invoice).await?;
        }

        tx.commit().await?;
        info!(payment = %payment.id, allocations = allocations.len(), "payment allocated");
        Ok(())
    }

    /// Tops up (or creates) the allocation for one (payment, invoice) pair
    ///
    /// The unique constraint makes the second write for a pair an update,
    /// not a duplicate; only the delta over the previous amount is applied
    /// to the invoice.
    ///
    /// # Errors
    ///
    /// Returns `Domain(AllocationExceedsPayment)` if the payment's
    /// allocation sum would exceed its amount
    #[instrument(skip(self))]
    pub async fn allocate_payment_topup(
        &self,
        payment_id: &PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Serialize on the payment row so concurrent top-ups cannot
        // overshoot the cap between check and write
        let payment_row = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM ar_payments WHERE payment_id = $1 FOR UPDATE",
        )
        .bind(Uuid::from(*payment_id))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))?;

        let (others,): (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount_applied), 0)
            FROM ar_payment_allocations
            WHERE payment_id = $1 AND invoice_id <> $2
            "#,
        )
        .bind(Uuid::from(*payment_id))
        .bind(Uuid::from(invoice_id))
        .fetch_one(&mut *tx)
        .await?;

        let available = payment_row.amount - others;
        if amount > available {
            return Err(DatabaseError::Domain(
                ReceivablesError::AllocationExceedsPayment {
                    payment_id: *payment_id,
                    requested: amount,
                    available,
                },
            ));
        }

        let previous: Option<(Decimal,)> = sqlx::query_as(
            "SELECT amount_applied FROM ar_payment_allocations WHERE payment_id = $1 AND invoice_id = $2",
        )
        .bind(Uuid::from(*payment_id))
        .bind(Uuid::from(invoice_id))
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ar_payment_allocations
                (allocation_id, payment_id, invoice_id, amount_applied, allocated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payment_id, invoice_id)
            DO UPDATE SET amount_applied = EXCLUDED.amount_applied,
                          allocated_at = EXCLUDED.allocated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(*payment_id))
        .bind(Uuid::from(invoice_id))
        .bind(amount)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let delta = amount - previous.map(|(p,)| p).unwrap_or_default();
        if delta > Decimal::ZERO {
            let mut invoice = lock_invoice(&mut tx, invoice_id).await?;
            invoice.apply_payment(delta, self.clock.today())?;
            update_invoice_totals(&mut tx, &invoice).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Loads a payment
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no payment exists with the given id
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM ar_payments WHERE payment_id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Payment", id))?;

        row.into_domain()
    }

    /// Deletes a payment; its allocation rows cascade
    ///
    /// Affected invoices keep their paid totals — reversal of applied
    /// amounts is a separate workflow concern.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<(), DatabaseError> {
        let done = sqlx::query("DELETE FROM ar_payments WHERE payment_id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payment", id));
        }
        Ok(())
    }

    /// Computes the customer's outstanding balance
    ///
    /// Sum of grand totals across ISSUED and PARTIAL invoices, minus every
    /// allocation applied to that customer's invoices.
    pub async fn customer_balance(
        &self,
        customer_id: CustomerId,
    ) -> Result<Decimal, DatabaseError> {
        let (billed,): (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(grand_total), 0)
            FROM invoices
            WHERE customer_id = $1 AND status IN ('ISSUED', 'PARTIAL')
            "#,
        )
        .bind(Uuid::from(customer_id))
        .fetch_one(&self.pool)
        .await?;

        // Allocations are netted against the same open-invoice set the
        // billed sum counts; settled invoices drop out of both sides.
        let (allocated,): (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(a.amount_applied), 0)
            FROM ar_payment_allocations a
            JOIN invoices i ON i.invoice_id = a.invoice_id
            WHERE i.customer_id = $1 AND i.status IN ('ISSUED', 'PARTIAL')
            "#,
        )
        .bind(Uuid::from(customer_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(billed - allocated)
    }
}

impl std::fmt::Debug for ReceivablesRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceivablesRepository").finish_non_exhaustive()
    }
}

/// Validates an allocation request before any row is written
///
/// A repeated invoice id would make the upsert keep only the last amount
/// while the invoice is credited with the sum, so repeats are rejected
/// up front. The cap check matches the in-memory ledger's.
fn validate_allocation_request(
    payment: &Payment,
    allocations: &[(InvoiceId, Decimal)],
) -> Result<(), DatabaseError> {
    let mut seen = std::collections::HashSet::with_capacity(allocations.len());
    for (invoice_id, _) in allocations {
        if !seen.insert(*invoice_id) {
            return Err(DatabaseError::Domain(
                ReceivablesError::DuplicateAllocation {
                    payment_id: payment.id,
                    invoice_id: *invoice_id,
                },
            ));
        }
    }

    let requested: Decimal = allocations.iter().map(|(_, amount)| *amount).sum();
    if requested > payment.amount.amount() {
        return Err(DatabaseError::Domain(
            ReceivablesError::AllocationExceedsPayment {
                payment_id: payment.id,
                requested,
                available: payment.amount.amount(),
            },
        ));
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Transaction helpers
// ----------------------------------------------------------------------

/// Locks an invoice row and reconstructs the aggregate with its lines
async fn lock_invoice(
    tx: &mut Transaction<'_, Postgres>,
    id: InvoiceId,
) -> Result<Invoice, DatabaseError> {
    let row = sqlx::query_as::<_, InvoiceRow>(
        "SELECT * FROM invoices WHERE invoice_id = $1 FOR UPDATE",
    )
    .bind(Uuid::from(id))
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Invoice", id))?;

    let lines = sqlx::query_as::<_, InvoiceLineRow>(
        "SELECT * FROM invoice_lines WHERE invoice_id = $1 ORDER BY line_id",
    )
    .bind(Uuid::from(id))
    .fetch_all(&mut **tx)
    .await?;

    row.into_domain(lines)
}

async fn insert_invoice_header(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            invoice_id, invoice_number, customer_id, invoice_date, due_date,
            status, regime, currency,
            subtotal, cgst_amount, sgst_amount, igst_amount,
            total_tax, grand_total, paid_amount, balance_amount,
            payment_status, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8,
            $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19
        )
        "#,
    )
    .bind(Uuid::from(invoice.id))
    .bind(&invoice.invoice_number)
    .bind(Uuid::from(invoice.customer_id))
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(invoice.status.as_str())
    .bind(invoice.regime.as_str())
    .bind(invoice.currency.code())
    .bind(invoice.subtotal.amount())
    .bind(invoice.cgst_amount.amount())
    .bind(invoice.sgst_amount.amount())
    .bind(invoice.igst_amount.amount())
    .bind(invoice.total_tax.amount())
    .bind(invoice.grand_total.amount())
    .bind(invoice.paid_amount.amount())
    .bind(invoice.balance_amount.amount())
    .bind(invoice.payment_status.as_str())
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), DatabaseError> {
    for line in &invoice.lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                line_id, invoice_id, product_id, description,
                quantity, unit, unit_price, gst_rate, hsn_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::from(line.id))
        .bind(Uuid::from(invoice.id))
        .bind(line.product_id.map(Uuid::from))
        .bind(&line.description)
        .bind(line.quantity)
        .bind(&line.unit)
        .bind(line.unit_price.amount())
        .bind(line.gst_rate)
        .bind(line.hsn_code.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn update_invoice_totals(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE invoices SET
            subtotal = $2, cgst_amount = $3, sgst_amount = $4, igst_amount = $5,
            total_tax = $6, grand_total = $7, paid_amount = $8, balance_amount = $9,
            status = $10, payment_status = $11, updated_at = $12
        WHERE invoice_id = $1
        "#,
    )
    .bind(Uuid::from(invoice.id))
    .bind(invoice.subtotal.amount())
    .bind(invoice.cgst_amount.amount())
    .bind(invoice.sgst_amount.amount())
    .bind(invoice.igst_amount.amount())
    .bind(invoice.total_tax.amount())
    .bind(invoice.grand_total.amount())
    .bind(invoice.paid_amount.amount())
    .bind(invoice.balance_amount.amount())
    .bind(invoice.status.as_str())
    .bind(invoice.payment_status.as_str())
    .bind(invoice.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ----------------------------------------------------------------------
// Row mappings
// ----------------------------------------------------------------------

/// Database row for an invoice header
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub regime: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub igst_amount: Decimal,
    pub total_tax: Decimal,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_domain(self, lines: Vec<InvoiceLineRow>) -> Result<Invoice, DatabaseError> {
        let currency = Currency::from_str(&self.currency)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let money = |amount: Decimal| Money::new(amount, currency);

        Ok(Invoice {
            id: InvoiceId::from(self.invoice_id),
            invoice_number: self.invoice_number,
            customer_id: CustomerId::from(self.customer_id),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            status: InvoiceStatus::from_str(&self.status)
                .map_err(DatabaseError::SerializationError)?,
            regime: GstRegime::from_str(&self.regime)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
            currency,
            lines: lines
                .into_iter()
                .map(|l| l.into_domain(currency))
                .collect(),
            subtotal: money(self.subtotal),
            cgst_amount: money(self.cgst_amount),
            sgst_amount: money(self.sgst_amount),
            igst_amount: money(self.igst_amount),
            total_tax: money(self.total_tax),
            grand_total: money(self.grand_total),
            paid_amount: money(self.paid_amount),
            balance_amount: money(self.balance_amount),
            payment_status: PaymentStatus::from_str(&self.payment_status)
                .map_err(DatabaseError::SerializationError)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Database row for an invoice line
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceLineRow {
    pub line_id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub gst_rate: Decimal,
    pub hsn_code: Option<String>,
}

impl InvoiceLineRow {
    fn into_domain(self, currency: Currency) -> InvoiceLine {
        InvoiceLine {
            id: core_kernel::InvoiceLineId::from(self.line_id),
            product_id: self.product_id.map(core_kernel::ProductId::from),
            description: self.description,
            quantity: self.quantity,
            unit: self.unit,
            unit_price: Money::new(self.unit_price, currency),
            gst_rate: self.gst_rate,
            hsn_code: self.hsn_code,
        }
    }
}

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRow {
    /// Reconstructs the domain payment
    pub fn into_domain(self) -> Result<Payment, DatabaseError> {
        let currency = Currency::from_str(&self.currency)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        Ok(Payment {
            id: PaymentId::from(self.payment_id),
            customer_id: CustomerId::from(self.customer_id),
            amount: Money::new(self.amount, currency),
            paid_at: self.paid_at,
            method: PaymentMethod::from_str(&self.method)
                .map_err(DatabaseError::SerializationError)?,
            reference: self.reference,
            created_at: self.created_at,
        })
    }
}
