//! GST calculation
//!
//! Pure tax arithmetic: a per-line breakdown into CGST/SGST (intra-state)
//! or IGST (inter-state), plus the state-code helpers that decide which
//! regime applies to a supply.
//!
//! Each tax component is rounded to 2 decimal places independently; a
//! drift of up to one paisa per line against the unrounded total is
//! accepted, matching line-level tax disclosure rules.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

use core_kernel::round_money;

use crate::error::ReceivablesError;

/// Tax regime for a supply, fixed once per invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstRegime {
    /// Same state: tax splits equally into CGST + SGST
    IntraState,
    /// Different states: the whole tax is IGST
    InterState,
}

impl GstRegime {
    /// Returns the wire representation used in persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            GstRegime::IntraState => "intra_state",
            GstRegime::InterState => "inter_state",
        }
    }
}

impl FromStr for GstRegime {
    type Err = ReceivablesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intra_state" => Ok(GstRegime::IntraState),
            "inter_state" => Ok(GstRegime::InterState),
            other => Err(ReceivablesError::InvalidAmount(format!(
                "unknown GST regime '{other}'"
            ))),
        }
    }
}

/// Whether a base amount is quoted before tax or tax-inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Tax is added on top of the base amount
    Exclusive,
    /// Tax is already contained in the base amount
    Inclusive,
}

/// Per-line tax components, each independently rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

impl GstBreakdown {
    /// Sum of the rounded components
    pub fn total_tax(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }
}

/// Full GST breakup including rates and totals, for document rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstBreakup {
    pub taxable_value: Decimal,
    pub cgst_rate: Decimal,
    pub sgst_rate: Decimal,
    pub igst_rate: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub igst_amount: Decimal,
    pub total_tax: Decimal,
    pub total_amount: Decimal,
}

fn validate_rate(rate_percent: Decimal) -> Result<(), ReceivablesError> {
    if rate_percent < Decimal::ZERO || rate_percent > dec!(100) {
        return Err(ReceivablesError::InvalidRate(rate_percent));
    }
    Ok(())
}

/// Computes the tax components for one taxable amount
///
/// `total_tax = taxable_amount × rate_percent / 100`, split per the
/// regime. Negative taxable amounts are accepted (credit lines exist in
/// the wild) but logged, since they usually indicate a caller bug.
///
/// # Errors
///
/// Returns `InvalidRate` if `rate_percent` is outside [0, 100].
pub fn compute_breakdown(
    taxable_amount: Decimal,
    rate_percent: Decimal,
    regime: GstRegime,
) -> Result<GstBreakdown, ReceivablesError> {
    validate_rate(rate_percent)?;

    if taxable_amount < Decimal::ZERO {
        warn!(%taxable_amount, "negative taxable amount in GST breakdown");
    }

    let total_tax = taxable_amount * rate_percent / dec!(100);

    let breakdown = match regime {
        GstRegime::InterState => GstBreakdown {
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
            igst: round_money(total_tax),
        },
        GstRegime::IntraState => {
            let half = total_tax / dec!(2);
            GstBreakdown {
                cgst: round_money(half),
                sgst: round_money(half),
                igst: Decimal::ZERO,
            }
        }
    };

    Ok(breakdown)
}

/// Computes a full GST breakup for a base amount
///
/// In `Exclusive` mode the base amount is the taxable value and tax is
/// added on top; in `Inclusive` mode the taxable value is backed out of
/// the base amount first, so the total equals the input.
///
/// # Errors
///
/// Returns `InvalidRate` if `rate_percent` is outside [0, 100].
pub fn calculate_gst(
    base_amount: Decimal,
    rate_percent: Decimal,
    regime: GstRegime,
    mode: TaxMode,
) -> Result<GstBreakup, ReceivablesError> {
    validate_rate(rate_percent)?;

    let taxable = match mode {
        TaxMode::Exclusive => base_amount,
        TaxMode::Inclusive => base_amount / (Decimal::ONE + rate_percent / dec!(100)),
    };

    let components = compute_breakdown(taxable, rate_percent, regime)?;
    let total_tax = round_money(components.total_tax());

    let (cgst_rate, sgst_rate, igst_rate) = match regime {
        GstRegime::InterState => (Decimal::ZERO, Decimal::ZERO, rate_percent),
        GstRegime::IntraState => {
            let half = rate_percent / dec!(2);
            (half, half, Decimal::ZERO)
        }
    };

    let taxable_rounded = round_money(taxable);
    let total_amount = match mode {
        TaxMode::Exclusive => taxable_rounded + total_tax,
        TaxMode::Inclusive => round_money(base_amount),
    };

    Ok(GstBreakup {
        taxable_value: taxable_rounded,
        cgst_rate: round_money(cgst_rate),
        sgst_rate: round_money(sgst_rate),
        igst_rate: round_money(igst_rate),
        cgst_amount: components.cgst,
        sgst_amount: components.sgst,
        igst_amount: components.igst,
        total_tax,
        total_amount,
    })
}

/// GST state codes (first two digits of a GSTIN), per Indian Census coding
static STATE_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("01", "Jammu & Kashmir"),
        ("02", "Himachal Pradesh"),
        ("03", "Punjab"),
        ("04", "Chandigarh"),
        ("05", "Uttarakhand"),
        ("06", "Haryana"),
        ("07", "Delhi (NCT)"),
        ("08", "Rajasthan"),
        ("09", "Uttar Pradesh"),
        ("10", "Bihar"),
        ("11", "Sikkim"),
        ("12", "Arunachal Pradesh"),
        ("13", "Nagaland"),
        ("14", "Manipur"),
        ("15", "Mizoram"),
        ("16", "Tripura"),
        ("17", "Meghalaya"),
        ("18", "Assam"),
        ("19", "West Bengal"),
        ("20", "Jharkhand"),
        ("21", "Odisha"),
        ("22", "Chhattisgarh"),
        ("23", "Madhya Pradesh"),
        ("24", "Gujarat"),
        ("25", "Daman & Diu"),
        ("26", "Dadra & Nagar Haveli and Daman & Diu"),
        ("27", "Maharashtra"),
        ("28", "Andhra Pradesh (Old)"),
        ("29", "Karnataka"),
        ("30", "Goa"),
        ("31", "Lakshadweep"),
        ("32", "Kerala"),
        ("33", "Tamil Nadu"),
        ("34", "Puducherry"),
        ("35", "Andaman & Nicobar Islands"),
        ("36", "Telangana"),
        ("37", "Andhra Pradesh"),
        ("38", "Ladakh"),
        ("97", "Other Territory"),
        ("99", "Centre Jurisdiction"),
    ])
});

/// Normalizes input to a two-digit GST state code string
///
/// Accepts `"7"`, `"07"` or `"29"`; zero-pads single digits.
///
/// # Errors
///
/// Returns `InvalidAmount` for non-numeric or unknown codes.
pub fn normalize_state_code(code: &str) -> Result<String, ReceivablesError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReceivablesError::InvalidAmount(format!(
            "invalid state code '{code}': must be numeric"
        )));
    }
    let padded = if trimmed.len() == 1 {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    };
    if !STATE_CODES.contains_key(padded.as_str()) {
        return Err(ReceivablesError::InvalidAmount(format!(
            "unknown GST state code '{padded}'"
        )));
    }
    Ok(padded)
}

/// Returns the state name for a normalized GST state code
pub fn state_name(code: &str) -> Option<&'static str> {
    STATE_CODES.get(code).copied()
}

/// Determines the tax regime for a supply from supplier and customer codes
///
/// Union Territories are treated as states: equality of code decides.
///
/// # Errors
///
/// Returns `InvalidAmount` if either code is not a known GST state code.
pub fn determine_regime(
    supplier_state_code: &str,
    customer_state_code: &str,
) -> Result<GstRegime, ReceivablesError> {
    let supplier = normalize_state_code(supplier_state_code)?;
    let customer = normalize_state_code(customer_state_code)?;
    if supplier == customer {
        Ok(GstRegime::IntraState)
    } else {
        Ok(GstRegime::InterState)
    }
}
