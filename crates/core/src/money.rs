//! Amount, currency and fee helpers shared by gateway implementations.

use crate::error::ChatShopError;

/// Validate a caller-supplied amount: finite and strictly positive.
pub fn validate_amount(amount: f64) -> Result<f64, ChatShopError> {
    if !amount.is_finite() {
        return Err(ChatShopError::Validation("amount must be numeric".into()));
    }
    if amount <= 0.0 {
        return Err(ChatShopError::Validation(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(amount)
}

/// Normalize and validate an ISO-4217 style code: exactly three ASCII letters.
/// Returns the uppercase form.
pub fn normalize_currency(code: &str) -> Result<String, ChatShopError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ChatShopError::Validation(format!(
            "invalid currency code: {code:?}"
        )))
    }
}

/// Convert a major-unit amount into minor units (kobo, cents, pesewas).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert minor units back into a major-unit amount.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display symbol for a currency, falling back to the code itself.
#[must_use]
pub fn currency_symbol(currency: &str) -> &str {
    match currency {
        "NGN" => "₦",
        "USD" => "$",
        "GHS" => "₵",
        "ZAR" => "R",
        "KES" => "KSh",
        "EUR" => "€",
        "GBP" => "£",
        other => other,
    }
}

/// Format an amount for display, e.g. `₦5,000.00`.
#[must_use]
pub fn format_amount(amount: f64, currency: &str) -> String {
    let minor = to_minor_units(amount.abs());
    let whole = (minor / 100).to_string();
    let cents = minor % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{}{grouped}.{cents:02}", currency_symbol(currency))
}

/// A percentage-plus-flat transaction fee schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    /// Percentage of the amount, e.g. `1.5` for 1.5%.
    pub percentage: f64,
    /// Flat fee added on top, in major units.
    pub flat: f64,
    /// The flat fee is waived for amounts strictly below this threshold.
    pub flat_waived_below: Option<f64>,
    /// Upper bound on the total fee.
    pub cap: Option<f64>,
}

impl FeeSchedule {
    /// Compute the fee for `amount`, rounded to two decimals.
    #[must_use]
    pub fn calculate(&self, amount: f64) -> f64 {
        let mut fee = amount * self.percentage / 100.0;
        let waived = self.flat_waived_below.is_some_and(|t| amount < t);
        if !waived {
            fee += self.flat;
        }
        if let Some(cap) = self.cap {
            fee = fee.min(cap);
        }
        round2(fee)
    }
}
