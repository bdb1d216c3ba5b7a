use std::sync::LazyLock;

use chatshop_core::ChatShopError;
use chatshop_core::money::{normalize_currency, validate_amount};
use chatshop_gateway::Customer;
use regex::Regex;

/// Pragmatic address check: one `@`, no whitespace, a dotted domain.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub(crate) fn gateway_id(id: &str) -> Result<&str, ChatShopError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ChatShopError::Validation("gateway id is required".into()));
    }
    Ok(id)
}

pub(crate) fn reference(reference: &str) -> Result<&str, ChatShopError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ChatShopError::Validation(
            "transaction reference is required".into(),
        ));
    }
    Ok(reference)
}

/// Validated payment input: amount, upper-cased currency, trimmed customer.
pub(crate) fn payment(
    amount: f64,
    currency: &str,
    customer: &Customer,
) -> Result<(f64, String, Customer), ChatShopError> {
    let amount = validate_amount(amount)?;
    let currency = normalize_currency(currency)?;
    let email = customer.email.trim();
    if email.is_empty() {
        return Err(ChatShopError::Validation(
            "customer email is required".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ChatShopError::Validation(format!(
            "invalid customer email: {email}"
        )));
    }
    let customer = Customer {
        email: email.to_owned(),
        name: customer.name.as_deref().map(str::trim).map(str::to_owned),
        phone: customer.phone.as_deref().map(str::trim).map(str::to_owned),
    };
    Ok((amount, currency, customer))
}
