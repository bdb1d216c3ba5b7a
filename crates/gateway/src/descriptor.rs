use std::collections::BTreeSet;

use chatshop_core::GatewayId;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Well-known capability names.
pub mod capability {
    pub const PAYMENTS: &str = "payments";
    pub const PAYMENT_LINKS: &str = "payment_links";
    pub const VERIFICATION: &str = "verification";
    pub const WEBHOOKS: &str = "webhooks";
    pub const REFUNDS: &str = "refunds";
}

/// Static facts about a gateway, registered once per id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDescriptor {
    pub id: GatewayId,
    pub display_name: String,
    pub supported_currencies: BTreeSet<String>,
    pub supported_countries: BTreeSet<String>,
    pub capabilities: BTreeSet<String>,
    /// Requires a premium license to instantiate.
    pub premium: bool,
    /// Name of the implementation registered with
    /// [`GatewayRegistry::register_implementation`](crate::GatewayRegistry::register_implementation).
    pub class_ref: String,
    /// Lower sorts first.
    pub priority: i32,
}

impl GatewayDescriptor {
    pub fn new(
        id: impl Into<GatewayId>,
        display_name: impl Into<String>,
        class_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            supported_currencies: BTreeSet::new(),
            supported_countries: BTreeSet::new(),
            capabilities: BTreeSet::new(),
            premium: false,
            class_ref: class_ref.into(),
            priority: 10,
        }
    }

    #[must_use]
    pub fn with_currencies<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.supported_currencies = currencies
            .into_iter()
            .map(|c| c.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.supported_countries = countries
            .into_iter()
            .map(|c| c.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn premium(mut self, premium: bool) -> Self {
        self.premium = premium;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Reject descriptors with a malformed id or missing required fields.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self.id.is_well_formed() {
            return Err(RegistryError::InvalidId(self.id.to_string()));
        }
        if self.display_name.trim().is_empty() {
            return Err(RegistryError::InvalidDescriptor(format!(
                "{}: display_name is required",
                self.id
            )));
        }
        if self.class_ref.trim().is_empty() {
            return Err(RegistryError::InvalidDescriptor(format!(
                "{}: class_ref is required",
                self.id
            )));
        }
        Ok(())
    }

    pub fn supports_currency(&self, currency: &str) -> bool {
        self.supported_currencies
            .contains(&currency.to_ascii_uppercase())
    }

    pub fn supports_country(&self, country: &str) -> bool {
        self.supported_countries
            .contains(&country.to_ascii_uppercase())
    }

    /// True when every requested capability is supported.
    pub fn supports_all(&self, capabilities: &[&str]) -> bool {
        capabilities.iter().all(|c| self.capabilities.contains(*c))
    }

    /// Absent filters always pass.
    pub fn matches_location(&self, country: Option<&str>, currency: Option<&str>) -> bool {
        country.is_none_or(|c| self.supports_country(c))
            && currency.is_none_or(|c| self.supports_currency(c))
    }
}
