use std::collections::BTreeSet;

/// Decides whether premium gateways may be instantiated.
pub trait LicenseCheck: Send + Sync {
    /// Whether the premium feature `gateway_id` is unlocked.
    fn is_premium_available(&self, gateway_id: &str) -> bool;
}

/// A license fixed at startup: either everything premium is unlocked, or
/// only an explicit list of gateways.
#[derive(Debug, Clone, Default)]
pub struct StaticLicense {
    all_premium: bool,
    unlocked: BTreeSet<String>,
}

impl StaticLicense {
    /// No premium features.
    pub fn free() -> Self {
        Self::default()
    }

    /// Every premium feature.
    pub fn premium() -> Self {
        Self {
            all_premium: true,
            unlocked: BTreeSet::new(),
        }
    }

    /// Only the listed gateways.
    pub fn unlocked<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            all_premium: false,
            unlocked: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl LicenseCheck for StaticLicense {
    fn is_premium_available(&self, gateway_id: &str) -> bool {
        self.all_premium || self.unlocked.contains(gateway_id)
    }
}
