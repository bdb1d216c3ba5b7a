use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(GatewayId, "Identifies a registered payment gateway.");

impl GatewayId {
    /// Whether the identifier uses only the allowed charset
    /// (ASCII alphanumerics, `_` and `-`) and is non-empty.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_from_str() {
        let id = GatewayId::from("paystack");
        assert_eq!(id.as_str(), "paystack");
        assert_eq!(&*id, "paystack");
    }

    #[test]
    fn newtype_serializes_transparently() {
        let id = GatewayId::new("paystack");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"paystack\"");
    }

    #[test]
    fn gateway_id_charset() {
        assert!(GatewayId::new("paystack").is_well_formed());
        assert!(GatewayId::new("pay_stack-2").is_well_formed());
        assert!(!GatewayId::new("").is_well_formed());
        assert!(!GatewayId::new("pay stack").is_well_formed());
        assert!(!GatewayId::new("pay/stack").is_well_formed());
        assert!(!GatewayId::new("päystack").is_well_formed());
    }
}
