use std::collections::BTreeMap;

use async_trait::async_trait;
use chatshop_core::{DomainEvent, OperationResult};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// The paying customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            phone: None,
        }
    }
}

/// A validated payment request handed to a gateway.
///
/// `amount` is in major units and `currency` is an upper-case three-letter
/// code; both are checked before a gateway ever sees the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: String,
    pub customer: Customer,
    pub reference: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A raw inbound webhook delivery.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPayload {
    pub body: Vec<u8>,
    headers: BTreeMap<String, String>,
}

impl WebhookPayload {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, GatewayError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// What a gateway made of an authenticated webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    /// The gateway's own event name, e.g. `charge.success`.
    pub event_type: String,
    pub reference: Option<String>,
    /// Domain event to publish, `None` for acknowledged-but-ignored events.
    pub event: Option<DomainEvent>,
}

/// Strongly-typed gateway trait with native `async fn`.
///
/// Not object-safe; every `Gateway` also implements [`DynGateway`] through a
/// blanket implementation, which is what the registry stores.
pub trait Gateway: Send + Sync {
    /// Identifier this instance was registered under.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Whether the credentials needed for live calls are present.
    fn is_configured(&self) -> bool;

    fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> impl std::future::Future<Output = Result<OperationResult, GatewayError>> + Send;

    fn verify_transaction(
        &self,
        reference: &str,
    ) -> impl std::future::Future<Output = Result<OperationResult, GatewayError>> + Send;

    /// Create a hosted payment page. Defaults to
    /// [`process_payment`](Self::process_payment) for gateways whose payment
    /// flow already is a redirect.
    fn generate_payment_link(
        &self,
        request: &PaymentRequest,
    ) -> impl std::future::Future<Output = Result<OperationResult, GatewayError>> + Send {
        self.process_payment(request)
    }

    /// Authenticate and interpret a webhook. Implementations must verify the
    /// signature before looking at the payload and return
    /// [`GatewayError::InvalidSignature`] when it does not match.
    fn handle_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> impl std::future::Future<Output = Result<WebhookOutcome, GatewayError>> + Send;

    fn health_check(&self) -> impl std::future::Future<Output = Result<(), GatewayError>> + Send;
}

/// Object-safe gateway trait for use behind `Arc<dyn DynGateway>`.
///
/// Implement [`Gateway`] and rely on the blanket implementation instead of
/// implementing this directly.
#[async_trait]
pub trait DynGateway: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    async fn process_payment(&self, request: &PaymentRequest)
    -> Result<OperationResult, GatewayError>;

    async fn verify_transaction(&self, reference: &str) -> Result<OperationResult, GatewayError>;

    async fn generate_payment_link(
        &self,
        request: &PaymentRequest,
    ) -> Result<OperationResult, GatewayError>;

    async fn handle_webhook(&self, payload: &WebhookPayload)
    -> Result<WebhookOutcome, GatewayError>;

    async fn health_check(&self) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: Gateway + Sync> DynGateway for T {
    fn id(&self) -> &str {
        Gateway::id(self)
    }

    fn name(&self) -> &str {
        Gateway::name(self)
    }

    fn is_configured(&self) -> bool {
        Gateway::is_configured(self)
    }

    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<OperationResult, GatewayError> {
        Gateway::process_payment(self, request).await
    }

    async fn verify_transaction(&self, reference: &str) -> Result<OperationResult, GatewayError> {
        Gateway::verify_transaction(self, reference).await
    }

    async fn generate_payment_link(
        &self,
        request: &PaymentRequest,
    ) -> Result<OperationResult, GatewayError> {
        Gateway::generate_payment_link(self, request).await
    }

    async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, GatewayError> {
        Gateway::handle_webhook(self, payload).await
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        Gateway::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct EchoGateway;

    impl Gateway for EchoGateway {
        fn id(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn process_payment(
            &self,
            request: &PaymentRequest,
        ) -> Result<OperationResult, GatewayError> {
            Ok(OperationResult::success(
                "ok",
                Some(serde_json::json!({ "reference": request.reference })),
            ))
        }

        async fn verify_transaction(
            &self,
            _reference: &str,
        ) -> Result<OperationResult, GatewayError> {
            Err(GatewayError::Upstream("unknown reference".into()))
        }

        async fn handle_webhook(
            &self,
            _payload: &WebhookPayload,
        ) -> Result<WebhookOutcome, GatewayError> {
            Err(GatewayError::InvalidSignature)
        }

        async fn health_check(&self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: 100.0,
            currency: "NGN".into(),
            customer: Customer::new("a@b.com"),
            reference: "R1".into(),
            callback_url: None,
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn blanket_dyn_impl_and_default_link() {
        let gw: Arc<dyn DynGateway> = Arc::new(EchoGateway);
        assert_eq!(gw.id(), "echo");
        let link = gw.generate_payment_link(&request()).await.unwrap();
        assert!(link.success);
        assert_eq!(link.data_str("reference"), Some("R1"));
        assert!(gw.verify_transaction("R1").await.is_err());
        gw.health_check().await.unwrap();
    }

    #[test]
    fn webhook_headers_are_case_insensitive() {
        let payload = WebhookPayload::new(br#"{"event":"charge.success"}"#.to_vec())
            .with_header("X-Paystack-Signature", "abc");
        assert_eq!(payload.header("x-paystack-signature"), Some("abc"));
        assert_eq!(payload.header("X-PAYSTACK-SIGNATURE"), Some("abc"));
        assert_eq!(payload.json().unwrap()["event"], "charge.success");
    }
}
