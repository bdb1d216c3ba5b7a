use std::sync::Arc;

use chatshop_core::money::{format_amount, from_minor_units, to_minor_units, validate_amount};
use chatshop_core::{DomainEvent, FeeSchedule, OperationResult};
use chatshop_gateway::signature::verify_hmac_sha512;
use chatshop_gateway::{
    Gateway, GatewayConfig, GatewayConstructor, GatewayDescriptor, GatewayError, GatewayRegistry,
    PaymentRequest, RegistryError, WebhookOutcome, WebhookPayload, capability,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::PaystackConfig;
use crate::error::PaystackError;
use crate::types::{
    InitializeData, InitializeRequest, PaystackEnvelope, TransactionData, WebhookEvent,
};

/// Registry id of the Paystack gateway.
pub const GATEWAY_ID: &str = "paystack";

/// Implementation name the descriptor points at.
pub const CLASS_REF: &str = "paystack";

/// Header carrying the hex HMAC-SHA512 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub const SUPPORTED_CURRENCIES: [&str; 5] = ["NGN", "GHS", "ZAR", "USD", "KES"];
pub const SUPPORTED_COUNTRIES: [&str; 4] = ["NG", "GH", "ZA", "KE"];

/// Local card fees: 1.5% + NGN 100, the flat part waived under NGN 2,500,
/// capped at NGN 2,000.
pub const NGN_FEES: FeeSchedule = FeeSchedule {
    percentage: 1.5,
    flat: 100.0,
    flat_waived_below: Some(2500.0),
    cap: Some(2000.0),
};

/// International fees: 3.9% + 100.
pub const INTERNATIONAL_FEES: FeeSchedule = FeeSchedule {
    percentage: 3.9,
    flat: 100.0,
    flat_waived_below: None,
    cap: None,
};

const DEFAULT_RETRY_AFTER: u64 = 60;

/// Expected Paystack fee for a charge of `amount` in `currency`.
pub fn transaction_fee(amount: f64, currency: &str) -> f64 {
    if currency.eq_ignore_ascii_case("NGN") {
        NGN_FEES.calculate(amount)
    } else {
        INTERNATIONAL_FEES.calculate(amount)
    }
}

/// Descriptor for registering Paystack with a [`GatewayRegistry`].
pub fn descriptor() -> GatewayDescriptor {
    GatewayDescriptor::new(GATEWAY_ID, "Paystack", CLASS_REF)
        .with_currencies(SUPPORTED_CURRENCIES)
        .with_countries(SUPPORTED_COUNTRIES)
        .with_capabilities([
            capability::PAYMENTS,
            capability::PAYMENT_LINKS,
            capability::VERIFICATION,
            capability::WEBHOOKS,
            capability::REFUNDS,
        ])
        .with_priority(1)
}

/// Registry constructor building a [`PaystackGateway`] from credentials.
pub fn constructor() -> GatewayConstructor {
    Arc::new(
        |config: &GatewayConfig| -> Result<Arc<dyn chatshop_gateway::DynGateway>, GatewayError> {
            let gateway = PaystackGateway::new(PaystackConfig::from_gateway_config(config))?;
            Ok(Arc::new(gateway))
        },
    )
}

/// Register both the implementation and the descriptor. The gateway starts
/// disabled and unconfigured.
pub fn install(registry: &GatewayRegistry) -> Result<(), RegistryError> {
    registry.register_implementation(CLASS_REF, constructor());
    registry.register(descriptor())
}

/// Paystack gateway.
pub struct PaystackGateway {
    config: PaystackConfig,
    client: Client,
}

impl std::fmt::Debug for PaystackGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaystackGateway {
    /// Create a gateway with an HTTP client honouring the configured timeout.
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Create a gateway with a custom HTTP client.
    pub fn with_client(config: PaystackConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &PaystackConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base_url)
    }

    fn transport_error(&self, e: reqwest::Error) -> PaystackError {
        if e.is_timeout() {
            PaystackError::Timeout(self.config.timeout)
        } else {
            PaystackError::Http(e)
        }
    }

    /// Send an authenticated request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaystackError> {
        let response = request
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER);
            warn!(retry_after, "Paystack API rate limit hit");
            return Err(PaystackError::RateLimited { retry_after });
        }

        if status.is_server_error() {
            warn!(status = status.as_u16(), "Paystack server error");
            return Err(PaystackError::Server {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let envelope: PaystackEnvelope<serde_json::Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => return Err(PaystackError::Api(format!("HTTP {status}"))),
        };

        if !status.is_success() || !envelope.status {
            let message = if envelope.message.is_empty() {
                format!("HTTP {status}")
            } else {
                envelope.message
            };
            return Err(PaystackError::Api(message));
        }

        let data = envelope
            .data
            .ok_or_else(|| PaystackError::Decode("response has no data".into()))?;
        Ok(serde_json::from_value(data)?)
    }

    fn check_request(request: &PaymentRequest) -> Result<(), PaystackError> {
        validate_amount(request.amount)
            .map_err(|e| PaystackError::InvalidRequest(e.to_string()))?;
        if !SUPPORTED_CURRENCIES.contains(&request.currency.as_str()) {
            return Err(PaystackError::InvalidRequest(format!(
                "currency {} is not supported by Paystack",
                request.currency
            )));
        }
        if request.customer.email.trim().is_empty() {
            return Err(PaystackError::InvalidRequest(
                "customer email is required".into(),
            ));
        }
        Ok(())
    }

    /// `POST /transaction/initialize`, shared by payments and payment links.
    async fn initialize(
        &self,
        request: &PaymentRequest,
        message: &str,
    ) -> Result<OperationResult, PaystackError> {
        if !self.config.has_secret() {
            return Err(PaystackError::MissingSecret);
        }
        Self::check_request(request)?;

        let body = InitializeRequest {
            email: request.customer.email.clone(),
            amount: to_minor_units(request.amount),
            currency: request.currency.clone(),
            reference: request.reference.clone(),
            callback_url: request.callback_url.clone(),
            metadata: request.metadata.clone(),
        };

        debug!(amount_minor = body.amount, "initializing Paystack transaction");
        let data: InitializeData = self
            .send(self.client.post(self.url("/transaction/initialize")).json(&body))
            .await?;
        info!(reference = %data.reference, "Paystack transaction initialized");

        Ok(OperationResult::success(
            message,
            Some(serde_json::json!({
                "payment_url": data.authorization_url,
                "access_code": data.access_code,
                "reference": data.reference,
                "amount": request.amount,
                "currency": request.currency,
                "fee": transaction_fee(request.amount, &request.currency),
                "gateway": GATEWAY_ID,
            })),
        ))
    }

    async fn verify(&self, reference: &str) -> Result<OperationResult, PaystackError> {
        if !self.config.has_secret() {
            return Err(PaystackError::MissingSecret);
        }
        let reference = reference.trim();
        if reference.is_empty()
            || !reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '='))
        {
            return Err(PaystackError::InvalidRequest(format!(
                "invalid transaction reference: {reference:?}"
            )));
        }

        let tx: TransactionData = self
            .send(
                self.client
                    .get(self.url(&format!("/transaction/verify/{reference}"))),
            )
            .await?;

        let data = serde_json::json!({
            "reference": tx.reference.as_deref().unwrap_or(reference),
            "status": tx.status,
            "amount": tx.amount.map(from_minor_units),
            "currency": tx.currency,
            "paid_at": tx.paid_at,
            "channel": tx.channel,
            "gateway_response": tx.gateway_response,
            "customer_email": tx.customer.as_ref().and_then(|c| c.email.clone()),
            "gateway": GATEWAY_ID,
        });

        if tx.status == "success" {
            let message = match (tx.amount, tx.currency.as_deref()) {
                (Some(minor), Some(currency)) => format!(
                    "Payment of {} verified successfully",
                    format_amount(from_minor_units(minor), currency)
                ),
                _ => "Payment verified successfully".to_owned(),
            };
            Ok(OperationResult::success(message, Some(data)))
        } else {
            debug!(status = %tx.status, "Paystack transaction not successful");
            Ok(OperationResult::failure_with_data(
                format!("Payment not successful: {}", tx.status),
                data,
            ))
        }
    }

    fn interpret_webhook(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, PaystackError> {
        if !self.config.has_secret() {
            return Err(PaystackError::MissingSecret);
        }
        let signature = payload
            .header(SIGNATURE_HEADER)
            .ok_or(PaystackError::InvalidSignature)?;
        if !verify_hmac_sha512(self.config.secret_key.as_bytes(), &payload.body, signature) {
            warn!("Paystack webhook signature mismatch");
            return Err(PaystackError::InvalidSignature);
        }

        let event: WebhookEvent = serde_json::from_slice(&payload.body)?;
        let reference = event
            .data
            .get("reference")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let domain_event = match event.event.as_str() {
            "charge.success" => {
                let tx: TransactionData = serde_json::from_value(event.data.clone())?;
                Some(DomainEvent::PaymentCompleted {
                    gateway: GATEWAY_ID.to_owned(),
                    reference: reference
                        .clone()
                        .ok_or_else(|| PaystackError::Decode("charge without reference".into()))?,
                    amount: tx.amount.map(from_minor_units),
                    currency: tx.currency,
                    customer_email: tx.customer.and_then(|c| c.email),
                    data: event.data.clone(),
                })
            }
            "charge.failed" => {
                let tx: TransactionData = serde_json::from_value(event.data.clone())?;
                Some(DomainEvent::PaymentFailed {
                    gateway: GATEWAY_ID.to_owned(),
                    reference: reference
                        .clone()
                        .ok_or_else(|| PaystackError::Decode("charge without reference".into()))?,
                    reason: tx
                        .gateway_response
                        .unwrap_or_else(|| "charge failed".to_owned()),
                    data: event.data.clone(),
                })
            }
            other => {
                debug!(event = other, "Paystack webhook acknowledged without action");
                None
            }
        };

        Ok(WebhookOutcome {
            event_type: event.event,
            reference,
            event: domain_event,
        })
    }
}

impl Gateway for PaystackGateway {
    #[allow(clippy::unnecessary_literal_bound)]
    fn id(&self) -> &str {
        GATEWAY_ID
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "Paystack"
    }

    fn is_configured(&self) -> bool {
        self.config.has_secret()
    }

    #[instrument(skip_all, fields(gateway = GATEWAY_ID, reference = %request.reference))]
    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<OperationResult, GatewayError> {
        Ok(self.initialize(request, "Payment initialized").await?)
    }

    #[instrument(skip_all, fields(gateway = GATEWAY_ID, reference = %reference))]
    async fn verify_transaction(&self, reference: &str) -> Result<OperationResult, GatewayError> {
        Ok(self.verify(reference).await?)
    }

    #[instrument(skip_all, fields(gateway = GATEWAY_ID, reference = %request.reference))]
    async fn generate_payment_link(
        &self,
        request: &PaymentRequest,
    ) -> Result<OperationResult, GatewayError> {
        Ok(self.initialize(request, "Payment link generated").await?)
    }

    #[instrument(skip_all, fields(gateway = GATEWAY_ID))]
    async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<WebhookOutcome, GatewayError> {
        Ok(self.interpret_webhook(payload)?)
    }

    #[instrument(skip_all, fields(gateway = GATEWAY_ID))]
    async fn health_check(&self) -> Result<(), GatewayError> {
        if !self.config.has_secret() {
            return Err(PaystackError::MissingSecret.into());
        }
        debug!("performing Paystack health check");
        let _banks: serde_json::Value = self
            .send(self.client.get(self.url("/bank?perPage=1")))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chatshop_core::EventBus;
    use chatshop_gateway::signature::hmac_sha512_hex;
    use chatshop_gateway::{Customer, Gateway};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// A minimal mock HTTP server that answers one request with a canned
    /// response and hands back the raw request it received.
    struct MockPaystackServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockPaystackServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_code: u16, body: &str) -> String {
            let body = body.to_owned();
            let (mut stream, _) = self.listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    fn gateway(base_url: &str) -> PaystackGateway {
        PaystackGateway::new(PaystackConfig::new("sk_test_abc").with_api_base_url(base_url))
            .unwrap()
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: 5000.0,
            currency: "NGN".into(),
            customer: Customer::new("a@b.com"),
            reference: "CS_1700000000_ABCD1234".into(),
            callback_url: Some("https://shop.example/thanks".into()),
            metadata: serde_json::Map::new(),
        }
    }

    fn signed(body: &str, secret: &str) -> WebhookPayload {
        let sig = hmac_sha512_hex(secret.as_bytes(), body.as_bytes());
        WebhookPayload::new(body).with_header("X-Paystack-Signature", sig)
    }

    #[test]
    fn descriptor_values() {
        let d = descriptor();
        assert_eq!(d.id.as_str(), "paystack");
        assert!(d.validate().is_ok());
        for c in SUPPORTED_CURRENCIES {
            assert!(d.supports_currency(c));
        }
        assert!(d.supports_country("ng"));
        assert!(!d.supports_currency("EUR"));
        assert!(d.supports_all(&[capability::PAYMENT_LINKS, capability::REFUNDS]));
        assert!(!d.premium);
    }

    #[test]
    fn fees() {
        assert!((transaction_fee(5000.0, "NGN") - 175.0).abs() < 1e-9);
        // Flat fee waived under NGN 2,500.
        assert!((transaction_fee(1000.0, "NGN") - 15.0).abs() < 1e-9);
        // Capped.
        assert!((transaction_fee(200_000.0, "NGN") - 2000.0).abs() < 1e-9);
        assert!((transaction_fee(100.0, "USD") - 103.9).abs() < 1e-9);
    }

    #[test]
    fn unconfigured_gateway() {
        let gw = PaystackGateway::new(PaystackConfig::new("")).unwrap();
        assert!(!gw.is_configured());
        assert_eq!(gw.id(), "paystack");
        assert!(!format!("{gw:?}").contains("sk_"));
    }

    #[tokio::test]
    async fn process_payment_success() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);

        let body = r#"{"status":true,"message":"Authorization URL created","data":{"authorization_url":"https://checkout.paystack.com/abc123","access_code":"abc123","reference":"CS_1700000000_ABCD1234"}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let result = gw.process_payment(&request()).await.unwrap();
        let raw = handle.await.unwrap();

        assert!(result.success);
        assert_eq!(
            result.data_str("payment_url"),
            Some("https://checkout.paystack.com/abc123")
        );
        assert_eq!(result.data_str("access_code"), Some("abc123"));
        assert_eq!(result.data.as_ref().unwrap()["fee"], 175.0);

        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /transaction/initialize "));
        assert!(lower.contains("authorization: bearer sk_test_abc"));
        assert!(raw.contains(r#""amount":500000"#));
        assert!(raw.contains(r#""currency":"NGN""#));
        assert!(raw.contains(r#""callback_url":"https://shop.example/thanks""#));
    }

    #[tokio::test]
    async fn payment_link_uses_initialize() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);

        let body = r#"{"status":true,"message":"ok","data":{"authorization_url":"https://checkout.paystack.com/link","access_code":"link","reference":"R2"}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let result = gw.generate_payment_link(&request()).await.unwrap();
        handle.await.unwrap();
        assert_eq!(result.message, "Payment link generated");
        assert_eq!(
            result.data_str("payment_url"),
            Some("https://checkout.paystack.com/link")
        );
    }

    #[tokio::test]
    async fn rejected_locally_without_network() {
        let gw = gateway("http://127.0.0.1:9");
        let mut req = request();
        req.currency = "EUR".into();
        assert!(matches!(
            gw.process_payment(&req).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        let unconfigured = PaystackGateway::new(PaystackConfig::new("")).unwrap();
        assert!(matches!(
            unconfigured.process_payment(&request()).await,
            Err(GatewayError::NotConfigured(_))
        ));
        assert!(matches!(
            gw.verify_transaction("../bank").await,
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn rate_limited_is_retryable() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_once(429, r#"{"status":false,"message":"Too many requests"}"#)
                .await
        });

        let err = gw.process_payment(&request()).await.unwrap_err();
        handle.await.unwrap();
        assert!(err.is_retryable());
        assert!(matches!(err, GatewayError::RateLimited { retry_after: 60 }));
    }

    #[tokio::test]
    async fn server_error_maps_to_connection() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let handle = tokio::spawn(async move { server.respond_once(502, "bad gateway").await });

        let err = gw.verify_transaction("R1").await.unwrap_err();
        handle.await.unwrap();
        assert!(matches!(err, GatewayError::Connection(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn api_error_carries_message() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_once(401, r#"{"status":false,"message":"Invalid key"}"#)
                .await
        });

        let err = gw.process_payment(&request()).await.unwrap_err();
        handle.await.unwrap();
        match err {
            GatewayError::Upstream(msg) => assert_eq!(msg, "Invalid key"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_success() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let body = r#"{"status":true,"message":"Verification successful","data":{"status":"success","reference":"R1","amount":500000,"currency":"NGN","paid_at":"2024-01-01T10:00:00.000Z","channel":"card","gateway_response":"Successful","customer":{"email":"a@b.com"}}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let result = gw.verify_transaction("R1").await.unwrap();
        let raw = handle.await.unwrap();

        assert!(raw.starts_with("GET /transaction/verify/R1 "));
        assert!(result.success);
        assert_eq!(result.message, "Payment of ₦5,000.00 verified successfully");
        let data = result.data.unwrap();
        assert_eq!(data["amount"], 5000.0);
        assert_eq!(data["customer_email"], "a@b.com");
        assert_eq!(data["channel"], "card");
    }

    #[tokio::test]
    async fn verify_abandoned_is_failure_envelope() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let body = r#"{"status":true,"message":"Verification successful","data":{"status":"abandoned","reference":"R1","amount":500000,"currency":"NGN"}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let result = gw.verify_transaction("R1").await.unwrap();
        handle.await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Payment not successful: abandoned");
        assert_eq!(result.data_str("status"), Some("abandoned"));
    }

    #[tokio::test]
    async fn health_check_hits_bank_list() {
        let server = MockPaystackServer::start().await;
        let gw = gateway(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_once(200, r#"{"status":true,"message":"Banks retrieved","data":[]}"#)
                .await
        });

        gw.health_check().await.unwrap();
        let raw = handle.await.unwrap();
        assert!(raw.starts_with("GET /bank"));
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gw = gateway(&format!("http://127.0.0.1:{port}"));
        let err = gw.health_check().await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
    }

    #[tokio::test]
    async fn webhook_charge_success() {
        let gw = gateway("http://127.0.0.1:9");
        let body = r#"{"event":"charge.success","data":{"reference":"R1","amount":500000,"currency":"NGN","customer":{"email":"a@b.com"}}}"#;

        let outcome = gw.handle_webhook(&signed(body, "sk_test_abc")).await.unwrap();
        assert_eq!(outcome.event_type, "charge.success");
        assert_eq!(outcome.reference.as_deref(), Some("R1"));
        match outcome.event {
            Some(DomainEvent::PaymentCompleted {
                reference,
                amount,
                currency,
                customer_email,
                ..
            }) => {
                assert_eq!(reference, "R1");
                assert_eq!(amount, Some(5000.0));
                assert_eq!(currency.as_deref(), Some("NGN"));
                assert_eq!(customer_email.as_deref(), Some("a@b.com"));
            }
            other => panic!("expected payment_completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn webhook_minimal_charge_success() {
        let gw = gateway("http://127.0.0.1:9");
        let body = r#"{"event":"charge.success","data":{"reference":"R1"}}"#;
        let outcome = gw.handle_webhook(&signed(body, "sk_test_abc")).await.unwrap();
        assert_eq!(outcome.event.map(|e| e.name()), Some("payment_completed"));
    }

    #[tokio::test]
    async fn webhook_charge_failed() {
        let gw = gateway("http://127.0.0.1:9");
        let body = r#"{"event":"charge.failed","data":{"reference":"R5","gateway_response":"Declined"}}"#;
        let outcome = gw.handle_webhook(&signed(body, "sk_test_abc")).await.unwrap();
        match outcome.event {
            Some(DomainEvent::PaymentFailed { reference, reason, .. }) => {
                assert_eq!(reference, "R5");
                assert_eq!(reason, "Declined");
            }
            other => panic!("expected payment_failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn webhook_other_events_are_acknowledged() {
        let gw = gateway("http://127.0.0.1:9");
        let body = r#"{"event":"transfer.success","data":{"reference":"T1"}}"#;
        let outcome = gw.handle_webhook(&signed(body, "sk_test_abc")).await.unwrap();
        assert_eq!(outcome.event_type, "transfer.success");
        assert!(outcome.event.is_none());
    }

    #[tokio::test]
    async fn webhook_bad_signature() {
        let gw = gateway("http://127.0.0.1:9");
        let body = r#"{"event":"charge.success","data":{"reference":"R1"}}"#;

        let wrong_key = signed(body, "sk_test_other");
        assert!(matches!(
            gw.handle_webhook(&wrong_key).await,
            Err(GatewayError::InvalidSignature)
        ));

        let unsigned = WebhookPayload::new(body);
        assert!(matches!(
            gw.handle_webhook(&unsigned).await,
            Err(GatewayError::InvalidSignature)
        ));

        let mut tampered = signed(body, "sk_test_abc");
        tampered.body = br#"{"event":"charge.success","data":{"reference":"R2"}}"#.to_vec();
        assert!(matches!(
            gw.handle_webhook(&tampered).await,
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn install_into_registry() {
        let registry = GatewayRegistry::new(EventBus::default());
        install(&registry).unwrap();
        assert!(registry.is_registered("paystack"));

        let unconfigured = registry.create("paystack").unwrap();
        assert!(!unconfigured.is_configured());

        registry
            .configure("paystack", GatewayConfig::new().with("secret_key", "sk_test_abc"))
            .unwrap();
        registry.enable("paystack").unwrap();
        let gw = registry.create("paystack").unwrap();
        assert!(gw.is_configured());
        assert_eq!(gw.name(), "Paystack");
        assert_eq!(
            registry.best_gateway(5000.0, "NGN", Some("NG")).as_deref(),
            Some("paystack")
        );
    }
}
