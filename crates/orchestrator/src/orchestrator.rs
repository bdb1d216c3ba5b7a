use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chatshop_audit::{PaymentAction, PaymentLogEntry, PaymentLogStore, PaymentStatus};
use chatshop_core::{ChatShopError, Clock, DomainEvent, EventBus, OperationResult};
use chatshop_gateway::reference::generate_reference;
use chatshop_gateway::{
    Customer, DynGateway, GatewayError, GatewayRegistry, PaymentRequest, WebhookOutcome,
    WebhookPayload,
};
use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use crate::builder::OrchestratorBuilder;
use crate::metrics::OrchestratorMetrics;
use crate::request::{PaymentOptions, RequestContext};
use crate::validate;

/// What a gateway call came back with: its own result, or the panic message.
type Delegated<T> = Result<Result<T, GatewayError>, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChargeKind {
    Payment,
    Link,
}

impl ChargeKind {
    fn attempt_action(self) -> PaymentAction {
        match self {
            Self::Payment => PaymentAction::PaymentAttempt,
            Self::Link => PaymentAction::PaymentLinkGeneration,
        }
    }

    fn result_action(self) -> PaymentAction {
        match self {
            Self::Payment => PaymentAction::PaymentResult,
            Self::Link => PaymentAction::PaymentLinkResult,
        }
    }

    fn attempt_message(self) -> &'static str {
        match self {
            Self::Payment => "payment attempt",
            Self::Link => "payment link requested",
        }
    }
}

/// The operation surface over a [`GatewayRegistry`].
///
/// Every operation validates its input, resolves the gateway, delegates, and
/// records attempt and result entries in the payment log. Operations never
/// return `Err` or panic; failures come back as an [`OperationResult`] with
/// `success == false`.
///
/// Bad input and unknown or disabled gateways are refused before anything
/// is logged. Once a gateway is called, both the attempt and the outcome are
/// logged, with the full error text kept in the log and a generic message
/// returned for upstream failures.
pub struct PaymentOrchestrator {
    pub(crate) registry: Arc<GatewayRegistry>,
    pub(crate) payment_log: Arc<dyn PaymentLogStore>,
    pub(crate) events: EventBus,
    pub(crate) clock: Clock,
    pub(crate) metrics: Arc<OrchestratorMetrics>,
    pub(crate) reference_prefix: String,
}

impl std::fmt::Debug for PaymentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrchestrator")
            .field("registry", &self.registry)
            .field("reference_prefix", &self.reference_prefix)
            .finish_non_exhaustive()
    }
}

impl PaymentOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    pub fn payment_log(&self) -> &Arc<dyn PaymentLogStore> {
        &self.payment_log
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Arc<OrchestratorMetrics> {
        &self.metrics
    }

    /// Start a payment with `gateway_id`.
    #[instrument(skip_all, fields(gateway = gateway_id))]
    pub async fn process_payment(
        &self,
        gateway_id: &str,
        amount: f64,
        currency: &str,
        customer: &Customer,
        options: PaymentOptions,
    ) -> OperationResult {
        self.charge(ChargeKind::Payment, gateway_id, amount, currency, customer, options)
            .await
    }

    /// Create a hosted payment page with `gateway_id`. On success
    /// `data.payment_url` holds the link.
    #[instrument(skip_all, fields(gateway = gateway_id))]
    pub async fn generate_payment_link(
        &self,
        gateway_id: &str,
        amount: f64,
        currency: &str,
        customer: &Customer,
        options: PaymentOptions,
    ) -> OperationResult {
        self.charge(ChargeKind::Link, gateway_id, amount, currency, customer, options)
            .await
    }

    /// Ask `gateway_id` for the state of `reference`.
    #[instrument(skip_all, fields(gateway = gateway_id, reference = reference))]
    pub async fn verify_payment(
        &self,
        gateway_id: &str,
        reference: &str,
        context: &RequestContext,
    ) -> OperationResult {
        let checked = validate::gateway_id(gateway_id)
            .and_then(|id| Ok((id, validate::reference(reference)?)));
        let (id, reference) = match checked {
            Ok(v) => v,
            Err(e) => return self.reject(e),
        };
        let gateway = match self.resolve(id) {
            Ok(g) => g,
            Err(e) => return self.unresolved(id, e),
        };
        let ip = context.client_ip().to_string();

        self.log(
            PaymentLogEntry::new(
                PaymentAction::Verification,
                id,
                PaymentStatus::Pending,
                self.clock.now(),
            )
            .with_reference(reference)
            .with_message("verification requested")
            .with_ip_address(&ip),
        )
        .await;
        self.metrics.increment_verifications();

        let outcome = delegate(gateway.verify_transaction(reference)).await;
        let (result, detail) = self.envelope(id, outcome);

        let mut entry = PaymentLogEntry::new(
            PaymentAction::VerificationResult,
            id,
            status_of(&result),
            self.clock.now(),
        )
        .with_reference(reference)
        .with_message(detail)
        .with_ip_address(&ip);
        if let Some(data) = &result.data {
            if let (Some(amount), Some(currency)) = (
                data.get("amount").and_then(serde_json::Value::as_f64),
                data.get("currency").and_then(serde_json::Value::as_str),
            ) {
                entry = entry.with_amount(amount, currency);
            }
            if let Some(email) = data.get("customer_email").and_then(serde_json::Value::as_str) {
                entry = entry.with_customer_email(email);
            }
        }
        self.log(entry).await;
        result
    }

    /// Hand a webhook delivery to `gateway_id` and publish the resulting
    /// domain event. Returns whether the delivery was accepted.
    pub async fn process_webhook(
        &self,
        gateway_id: &str,
        payload: &WebhookPayload,
        context: &RequestContext,
    ) -> bool {
        self.handle_webhook(gateway_id, payload, context)
            .await
            .success
    }

    /// Like [`process_webhook`](Self::process_webhook), returning the full
    /// envelope.
    #[instrument(skip_all, fields(gateway = gateway_id))]
    pub async fn handle_webhook(
        &self,
        gateway_id: &str,
        payload: &WebhookPayload,
        context: &RequestContext,
    ) -> OperationResult {
        let id = match validate::gateway_id(gateway_id) {
            Ok(id) => id,
            Err(e) => {
                self.metrics.increment_webhooks_rejected();
                return self.reject(e);
            }
        };
        let gateway = match self.resolve(id) {
            Ok(g) => g,
            Err(e) => {
                self.metrics.increment_webhooks_rejected();
                return self.unresolved(id, e);
            }
        };
        let ip = context.client_ip().to_string();

        match delegate(gateway.handle_webhook(payload)).await {
            Ok(Ok(outcome)) => self.accept_webhook(id, outcome, ip).await,
            Ok(Err(err)) => {
                self.metrics.increment_webhooks_rejected();
                warn!(gateway = id, error = %err, "webhook rejected");
                self.log(
                    PaymentLogEntry::new(
                        PaymentAction::Webhook,
                        id,
                        PaymentStatus::Failed,
                        self.clock.now(),
                    )
                    .with_message(err.to_string())
                    .with_ip_address(ip),
                )
                .await;
                match err {
                    GatewayError::InvalidSignature => {
                        OperationResult::failure("invalid webhook signature")
                    }
                    other => public_failure(other),
                }
            }
            Err(panic) => {
                self.metrics.increment_webhooks_rejected();
                self.metrics.increment_gateway_panics();
                error!(gateway = id, panic = %panic, "gateway panicked handling webhook");
                self.log(
                    PaymentLogEntry::new(
                        PaymentAction::Webhook,
                        id,
                        PaymentStatus::Failed,
                        self.clock.now(),
                    )
                    .with_message(format!("gateway panicked: {panic}"))
                    .with_ip_address(ip),
                )
                .await;
                internal_failure()
            }
        }
    }

    async fn accept_webhook(&self, id: &str, outcome: WebhookOutcome, ip: String) -> OperationResult {
        self.metrics.increment_webhooks_accepted();

        let mut entry = PaymentLogEntry::new(
            PaymentAction::Webhook,
            id,
            PaymentStatus::Success,
            self.clock.now(),
        )
        .with_message(&outcome.event_type)
        .with_ip_address(ip);
        if let Some(reference) = &outcome.reference {
            entry = entry.with_reference(reference);
        }
        if let Some(DomainEvent::PaymentCompleted {
            amount,
            currency,
            customer_email,
            ..
        }) = &outcome.event
        {
            if let (Some(amount), Some(currency)) = (amount, currency) {
                entry = entry.with_amount(*amount, currency);
            }
            if let Some(email) = customer_email {
                entry = entry.with_customer_email(email);
            }
        }
        self.log(entry).await;

        let published = outcome.event.map(|event| {
            let name = event.name();
            self.events.emit(event);
            name
        });
        info!(
            gateway = id,
            event_type = %outcome.event_type,
            published = published.unwrap_or("none"),
            "webhook accepted"
        );

        OperationResult::success(
            "Webhook processed",
            Some(serde_json::json!({
                "event_type": outcome.event_type,
                "reference": outcome.reference,
                "published": published,
            })),
        )
    }

    async fn charge(
        &self,
        kind: ChargeKind,
        gateway_id: &str,
        amount: f64,
        currency: &str,
        customer: &Customer,
        options: PaymentOptions,
    ) -> OperationResult {
        let checked = validate::gateway_id(gateway_id).and_then(|id| {
            let (amount, currency, customer) = validate::payment(amount, currency, customer)?;
            Ok((id, amount, currency, customer))
        });
        let (id, amount, currency, customer) = match checked {
            Ok(v) => v,
            Err(e) => return self.reject(e),
        };
        let gateway = match self.resolve(id) {
            Ok(g) => g,
            Err(e) => return self.unresolved(id, e),
        };

        let reference = options
            .reference
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| generate_reference(&self.reference_prefix, self.clock.now()));
        let ip = options.context.client_ip().to_string();
        let request = PaymentRequest {
            amount,
            currency,
            customer,
            reference,
            callback_url: options.callback_url,
            metadata: options.metadata,
        };

        self.log(
            self.entry_for(id, &request, kind.attempt_action(), PaymentStatus::Pending, &ip)
                .with_message(kind.attempt_message()),
        )
        .await;
        self.metrics.increment_payments_attempted();

        let outcome = match kind {
            ChargeKind::Payment => delegate(gateway.process_payment(&request)).await,
            ChargeKind::Link => delegate(gateway.generate_payment_link(&request)).await,
        };
        let (result, detail) = self.envelope(id, outcome);

        if result.success {
            self.metrics.increment_payments_succeeded();
            if kind == ChargeKind::Link {
                self.metrics.increment_links_generated();
            }
            info!(gateway = id, reference = %request.reference, "gateway accepted request");
        } else {
            self.metrics.increment_payments_failed();
        }

        self.log(
            self.entry_for(id, &request, kind.result_action(), status_of(&result), &ip)
                .with_message(detail),
        )
        .await;
        result
    }

    fn entry_for(
        &self,
        id: &str,
        request: &PaymentRequest,
        action: PaymentAction,
        status: PaymentStatus,
        ip: &str,
    ) -> PaymentLogEntry {
        PaymentLogEntry::new(action, id, status, self.clock.now())
            .with_reference(&request.reference)
            .with_amount(request.amount, &request.currency)
            .with_customer_email(&request.customer.email)
            .with_ip_address(ip)
    }

    /// Look up an enabled, configured gateway instance.
    fn resolve(&self, id: &str) -> Result<Arc<dyn DynGateway>, ChatShopError> {
        if !self.registry.is_registered(id) {
            return Err(ChatShopError::NotFound(format!("gateway {id} not found")));
        }
        if !self.registry.is_enabled(id) {
            return Err(ChatShopError::NotAvailable(format!(
                "gateway {id} is not enabled"
            )));
        }
        let gateway = self.registry.create(id)?;
        if !gateway.is_configured() {
            return Err(ChatShopError::NotAvailable(format!(
                "gateway {id} is not configured"
            )));
        }
        Ok(gateway)
    }

    /// Fold a delegated call into the caller envelope and the log message.
    fn envelope(
        &self,
        id: &str,
        outcome: Delegated<OperationResult>,
    ) -> (OperationResult, String) {
        match outcome {
            Ok(Ok(result)) => {
                let detail = result.message.clone();
                (result, detail)
            }
            Ok(Err(err)) => {
                warn!(gateway = id, error = %err, retryable = err.is_retryable(), "gateway call failed");
                let detail = err.to_string();
                (public_failure(err), detail)
            }
            Err(panic) => {
                self.metrics.increment_gateway_panics();
                error!(gateway = id, panic = %panic, "gateway panicked");
                (internal_failure(), format!("gateway panicked: {panic}"))
            }
        }
    }

    fn reject(&self, err: ChatShopError) -> OperationResult {
        self.metrics.increment_validation_rejections();
        debug!(error = %err, "request rejected");
        err.into()
    }

    fn unresolved(&self, id: &str, err: ChatShopError) -> OperationResult {
        self.metrics.increment_resolution_failures();
        warn!(gateway = id, error = %err, "gateway unavailable");
        err.into()
    }

    async fn log(&self, entry: PaymentLogEntry) {
        let action = entry.action;
        if let Err(e) = self.payment_log.append(entry).await {
            warn!(action = %action, error = %e, "failed to write payment log entry");
        }
    }
}

fn status_of(result: &OperationResult) -> PaymentStatus {
    if result.success {
        PaymentStatus::Success
    } else {
        PaymentStatus::Failed
    }
}

/// Run a gateway future, turning a panic into its message.
async fn delegate<T>(
    fut: impl std::future::Future<Output = Result<T, GatewayError>>,
) -> Delegated<T> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Caller-facing envelope for a gateway error. Upstream details stay in the
/// log.
fn public_failure(err: GatewayError) -> OperationResult {
    match ChatShopError::from(err) {
        ChatShopError::Upstream(_) => ChatShopError::Upstream(
            "the payment gateway could not complete the request".into(),
        )
        .into(),
        other => other.into(),
    }
}

fn internal_failure() -> OperationResult {
    ChatShopError::Upstream("the payment gateway could not complete the request".into()).into()
}
