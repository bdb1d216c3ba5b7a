use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking orchestrator outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    /// Payments and payment links handed to a gateway.
    pub payments_attempted: AtomicU64,
    /// Payments and payment links the gateway accepted.
    pub payments_succeeded: AtomicU64,
    /// Payments and payment links that failed at the gateway.
    pub payments_failed: AtomicU64,
    /// Successfully generated payment links (subset of `payments_succeeded`).
    pub links_generated: AtomicU64,
    /// Verification calls handed to a gateway.
    pub verifications: AtomicU64,
    /// Webhooks that passed signature verification.
    pub webhooks_accepted: AtomicU64,
    /// Webhooks rejected by the gateway.
    pub webhooks_rejected: AtomicU64,
    /// Requests refused before reaching a gateway because of bad input.
    pub validation_rejections: AtomicU64,
    /// Requests naming an unknown, disabled or unbuildable gateway.
    pub resolution_failures: AtomicU64,
    /// Gateway calls that panicked.
    pub gateway_panics: AtomicU64,
}

impl OrchestratorMetrics {
    pub fn increment_payments_attempted(&self) {
        self.payments_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_payments_succeeded(&self) {
        self.payments_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_payments_failed(&self) {
        self.payments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_links_generated(&self) {
        self.links_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_verifications(&self) {
        self.verifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_webhooks_accepted(&self) {
        self.webhooks_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_webhooks_rejected(&self) {
        self.webhooks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_rejections(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_resolution_failures(&self) {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_gateway_panics(&self) {
        self.gateway_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            payments_attempted: self.payments_attempted.load(Ordering::Relaxed),
            payments_succeeded: self.payments_succeeded.load(Ordering::Relaxed),
            payments_failed: self.payments_failed.load(Ordering::Relaxed),
            links_generated: self.links_generated.load(Ordering::Relaxed),
            verifications: self.verifications.load(Ordering::Relaxed),
            webhooks_accepted: self.webhooks_accepted.load(Ordering::Relaxed),
            webhooks_rejected: self.webhooks_rejected.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            gateway_panics: self.gateway_panics.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`OrchestratorMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub payments_attempted: u64,
    pub payments_succeeded: u64,
    pub payments_failed: u64,
    pub links_generated: u64,
    pub verifications: u64,
    pub webhooks_accepted: u64,
    pub webhooks_rejected: u64,
    pub validation_rejections: u64,
    pub resolution_failures: u64,
    pub gateway_panics: u64,
}
