use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chatshop_core::{DomainEvent, EventBus, GatewayId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::descriptor::GatewayDescriptor;
use crate::error::{GatewayError, RegistryError};
use crate::gateway::DynGateway;
use crate::license::{LicenseCheck, StaticLicense};

/// Builds a gateway instance from its configuration.
pub type GatewayConstructor =
    Arc<dyn Fn(&GatewayConfig) -> Result<Arc<dyn DynGateway>, GatewayError> + Send + Sync>;

/// Result of a single gateway health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayHealth {
    pub id: GatewayId,
    pub healthy: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    descriptor: GatewayDescriptor,
    enabled: bool,
    config: GatewayConfig,
}

type InstanceKey = (GatewayId, String);

/// Registry and factory for payment gateways.
///
/// Holds descriptors in registration order together with their enabled flag
/// and configuration, the implementation constructors they refer to, and a
/// cache of live instances keyed by `(id, config fingerprint)`.
///
/// Mutations take the write side of a readers-writer lock, so enumerations
/// never observe a half-applied change. The instance cache has its own
/// mutex, held across the descriptor lookup and construction so one
/// configuration is only ever built once. Lock order is instances, then
/// entries.
pub struct GatewayRegistry {
    entries: RwLock<Vec<Entry>>,
    implementations: RwLock<HashMap<String, GatewayConstructor>>,
    instances: Mutex<HashMap<InstanceKey, Arc<dyn DynGateway>>>,
    license: Arc<dyn LicenseCheck>,
    default_gateway: RwLock<Option<GatewayId>>,
    events: EventBus,
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("gateways", &self.ids())
            .field("cached_instances", &self.cached_instances())
            .finish_non_exhaustive()
    }
}

impl GatewayRegistry {
    /// Create an empty registry without premium features.
    pub fn new(events: EventBus) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            implementations: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            license: Arc::new(StaticLicense::free()),
            default_gateway: RwLock::new(None),
            events,
        }
    }

    #[must_use]
    pub fn with_license(mut self, license: Arc<dyn LicenseCheck>) -> Self {
        self.license = license;
        self
    }

    /// The gateway preferred by [`best_gateway`](Self::best_gateway).
    pub fn set_default_gateway(&self, id: Option<GatewayId>) {
        *self.default_gateway.write() = id;
    }

    pub fn default_gateway(&self) -> Option<GatewayId> {
        self.default_gateway.read().clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // -- registration --

    /// Make an implementation available under `class_ref`. Replaces any
    /// earlier constructor with the same name.
    pub fn register_implementation(&self, class_ref: impl Into<String>, ctor: GatewayConstructor) {
        let class_ref = class_ref.into();
        debug!(class_ref = %class_ref, "gateway implementation registered");
        self.implementations.write().insert(class_ref, ctor);
    }

    /// Register a descriptor. The gateway starts disabled with an empty
    /// configuration.
    pub fn register(&self, descriptor: GatewayDescriptor) -> Result<(), RegistryError> {
        descriptor.validate()?;
        let id = descriptor.id.clone();
        {
            let mut entries = self.entries.write();
            if entries.iter().any(|e| e.descriptor.id == id) {
                return Err(RegistryError::AlreadyRegistered(id.to_string()));
            }
            entries.push(Entry {
                descriptor,
                enabled: false,
                config: GatewayConfig::default(),
            });
        }
        info!(gateway = %id, "gateway registered");
        self.events.emit(DomainEvent::GatewayRegistered {
            gateway: id.to_string(),
        });
        Ok(())
    }

    /// Remove a descriptor and evict its cached instances. Returns `false`
    /// for an id that is not registered.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|e| e.descriptor.id.as_str() != id);
            entries.len() != before
        };
        if !removed {
            return false;
        }
        self.evict(id, None);
        info!(gateway = id, "gateway unregistered");
        self.events.emit(DomainEvent::GatewayUnregistered {
            gateway: id.to_owned(),
        });
        true
    }

    fn evict(&self, id: &str, keep_fingerprint: Option<&str>) {
        self.instances
            .lock()
            .retain(|(gid, fp), _| gid.as_str() != id || Some(fp.as_str()) == keep_fingerprint);
    }

    fn update<T>(&self, id: &str, f: impl FnOnce(&mut Entry) -> T) -> Result<T, RegistryError> {
        let mut entries = self.entries.write();
        entries
            .iter_mut()
            .find(|e| e.descriptor.id.as_str() == id)
            .map(f)
            .ok_or_else(|| RegistryError::NotRegistered(id.to_owned()))
    }

    /// Switch a gateway on. Emits `component_activated` when the flag
    /// changes. License gating is not checked here but at
    /// [`create`](Self::create) time.
    pub fn enable(&self, id: &str) -> Result<(), RegistryError> {
        let was_enabled = self.update(id, |e| std::mem::replace(&mut e.enabled, true))?;
        if !was_enabled {
            info!(gateway = id, "gateway enabled");
            self.events.emit(DomainEvent::ComponentActivated {
                component: id.to_owned(),
            });
        }
        Ok(())
    }

    pub fn disable(&self, id: &str) -> Result<(), RegistryError> {
        let was_enabled = self.update(id, |e| std::mem::replace(&mut e.enabled, false))?;
        if was_enabled {
            info!(gateway = id, "gateway disabled");
        }
        Ok(())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.descriptor.id.as_str() == id && e.enabled)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.descriptor.id.as_str() == id)
    }

    /// Replace a gateway's configuration. Instances built from any other
    /// configuration are evicted.
    pub fn configure(&self, id: &str, config: GatewayConfig) -> Result<(), RegistryError> {
        let fingerprint = config.fingerprint();
        self.update(id, |e| e.config = config)?;
        self.evict(id, Some(&fingerprint));
        debug!(gateway = id, "gateway configuration updated");
        Ok(())
    }

    pub fn set_priority(&self, id: &str, priority: i32) -> Result<(), RegistryError> {
        self.update(id, |e| e.descriptor.priority = priority)
    }

    pub fn descriptor(&self, id: &str) -> Option<GatewayDescriptor> {
        self.entries
            .read()
            .iter()
            .find(|e| e.descriptor.id.as_str() == id)
            .map(|e| e.descriptor.clone())
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<GatewayId> {
        self.entries
            .read()
            .iter()
            .map(|e| e.descriptor.id.clone())
            .collect()
    }

    // -- instantiation --

    /// Get or build the instance for the gateway's current configuration.
    ///
    /// Repeated calls with an unchanged configuration return the same
    /// `Arc`.
    pub fn create(&self, id: &str) -> Result<Arc<dyn DynGateway>, RegistryError> {
        // Taken before the descriptor is read: `configure` and `unregister`
        // evict under this lock, so they either land before the read or
        // evict what gets inserted here.
        let mut instances = self.instances.lock();
        let (descriptor, config) = {
            let entries = self.entries.read();
            let entry = entries
                .iter()
                .find(|e| e.descriptor.id.as_str() == id)
                .ok_or_else(|| RegistryError::NotRegistered(id.to_owned()))?;
            (entry.descriptor.clone(), entry.config.clone())
        };

        if descriptor.premium && !self.license.is_premium_available(id) {
            return Err(RegistryError::NotAvailable(format!(
                "{id} requires a premium license"
            )));
        }

        let ctor = self
            .implementations
            .read()
            .get(&descriptor.class_ref)
            .cloned()
            .ok_or_else(|| RegistryError::ClassNotFound(descriptor.class_ref.clone()))?;

        let key = (descriptor.id.clone(), config.fingerprint());
        if let Some(existing) = instances.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let built = catch_unwind(AssertUnwindSafe(|| ctor(&config)))
            .map_err(|_| RegistryError::ConstructionFailed(format!("{id}: constructor panicked")))?
            .map_err(|e| RegistryError::ConstructionFailed(format!("{id}: {e}")))?;
        debug!(gateway = id, "gateway instance created");
        instances.insert(key, Arc::clone(&built));
        Ok(built)
    }

    /// Drop every cached instance.
    pub fn clear_cache(&self) {
        self.instances.lock().clear();
    }

    pub fn cached_instances(&self) -> usize {
        self.instances.lock().len()
    }

    // -- queries --

    fn collect(&self, pred: impl Fn(&Entry) -> bool) -> Vec<GatewayDescriptor> {
        self.entries
            .read()
            .iter()
            .filter(|e| pred(e))
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Registered descriptors, optionally only the enabled ones.
    pub fn available(&self, enabled_only: bool) -> Vec<GatewayDescriptor> {
        self.collect(|e| !enabled_only || e.enabled)
    }

    /// Enabled descriptors by ascending priority, ties in registration order.
    pub fn enabled_sorted_by_priority(&self) -> Vec<GatewayDescriptor> {
        let mut out = self.available(true);
        out.sort_by_key(|d| d.priority);
        out
    }

    /// Descriptors supporting every capability in `capabilities`.
    pub fn supporting(&self, capabilities: &[&str]) -> Vec<GatewayDescriptor> {
        self.collect(|e| e.descriptor.supports_all(capabilities))
    }

    /// Descriptors serving the given country and currency. `None` skips
    /// that filter.
    pub fn for_location(
        &self,
        country: Option<&str>,
        currency: Option<&str>,
    ) -> Vec<GatewayDescriptor> {
        self.collect(|e| e.descriptor.matches_location(country, currency))
    }

    /// Pick a gateway for a payment.
    ///
    /// Candidates are enabled, configured, support `currency` and, when
    /// given, `country`. The default gateway wins if it is a candidate;
    /// otherwise the first candidate in registration order.
    pub fn best_gateway(
        &self,
        amount: f64,
        currency: &str,
        country: Option<&str>,
    ) -> Option<GatewayId> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }

        let candidates: Vec<GatewayId> = self
            .collect(|e| e.enabled && e.descriptor.matches_location(country, Some(currency)))
            .into_iter()
            .map(|d| d.id)
            .filter(|id| match self.create(id) {
                Ok(gw) => gw.is_configured(),
                Err(e) => {
                    debug!(gateway = %id, error = %e, "gateway skipped for selection");
                    false
                }
            })
            .collect();

        if let Some(default) = self.default_gateway() {
            if candidates.contains(&default) {
                return Some(default);
            }
        }
        candidates.into_iter().next()
    }

    /// Run the health check of every enabled gateway, in registration order.
    pub async fn health_check_all(&self) -> Vec<GatewayHealth> {
        let mut out = Vec::new();
        for descriptor in self.available(true) {
            let result = match self.create(descriptor.id.as_str()) {
                Ok(gw) => gw.health_check().await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(ref e) = result {
                warn!(gateway = %descriptor.id, error = %e, "gateway health check failed");
            }
            out.push(GatewayHealth {
                id: descriptor.id,
                healthy: result.is_ok(),
                error: result.err(),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chatshop_core::OperationResult;

    use super::*;
    use crate::descriptor::capability;
    use crate::gateway::{Gateway, PaymentRequest, WebhookOutcome, WebhookPayload};

    type BuildResult = Result<Arc<dyn DynGateway>, GatewayError>;

    struct StubGateway {
        id: String,
        configured: bool,
    }

    impl Gateway for StubGateway {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "Stub"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn process_payment(
            &self,
            _request: &PaymentRequest,
        ) -> Result<OperationResult, GatewayError> {
            Ok(OperationResult::success("ok", None))
        }

        async fn verify_transaction(
            &self,
            _reference: &str,
        ) -> Result<OperationResult, GatewayError> {
            Ok(OperationResult::success("ok", None))
        }

        async fn handle_webhook(
            &self,
            _payload: &WebhookPayload,
        ) -> Result<WebhookOutcome, GatewayError> {
            Err(GatewayError::InvalidSignature)
        }

        async fn health_check(&self) -> Result<(), GatewayError> {
            if self.configured {
                Ok(())
            } else {
                Err(GatewayError::NotConfigured(self.id.clone()))
            }
        }
    }

    /// Builds a stub whose `configured` flag follows the `secret_key` credential.
    fn stub_ctor(id: &'static str) -> GatewayConstructor {
        Arc::new(move |cfg: &GatewayConfig| -> BuildResult {
            let gw: Arc<dyn DynGateway> = Arc::new(StubGateway {
                id: id.to_owned(),
                configured: cfg.require("secret_key").is_some(),
            });
            Ok(gw)
        })
    }

    fn descriptor(id: &str) -> GatewayDescriptor {
        GatewayDescriptor::new(id, id.to_uppercase(), id)
            .with_currencies(["NGN"])
            .with_countries(["NG"])
            .with_capabilities([capability::PAYMENTS])
    }

    fn registry_with(ids: &[&'static str]) -> GatewayRegistry {
        let reg = GatewayRegistry::new(EventBus::default());
        for id in ids {
            reg.register_implementation(*id, stub_ctor(id));
            reg.register(descriptor(id)).unwrap();
            reg.configure(id, GatewayConfig::new().with("secret_key", "sk"))
                .unwrap();
            reg.enable(id).unwrap();
        }
        reg
    }

    #[test]
    fn register_rejects_duplicates_and_bad_ids() {
        let reg = GatewayRegistry::new(EventBus::default());
        reg.register(descriptor("paystack")).unwrap();
        assert_eq!(
            reg.register(descriptor("paystack")),
            Err(RegistryError::AlreadyRegistered("paystack".into()))
        );
        assert!(matches!(
            reg.register(descriptor("pay/stack")),
            Err(RegistryError::InvalidId(_))
        ));
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = registry_with(&["paystack"]);
        reg.create("paystack").unwrap();
        assert_eq!(reg.cached_instances(), 1);

        assert!(reg.unregister("paystack"));
        assert!(!reg.unregister("paystack"));
        assert!(!reg.unregister("never"));
        assert_eq!(reg.cached_instances(), 0);
    }

    #[test]
    fn create_round_trip_and_cache_identity() {
        let reg = registry_with(&["paystack"]);
        let a = reg.create("paystack").unwrap();
        let b = reg.create("paystack").unwrap();
        assert_eq!(a.id(), "paystack");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn reconfigure_evicts_stale_instance() {
        let reg = registry_with(&["paystack"]);
        let a = reg.create("paystack").unwrap();
        reg.configure("paystack", GatewayConfig::new().with("secret_key", "sk_2"))
            .unwrap();
        assert_eq!(reg.cached_instances(), 0);
        let b = reg.create("paystack").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        // Same config again keeps the live instance.
        reg.configure("paystack", GatewayConfig::new().with("secret_key", "sk_2"))
            .unwrap();
        assert!(Arc::ptr_eq(&b, &reg.create("paystack").unwrap()));

        reg.clear_cache();
        assert_eq!(reg.cached_instances(), 0);
    }

    #[test]
    fn unregister_during_construction_leaves_no_stale_instance() {
        use std::sync::mpsc;
        use std::time::{Duration, Instant};

        let reg = Arc::new(GatewayRegistry::new(EventBus::default()));
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let resume_rx = Mutex::new(resume_rx);
        let slow: GatewayConstructor = Arc::new(move |cfg: &GatewayConfig| -> BuildResult {
            entered_tx.lock().send(()).unwrap();
            resume_rx.lock().recv().unwrap();
            let gw: Arc<dyn DynGateway> = Arc::new(StubGateway {
                id: "slow".into(),
                configured: cfg.require("secret_key").is_some(),
            });
            Ok(gw)
        });
        reg.register_implementation("slow", slow);
        reg.register(descriptor("slow")).unwrap();
        reg.configure("slow", GatewayConfig::new().with("secret_key", "sk"))
            .unwrap();

        let creator = std::thread::spawn({
            let reg = Arc::clone(&reg);
            move || reg.create("slow").unwrap()
        });
        entered_rx.recv().unwrap();

        let remover = std::thread::spawn({
            let reg = Arc::clone(&reg);
            move || reg.unregister("slow")
        });
        let deadline = Instant::now() + Duration::from_secs(5);
        while reg.is_registered("slow") {
            assert!(Instant::now() < deadline, "unregister never ran");
            std::thread::yield_now();
        }
        resume_tx.send(()).unwrap();

        let stale = creator.join().unwrap();
        assert!(remover.join().unwrap());
        assert_eq!(reg.cached_instances(), 0);

        // Same id and configuration again must build afresh.
        reg.register(descriptor("slow")).unwrap();
        reg.configure("slow", GatewayConfig::new().with("secret_key", "sk"))
            .unwrap();
        let creator = std::thread::spawn({
            let reg = Arc::clone(&reg);
            move || reg.create("slow").unwrap()
        });
        entered_rx.recv().unwrap();
        resume_tx.send(()).unwrap();
        let fresh = creator.join().unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
    }

    #[test]
    fn create_error_kinds() {
        let reg = GatewayRegistry::new(EventBus::default());
        assert_eq!(
            reg.create("ghost").err(),
            Some(RegistryError::NotRegistered("ghost".into()))
        );

        reg.register(descriptor("orphan")).unwrap();
        assert_eq!(
            reg.create("orphan").err(),
            Some(RegistryError::ClassNotFound("orphan".into()))
        );

        reg.register(descriptor("premium").premium(true)).unwrap();
        reg.register_implementation("premium", stub_ctor("premium"));
        reg.enable("premium").unwrap();
        assert!(matches!(
            reg.create("premium"),
            Err(RegistryError::NotAvailable(_))
        ));

        reg.register(descriptor("broken")).unwrap();
        reg.register_implementation(
            "broken",
            Arc::new(|_: &GatewayConfig| -> BuildResult {
                Err(GatewayError::NotConfigured("boom".into()))
            }),
        );
        assert!(matches!(
            reg.create("broken"),
            Err(RegistryError::ConstructionFailed(_))
        ));

        reg.register(descriptor("panicky")).unwrap();
        reg.register_implementation(
            "panicky",
            Arc::new(|_: &GatewayConfig| -> BuildResult { panic!("boom") }),
        );
        assert!(matches!(
            reg.create("panicky"),
            Err(RegistryError::ConstructionFailed(_))
        ));
    }

    #[test]
    fn premium_license_unlocks() {
        let reg = GatewayRegistry::new(EventBus::default())
            .with_license(Arc::new(StaticLicense::premium()));
        reg.register(descriptor("premium").premium(true)).unwrap();
        reg.register_implementation("premium", stub_ctor("premium"));
        assert!(reg.create("premium").is_ok());
    }

    #[test]
    fn enable_state_machine() {
        let reg = GatewayRegistry::new(EventBus::default());
        assert_eq!(
            reg.enable("x"),
            Err(RegistryError::NotRegistered("x".into()))
        );
        reg.register(descriptor("x")).unwrap();
        assert!(!reg.is_enabled("x"));
        reg.enable("x").unwrap();
        assert!(reg.is_enabled("x"));
        reg.disable("x").unwrap();
        assert!(!reg.is_enabled("x"));
        assert!(reg.is_registered("x"));
    }

    #[tokio::test]
    async fn lifecycle_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let reg = GatewayRegistry::new(bus);
        reg.register(descriptor("paystack")).unwrap();
        reg.enable("paystack").unwrap();
        reg.enable("paystack").unwrap();
        reg.unregister("paystack");

        let names: Vec<&str> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event.name())
        .collect();
        assert_eq!(
            names,
            vec!["gateway_registered", "component_activated", "gateway_unregistered"]
        );
        assert!(rx.try_recv().is_err(), "second enable emits nothing");
    }

    #[test]
    fn queries() {
        let reg = registry_with(&["a", "b"]);
        reg.register(
            GatewayDescriptor::new("c", "C", "c")
                .with_currencies(["USD"])
                .with_countries(["US"])
                .with_capabilities([capability::PAYMENTS, capability::REFUNDS])
                .with_priority(1),
        )
        .unwrap();

        assert_eq!(reg.available(false).len(), 3);
        assert_eq!(reg.available(true).len(), 2);

        reg.enable("c").unwrap();
        let sorted: Vec<String> = reg
            .enabled_sorted_by_priority()
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(sorted, vec!["c", "a", "b"]);

        reg.set_priority("b", 0).unwrap();
        assert_eq!(reg.enabled_sorted_by_priority()[0].id.as_str(), "b");
        assert!(reg.set_priority("zz", 0).is_err());

        let refunds = reg.supporting(&[capability::PAYMENTS, capability::REFUNDS]);
        assert_eq!(refunds.len(), 1);
        assert_eq!(reg.supporting(&[capability::PAYMENTS]).len(), 3);

        assert_eq!(reg.for_location(Some("NG"), None).len(), 2);
        assert_eq!(reg.for_location(None, Some("USD")).len(), 1);
        assert_eq!(reg.for_location(None, None).len(), 3);
    }

    #[test]
    fn best_gateway_prefers_default() {
        let reg = registry_with(&["flutterwave", "paystack"]);
        assert_eq!(
            reg.best_gateway(5000.0, "NGN", Some("NG")),
            Some(GatewayId::new("flutterwave"))
        );

        reg.set_default_gateway(Some(GatewayId::new("paystack")));
        assert_eq!(
            reg.best_gateway(5000.0, "NGN", Some("NG")),
            Some(GatewayId::new("paystack"))
        );

        reg.disable("paystack").unwrap();
        assert_eq!(
            reg.best_gateway(5000.0, "NGN", None),
            Some(GatewayId::new("flutterwave"))
        );
        assert_eq!(reg.best_gateway(5000.0, "USD", None), None);
        assert_eq!(reg.best_gateway(0.0, "NGN", None), None);
    }

    #[test]
    fn best_gateway_skips_unconfigured() {
        let reg = registry_with(&["flutterwave", "paystack"]);
        reg.configure("flutterwave", GatewayConfig::new()).unwrap();
        assert_eq!(
            reg.best_gateway(100.0, "NGN", Some("NG")),
            Some(GatewayId::new("paystack"))
        );
    }

    #[tokio::test]
    async fn health_check_all_reports_each_enabled() {
        let reg = registry_with(&["a", "b"]);
        reg.configure("b", GatewayConfig::new()).unwrap();
        let report = reg.health_check_all().await;
        assert_eq!(report.len(), 2);
        assert!(report[0].healthy);
        assert!(!report[1].healthy);
        assert!(report[1].error.is_some());
    }

    #[test]
    fn concurrent_create_builds_once() {
        let reg = Arc::new(GatewayRegistry::new(EventBus::default()));
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        reg.register_implementation(
            "slow",
            Arc::new(move |_: &GatewayConfig| -> BuildResult {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                let gw: Arc<dyn DynGateway> = Arc::new(StubGateway {
                    id: "slow".into(),
                    configured: true,
                });
                Ok(gw)
            }),
        );
        reg.register(descriptor("slow")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.create("slow").unwrap())
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
