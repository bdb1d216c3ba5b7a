pub mod config;
pub mod descriptor;
pub mod error;
pub mod gateway;
pub mod license;
pub mod reference;
pub mod registry;
pub mod signature;

pub use config::GatewayConfig;
pub use descriptor::{GatewayDescriptor, capability};
pub use error::{GatewayError, RegistryError};
pub use gateway::{Customer, DynGateway, Gateway, PaymentRequest, WebhookOutcome, WebhookPayload};
pub use license::{LicenseCheck, StaticLicense};
pub use registry::{GatewayConstructor, GatewayHealth, GatewayRegistry};
