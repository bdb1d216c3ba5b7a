//! Paystack gateway for ChatShop.
//!
//! Implements the [`Gateway`](chatshop_gateway::Gateway) trait against the
//! [Paystack API](https://paystack.com/docs/api/): hosted checkout through
//! `POST /transaction/initialize`, verification through
//! `GET /transaction/verify/{reference}`, and HMAC-SHA512 signed webhooks.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use chatshop_core::EventBus;
//! use chatshop_gateway::{GatewayConfig, GatewayRegistry};
//!
//! let registry = GatewayRegistry::new(EventBus::default());
//! chatshop_paystack::install(&registry).unwrap();
//! registry
//!     .configure("paystack", GatewayConfig::new().with("secret_key", "sk_live_..."))
//!     .unwrap();
//! registry.enable("paystack").unwrap();
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::PaystackConfig;
pub use error::PaystackError;
pub use gateway::{
    CLASS_REF, GATEWAY_ID, INTERNATIONAL_FEES, NGN_FEES, PaystackGateway, constructor, descriptor,
    install, transaction_fee,
};
