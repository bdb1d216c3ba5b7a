//! HTTP server for ChatShop.
//!
//! Loads [`config::ChatShopConfig`], assembles the services in
//! [`bootstrap`], and serves the webhook receiver and health endpoint from
//! [`api`].

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod telemetry;
