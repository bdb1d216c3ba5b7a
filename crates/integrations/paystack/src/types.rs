use serde::{Deserialize, Serialize};

/// Every Paystack response wraps its payload in this envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Request body for `POST /transaction/initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeRequest {
    pub email: String,
    /// Amount in minor units (kobo, pesewas, cents).
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `data` of a successful initialize call.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaystackCustomer {
    #[serde(default)]
    pub email: Option<String>,
}

/// `data` of a verify call, and of `charge.*` webhook events.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    /// `success`, `failed`, `abandoned`, `ongoing`, `pending`, `reversed`, ...
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub customer: Option<PaystackCustomer>,
}

/// A webhook delivery body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}
