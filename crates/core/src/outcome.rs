use serde::{Deserialize, Serialize};

use crate::error::ChatShopError;

/// The stable `{success, message, data}` envelope returned by every public
/// payment operation, regardless of which gateway served it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl OperationResult {
    /// Create a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Create a failed result with no payload.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Create a failed result carrying a payload.
    #[must_use]
    pub fn failure_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Look up a string field inside `data`.
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.as_ref()?.get(field)?.as_str()
    }
}

impl From<ChatShopError> for OperationResult {
    fn from(err: ChatShopError) -> Self {
        let mut data = serde_json::json!({ "error_kind": err.kind() });
        if let ChatShopError::RateLimited { retry_after } = &err {
            data["retry_after"] = serde_json::json!(retry_after);
        }
        Self::failure_with_data(err.to_string(), data)
    }
}
