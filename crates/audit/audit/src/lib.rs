pub mod error;
pub mod record;
pub mod store;
pub mod testing;

pub use error::AuditError;
pub use record::{PaymentAction, PaymentLogEntry, PaymentLogPage, PaymentLogQuery, PaymentStatus};
pub use store::PaymentLogStore;
