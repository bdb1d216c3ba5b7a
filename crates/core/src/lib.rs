pub mod clock;
pub mod error;
pub mod event;
pub mod money;
pub mod outcome;
pub mod types;

pub use clock::Clock;
pub use error::ChatShopError;
pub use event::{DomainEvent, EventBus, EventEnvelope};
pub use money::FeeSchedule;
pub use outcome::OperationResult;
pub use types::GatewayId;
