mod store;

pub use store::MemoryPaymentLog;
