pub mod service;

pub use service::{BridgeReceipt, HederaError, HederaService};
