// storefront/src/services/mod.rs

pub mod esewa;
pub mod signature;

pub use esewa::{EsewaClient, GatewayClient, GatewayStatus, StatusQuery};
