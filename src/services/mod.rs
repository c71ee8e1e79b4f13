pub mod availability_service;
pub mod hedera;
pub mod market_depth_service;
pub mod pricing_service;
pub mod reservation_service;
