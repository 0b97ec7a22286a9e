pub mod client;
pub mod rate_limit;

pub use client::ClientInfo;
pub use rate_limit::rate_limit_middleware;
