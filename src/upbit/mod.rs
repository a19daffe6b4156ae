pub mod client;
pub mod rate_limit;

pub use client::{UpbitClient, DEFAULT_BASE_URL};
