pub mod cache_agent;
pub mod request_interceptor;
pub mod store_initializer;

pub use cache_agent::CacheAgent;
pub use request_interceptor::{RequestInterceptor, Resolution, ResponseSource};
pub use store_initializer::{InitReport, StoreInitializer, DEFAULT_MAX_CONCURRENCY};
