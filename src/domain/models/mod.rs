//! Domain models for the precache system.

pub mod config;
pub mod manifest;
pub mod resource;
pub mod response;

pub use config::{
    Config, DatabaseConfig, InitializerConfig, LoggingConfig, OriginConfig, ProxyConfig,
};
pub use manifest::{Manifest, StoreSummary};
pub use resource::{
    header_value_bytes, header_value_from_bytes, is_hop_by_hop, normalize, RedirectMode, ResourceKey, ResourceRequest,
    HOP_BY_HOP_HEADERS,
};
pub use response::{ResourceResponse, StoredResponse, VARY_IGNORED};
