//! Domain types shared by the Gatelog crates.

pub mod audit;
pub mod config;
pub mod credential;
pub mod error;
pub mod origin;

pub use audit::{indices_of, is_subset, AuditRecord, INDICES_FIELD, TIMESTAMP_FIELD};
pub use config::{ApiKeyConfig, AuthConfig, GateConfig, GatelogConfig, LogsConfig, ServerConfig};
pub use credential::{Credential, PermissionRecord};
pub use error::{CoreError, CoreResult};
pub use origin::{MatcherCache, OriginMatcher};
