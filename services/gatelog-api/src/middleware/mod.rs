pub mod credentials;
pub mod recorder;
pub mod referers;

pub use credentials::{credential_middleware, ApiKeys};
pub use recorder::{category_from_path, indices_from_path, record_request};
pub use referers::{referer_middleware, MISSING_REFERER_MESSAGE, UNMATCHED_REFERER_MESSAGE};
