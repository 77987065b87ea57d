//! API state management

use gatelog_core::MatcherCache;
use gatelog_storage::AuditStore;

/// Shared application state for the API server
#[derive(Clone)]
pub struct AppState {
    /// Audit log store, shared by the recorder and the read handlers
    pub store: AuditStore,
    /// Compiled referer patterns, shared by every gated route
    pub matchers: MatcherCache,
    /// Page size used when `size` is omitted
    pub default_size: usize,
}

impl AppState {
    pub fn new(store: AuditStore, matchers: MatcherCache, default_size: usize) -> Self {
        Self {
            store,
            matchers,
            default_size,
        }
    }
}
