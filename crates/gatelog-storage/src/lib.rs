pub mod backend;
pub mod elasticsearch;
pub mod memory;
pub mod schema;
pub mod store;

pub use backend::{SearchBackend, SearchHit, SearchRequest, SearchResponse, SortOrder};
pub use elasticsearch::ElasticsearchBackend;
pub use memory::{MemorySearchBackend, Operation};
pub use schema::{default_index_schema, load_index_schema};
pub use store::{parse_pagination, AuditStore, LogPage};
