//! Services layer for cablebill-service.
//!
//! Stores, token and credential handling, the aggregation engine and the
//! payment request workflow.

pub mod aggregation;
pub mod cache;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod mongo;
pub mod reconciliation;
pub mod store;

pub use cache::{MemoryCache, NoopCache, ReadCache, RedisCache};
pub use credentials::CredentialStore;
pub use error::ServiceError;
pub use jwt::{Claims, Role, TokenService};
pub use ledger::LedgerService;
pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use reconciliation::Reconciler;
pub use store::{LedgerStore, StoreError};
