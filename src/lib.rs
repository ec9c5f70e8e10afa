pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

#[cfg(test)]
mod tests;

pub use config::AppConfig;
pub use db::{create_pool, InMemoryOrderStore, OrderRepository, PgOrderRepository};
pub use error::{StoreError, VerificationError};
pub use service::{ChangeApplier, OrderNumberMatcher, VerificationListComparator, VerificationService};
