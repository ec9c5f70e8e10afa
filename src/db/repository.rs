use crate::error::{StoreError, VerificationError};
use crate::models::OrderLine;
use async_trait::async_trait;
use std::collections::HashSet;

/// Read side of the order/delivery store plus the entry into a write transaction
#[async_trait]
pub trait OrderRepository: Send + Sync {
    type Tx: OrderTransaction;

    /// All order lines of a delivery, ordered by delivery position
    async fn get_order_lines(&self, delivery_id: i64) -> Result<Vec<OrderLine>, VerificationError>;

    /// Whether any order with this base number exists anywhere in the store
    async fn exists_globally(&self, base: &str) -> Result<bool, VerificationError>;

    /// Subset of `bases` that exist anywhere in the store
    async fn existing_bases(&self, bases: &[String]) -> Result<HashSet<String>, VerificationError> {
        let mut found = HashSet::with_capacity(bases.len());
        for base in bases {
            if self.exists_globally(base).await? {
                found.insert(base.clone());
            }
        }
        Ok(found)
    }

    async fn begin(&self) -> Result<Self::Tx, VerificationError>;
}

/// Writes against a single store transaction. Nothing is visible before `commit`.
#[async_trait]
pub trait OrderTransaction: Send {
    async fn link_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError>;

    async fn unlink_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
