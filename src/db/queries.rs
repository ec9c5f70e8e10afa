use crate::db::repository::{OrderRepository, OrderTransaction};
use crate::error::{StoreError, VerificationError};
use crate::models::{OrderLine, OrderLineRow};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use std::time::Duration;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Postgres-backed order store
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn variant_param(variant: Option<char>) -> Option<String> {
    variant.map(|v| v.to_string())
}

fn describe(base: &str, variant: Option<char>) -> String {
    match variant {
        Some(v) => format!("{base}{v}"),
        None => base.to_string(),
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    type Tx = PgOrderTransaction;

    async fn get_order_lines(&self, delivery_id: i64) -> Result<Vec<OrderLine>, VerificationError> {
        let start = std::time::Instant::now();

        let query = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT o.id AS order_id,
                   o.order_number,
                   o.variant,
                   o.quantity,
                   o.description,
                   d.delivery_id,
                   d.position
            FROM delivery_orders d
            INNER JOIN orders o ON o.id = d.order_id
            WHERE d.delivery_id = $1
            ORDER BY d.position ASC, o.id ASC
            "#,
        )
        .bind(delivery_id)
        .fetch_all(&self.pool);

        let rows = match tokio::time::timeout(LOAD_TIMEOUT, query).await {
            Ok(rows) => rows?,
            Err(_) => {
                tracing::error!("Loading order lines for delivery {} timed out", delivery_id);
                return Err(VerificationError::RepositoryUnavailable(format!(
                    "loading delivery {delivery_id} timed out"
                )));
            }
        };

        tracing::debug!(
            "Loaded {} order lines for delivery {} in {:?}",
            rows.len(),
            delivery_id,
            start.elapsed()
        );
        rows.into_iter().map(OrderLine::try_from).collect()
    }

    async fn exists_globally(&self, base: &str) -> Result<bool, VerificationError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)",
        )
        .bind(base)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn existing_bases(&self, bases: &[String]) -> Result<HashSet<String>, VerificationError> {
        let mut found = HashSet::with_capacity(bases.len());
        for chunk in bases.chunks(1000) {
            let rows = sqlx::query_scalar::<_, String>(
                "SELECT DISTINCT order_number FROM orders WHERE order_number = ANY($1)",
            )
            .bind(chunk)
            .fetch_all(&self.pool)
            .await?;
            found.extend(rows);
        }
        Ok(found)
    }

    async fn begin(&self) -> Result<PgOrderTransaction, VerificationError> {
        let tx = self.pool.begin().await?;
        Ok(PgOrderTransaction { tx })
    }
}

/// One Postgres transaction (read committed). Conflicts surface through the
/// unique constraint on (delivery_id, order_id).
pub struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn link_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError> {
        let order_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM orders
            WHERE order_number = $1
              AND variant IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(base)
        .bind(variant_param(variant))
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(order_id) = order_id else {
            return Err(StoreError::NotFound(format!(
                "order {} does not exist",
                describe(base, variant)
            )));
        };

        // ON CONFLICT keeps the transaction usable so later ops still report
        let result = sqlx::query(
            r#"
            INSERT INTO delivery_orders (delivery_id, order_id, position)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1
            FROM delivery_orders
            WHERE delivery_id = $1
            ON CONFLICT (delivery_id, order_id) DO NOTHING
            "#,
        )
        .bind(delivery_id)
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "order {} already linked to delivery {}",
                describe(base, variant),
                delivery_id
            )));
        }
        Ok(())
    }

    async fn unlink_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM delivery_orders d
            USING orders o
            WHERE d.order_id = o.id
              AND d.delivery_id = $1
              AND o.order_number = $2
              AND o.variant IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(delivery_id)
        .bind(base)
        .bind(variant_param(variant))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "order {} is not linked to delivery {}",
                describe(base, variant),
                delivery_id
            )));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
