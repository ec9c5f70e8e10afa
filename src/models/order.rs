use crate::error::VerificationError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An order recorded against a delivery (delivery_orders joined with orders)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub order_number: String,    // base, digits only
    pub variant: Option<char>,   // upper-case letter, None = no variant recorded
    pub quantity: u32,
    pub description: Option<String>,
    pub delivery_id: i64,
    pub position: i32,           // position within the delivery
}

impl OrderLine {
    /// Display form, e.g. `53714A`
    pub fn label(&self) -> String {
        match self.variant {
            Some(v) => format!("{}{}", self.order_number, v),
            None => self.order_number.clone(),
        }
    }
}

/// Raw row shape as stored in Postgres
#[derive(Debug, Clone, FromRow)]
pub struct OrderLineRow {
    pub order_id: i64,
    pub order_number: String,
    pub variant: Option<String>,
    pub quantity: i32,
    pub description: Option<String>,
    pub delivery_id: i64,
    pub position: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = VerificationError;

    /// A negative stored quantity is corrupt data; the whole load fails
    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            tracing::error!(
                "Order {} on delivery {} has invalid quantity {}",
                row.order_id,
                row.delivery_id,
                row.quantity
            );
            VerificationError::InvalidData(format!(
                "order {} has quantity {}",
                row.order_id, row.quantity
            ))
        })?;

        Ok(Self {
            order_id: row.order_id,
            order_number: row.order_number,
            variant: row
                .variant
                .and_then(|v| v.trim().chars().next())
                .map(|c| c.to_ascii_uppercase()),
            quantity,
            description: row.description,
            delivery_id: row.delivery_id,
            position: row.position,
        })
    }
}
