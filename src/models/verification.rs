use crate::error::VerificationError;
use crate::models::OrderLine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the external checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationItemInput {
    pub raw_order_number: String,
    pub quantity: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl VerificationItemInput {
    pub fn new(raw_order_number: impl Into<String>, quantity: u32) -> Self {
        Self {
            raw_order_number: raw_order_number.into(),
            quantity,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Boundary check applied before an item enters the engine
    pub fn validate(&self, position: usize) -> Result<(), VerificationError> {
        if self.raw_order_number.trim().is_empty() {
            return Err(VerificationError::InvalidInput(format!(
                "item {position}: order number is blank"
            )));
        }
        if self.quantity == 0 {
            return Err(VerificationError::InvalidInput(format!(
                "item {position} ({}): quantity must be positive",
                self.raw_order_number.trim()
            )));
        }
        Ok(())
    }
}

/// Normalized identifier: digits-only base plus optional variant letter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedOrderNumber {
    pub base: String,
    pub variant: Option<char>,
}

impl ParsedOrderNumber {
    pub fn is_parsable(&self) -> bool {
        !self.base.is_empty()
    }

    /// `53714A` / `53714*`
    pub fn key(&self) -> String {
        format!("{}{}", self.base, self.variant.unwrap_or('*'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// variant matched precisely or the candidate was unambiguous
    Exact,
    /// resolved by a secondary signal (quantity / description)
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedItem {
    pub position: usize,
    pub item: VerificationItemInput,
    pub parsed: ParsedOrderNumber,
    pub line: OrderLine,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingReason {
    /// the order exists, but not on this delivery
    NotInDelivery,
    /// the delivery carries the base, but not the requested variant
    VariantNotInDelivery { requested: char },
    /// every candidate was already taken by an earlier list entry
    CandidatesClaimed,
    /// several candidates fit and none could be singled out
    Ambiguous { candidates: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub position: usize,
    pub item: VerificationItemInput,
    pub parsed: ParsedOrderNumber,
    pub reason: MissingReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcessItem {
    pub line: OrderLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    Unparsable,
    UnknownOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundItem {
    pub position: usize,
    pub item: VerificationItemInput,
    pub parsed: ParsedOrderNumber,
    pub reason: NotFoundReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateItem {
    pub position: usize,
    pub item: VerificationItemInput,
    pub key: String,
    /// position of the occurrence that received the primary classification
    pub first_position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total_items: usize,
    pub matched: usize,
    pub inferred: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub excess: usize,
    pub not_found: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub delivery_id: i64,
    pub matched: Vec<MatchedItem>,
    pub missing: Vec<MissingItem>,
    pub excess: Vec<ExcessItem>,
    pub not_found: Vec<NotFoundItem>,
    pub duplicates: Vec<DuplicateItem>,
    pub summary: VerificationSummary,
    pub verified_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Same classification, ignoring the timestamp
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.delivery_id == other.delivery_id
            && self.matched == other.matched
            && self.missing == other.missing
            && self.excess == other.excess
            && self.not_found == other.not_found
            && self.duplicates == other.duplicates
            && self.summary == other.summary
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.excess.is_empty()
            && self.not_found.is_empty()
            && self.duplicates.is_empty()
    }
}
