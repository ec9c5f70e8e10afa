use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator-selected corrections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedChangeSet {
    /// list positions of missing items to link to the delivery
    #[serde(default)]
    pub link: Vec<usize>,
    /// order ids of excess lines to unlink from the delivery
    #[serde(default)]
    pub unlink: Vec<i64>,
}

impl ApprovedChangeSet {
    pub fn is_empty(&self) -> bool {
        self.link.is_empty() && self.unlink.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOp {
    Link {
        position: usize,
        order_number: String,
        variant: Option<char>,
    },
    Unlink {
        order_id: i64,
        order_number: String,
        variant: Option<char>,
    },
}

impl ChangeOp {
    pub fn order_number(&self) -> &str {
        match self {
            ChangeOp::Link { order_number, .. } | ChangeOp::Unlink { order_number, .. } => {
                order_number
            }
        }
    }

    pub fn variant(&self) -> Option<char> {
        match self {
            ChangeOp::Link { variant, .. } | ChangeOp::Unlink { variant, .. } => *variant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ChangeFailure {
    /// association already present (concurrent writer)
    Conflict(String),
    /// association or order no longer exists
    NotFound(String),
    /// selection does not refer to an item of the verification result
    NotInResult(String),
    /// missing item has no single order a link could attach
    NotLinkable(String),
    /// operation succeeded but the transaction was rolled back
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedChange {
    pub op: Option<ChangeOp>,
    pub reason: ChangeFailure,
}

/// Validated, de-duplicated list of operations for one apply call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePlan {
    pub delivery_id: i64,
    pub ops: Vec<ChangeOp>,
    pub rejected: Vec<FailedChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyChangesResult {
    pub delivery_id: i64,
    pub linked: usize,
    pub unlinked: usize,
    pub failed: Vec<FailedChange>,
    pub committed: bool,
    pub applied_at: DateTime<Utc>,
}
