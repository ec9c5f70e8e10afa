use crate::db::{OrderRepository, OrderTransaction};
use crate::error::{StoreError, VerificationError};
use crate::models::{
    ApplyChangesResult, ApprovedChangeSet, ChangeFailure, ChangeOp, ChangePlan, FailedChange,
    MissingReason, VerificationResult,
};
use chrono::Utc;
use indexmap::IndexSet;
use std::sync::Arc;

/// Writes operator-approved corrections back to the store in one transaction
pub struct ChangeApplier<R: OrderRepository> {
    repo: Arc<R>,
}

impl<R: OrderRepository> ChangeApplier<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Resolve the approved selections against the result. Repeated
    /// selections collapse; selections that are not in the result, and
    /// missing items with no single order to link, are rejected.
    pub fn plan(result: &VerificationResult, approved: &ApprovedChangeSet) -> ChangePlan {
        let mut ops = Vec::new();
        let mut rejected = Vec::new();

        let link: IndexSet<usize> = approved.link.iter().copied().collect();
        for position in link {
            match result.missing.iter().find(|m| m.position == position) {
                Some(m) => {
                    let op = ChangeOp::Link {
                        position,
                        order_number: m.parsed.base.clone(),
                        variant: m.parsed.variant,
                    };
                    match &m.reason {
                        // the order that would be linked already sits on this delivery
                        MissingReason::CandidatesClaimed => rejected.push(FailedChange {
                            op: Some(op),
                            reason: ChangeFailure::NotLinkable(format!(
                                "list position {position}: {} is already on the delivery",
                                m.item.raw_order_number.trim()
                            )),
                        }),
                        MissingReason::Ambiguous { candidates } => rejected.push(FailedChange {
                            op: Some(op),
                            reason: ChangeFailure::NotLinkable(format!(
                                "list position {position}: ambiguous between {}",
                                candidates.join(", ")
                            )),
                        }),
                        MissingReason::NotInDelivery | MissingReason::VariantNotInDelivery { .. } => {
                            ops.push(op)
                        }
                    }
                }
                None => rejected.push(FailedChange {
                    op: None,
                    reason: ChangeFailure::NotInResult(format!(
                        "list position {position} is not a missing item"
                    )),
                }),
            }
        }

        let unlink: IndexSet<i64> = approved.unlink.iter().copied().collect();
        for order_id in unlink {
            match result.excess.iter().find(|e| e.line.order_id == order_id) {
                Some(e) => ops.push(ChangeOp::Unlink {
                    order_id,
                    order_number: e.line.order_number.clone(),
                    variant: e.line.variant,
                }),
                None => rejected.push(FailedChange {
                    op: None,
                    reason: ChangeFailure::NotInResult(format!(
                        "order {order_id} is not an excess line"
                    )),
                }),
            }
        }

        ChangePlan {
            delivery_id: result.delivery_id,
            ops,
            rejected,
        }
    }

    /// All or nothing: any failing operation rolls the whole transaction back.
    /// Transport failures are returned as errors; nothing is left applied.
    pub async fn apply(
        &self,
        result: &VerificationResult,
        approved: &ApprovedChangeSet,
    ) -> Result<ApplyChangesResult, VerificationError> {
        let delivery_id = result.delivery_id;
        if approved.is_empty() {
            return Ok(ApplyChangesResult {
                delivery_id,
                linked: 0,
                unlinked: 0,
                failed: Vec::new(),
                committed: true,
                applied_at: Utc::now(),
            });
        }

        let plan = Self::plan(result, approved);

        if !plan.rejected.is_empty() {
            tracing::warn!(
                "Delivery {}: {} approved changes cannot be applied, nothing written",
                delivery_id,
                plan.rejected.len()
            );
            return Ok(not_committed(delivery_id, plan.rejected));
        }

        tracing::info!(
            "Delivery {}: applying {} changes",
            delivery_id,
            plan.ops.len()
        );

        let mut tx = self.repo.begin().await?;
        let mut outcomes: Vec<(ChangeOp, Result<(), StoreError>)> = Vec::with_capacity(plan.ops.len());

        for op in plan.ops {
            let outcome = match &op {
                ChangeOp::Link { .. } => {
                    tx.link_order(delivery_id, op.order_number(), op.variant()).await
                }
                ChangeOp::Unlink { .. } => {
                    tx.unlink_order(delivery_id, op.order_number(), op.variant()).await
                }
            };

            if let Err(StoreError::Unavailable(msg)) = &outcome {
                tracing::error!("Delivery {}: store failed mid-transaction: {}", delivery_id, msg);
                if let Err(e) = tx.rollback().await {
                    tracing::error!("Delivery {}: rollback failed: {}", delivery_id, e);
                }
                return Err(VerificationError::RepositoryUnavailable(msg.clone()));
            }
            outcomes.push((op, outcome));
        }

        if outcomes.iter().any(|(_, o)| o.is_err()) {
            if let Err(e) = tx.rollback().await {
                tracing::error!("Delivery {}: rollback failed: {}", delivery_id, e);
            }
            let failed: Vec<FailedChange> = outcomes
                .into_iter()
                .map(|(op, outcome)| FailedChange {
                    op: Some(op),
                    reason: match outcome {
                        Ok(()) => ChangeFailure::RolledBack,
                        Err(e) => failure_of(e),
                    },
                })
                .collect();
            tracing::error!(
                "Delivery {}: transaction rolled back, {} operations reported",
                delivery_id,
                failed.len()
            );
            return Ok(not_committed(delivery_id, failed));
        }

        let linked = outcomes
            .iter()
            .filter(|(op, _)| matches!(op, ChangeOp::Link { .. }))
            .count();
        let unlinked = outcomes.len() - linked;

        match tx.commit().await {
            Ok(()) => {}
            Err(StoreError::Unavailable(msg)) => {
                tracing::error!("Delivery {}: commit failed: {}", delivery_id, msg);
                return Err(VerificationError::RepositoryUnavailable(msg));
            }
            Err(e) => {
                tracing::error!("Delivery {}: commit rejected: {}", delivery_id, e);
                let mut failed = vec![FailedChange {
                    op: None,
                    reason: failure_of(e),
                }];
                failed.extend(outcomes.into_iter().map(|(op, _)| FailedChange {
                    op: Some(op),
                    reason: ChangeFailure::RolledBack,
                }));
                return Ok(not_committed(delivery_id, failed));
            }
        }

        tracing::info!(
            "Delivery {}: committed, linked {}, unlinked {}",
            delivery_id,
            linked,
            unlinked
        );

        Ok(ApplyChangesResult {
            delivery_id,
            linked,
            unlinked,
            failed: Vec::new(),
            committed: true,
            applied_at: Utc::now(),
        })
    }
}

fn failure_of(e: StoreError) -> ChangeFailure {
    match e {
        StoreError::Conflict(msg) => ChangeFailure::Conflict(msg),
        StoreError::NotFound(msg) => ChangeFailure::NotFound(msg),
        // callers bail out on Unavailable before reaching here
        StoreError::Unavailable(_) => ChangeFailure::RolledBack,
    }
}

fn not_committed(delivery_id: i64, failed: Vec<FailedChange>) -> ApplyChangesResult {
    ApplyChangesResult {
        delivery_id,
        linked: 0,
        unlinked: 0,
        failed,
        committed: false,
        applied_at: Utc::now(),
    }
}
