use crate::config::MatchingConfig;
use crate::db::OrderRepository;
use crate::error::VerificationError;
use crate::models::{
    ApplyChangesResult, ApprovedChangeSet, ChangePlan, VerificationItemInput, VerificationResult,
};
use crate::service::applier::ChangeApplier;
use crate::service::comparator::VerificationListComparator;
use crate::service::matcher::OrderNumberMatcher;
use crate::service::parser;
use indexmap::IndexSet;
use std::sync::Arc;

/// Entry point used by the HTTP layer: compare a list with a delivery, then
/// optionally apply operator-approved corrections.
pub struct VerificationService<R: OrderRepository> {
    repo: Arc<R>,
    matching: MatchingConfig,
    applier: ChangeApplier<R>,
}

impl<R: OrderRepository> VerificationService<R> {
    pub fn new(repo: Arc<R>, matching: MatchingConfig) -> Self {
        Self {
            applier: ChangeApplier::new(repo.clone()),
            repo,
            matching,
        }
    }

    /// Read-only. Loads the delivery once and the store-wide existence of
    /// the listed bases, then classifies in memory. A load failure fails
    /// the whole call.
    pub async fn compare(
        &self,
        items: &[VerificationItemInput],
        delivery_id: i64,
    ) -> Result<VerificationResult, VerificationError> {
        let bases: Vec<String> = items
            .iter()
            .map(|i| parser::parse(&i.raw_order_number).base)
            .filter(|b| !b.is_empty())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        tracing::info!(
            "Verifying delivery {}: {} list items, {} distinct bases",
            delivery_id,
            items.len(),
            bases.len()
        );

        let (lines, known_bases) = futures::try_join!(
            self.repo.get_order_lines(delivery_id),
            self.repo.existing_bases(&bases)
        )?;

        let matcher = OrderNumberMatcher::new(self.matching.disambiguation, known_bases);
        let comparator = VerificationListComparator::new(matcher);
        let items = items.to_vec();

        // classification fans out on rayon; keep it off the async workers
        let result = tokio::task::spawn_blocking(move || {
            comparator.compare(&items, delivery_id, lines)
        })
        .await?;
        Ok(result)
    }

    pub fn preview(&self, result: &VerificationResult, approved: &ApprovedChangeSet) -> ChangePlan {
        ChangeApplier::<R>::plan(result, approved)
    }

    pub async fn apply(
        &self,
        result: &VerificationResult,
        approved: &ApprovedChangeSet,
    ) -> Result<ApplyChangesResult, VerificationError> {
        self.applier.apply(result, approved).await
    }
}
