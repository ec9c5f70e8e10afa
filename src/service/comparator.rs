use crate::models::{
    DuplicateItem, ExcessItem, MatchedItem, MissingItem, MissingReason, NotFoundItem,
    NotFoundReason, OrderLine, ParsedOrderNumber, VerificationItemInput, VerificationResult,
    VerificationSummary,
};
use crate::service::matcher::{Candidate, MatchOutcome, OrderNumberMatcher};
use crate::service::parser;
use chrono::Utc;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Arena of a delivery's order lines with a claim flag per slot.
/// A line can be claimed once per run.
pub struct LinePool {
    lines: Vec<OrderLine>,
    claimed: Vec<AtomicBool>,
    by_base: HashMap<String, Vec<usize>>,
}

impl LinePool {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        let mut by_base: HashMap<String, Vec<usize>> = HashMap::new();
        for (slot, line) in lines.iter().enumerate() {
            by_base.entry(line.order_number.clone()).or_default().push(slot);
        }
        let claimed = lines.iter().map(|_| AtomicBool::new(false)).collect();
        Self {
            lines,
            claimed,
            by_base,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, slot: usize) -> &OrderLine {
        &self.lines[slot]
    }

    pub fn has_base(&self, base: &str) -> bool {
        self.by_base.contains_key(base)
    }

    /// Unclaimed lines for `base`, in delivery order
    pub fn candidates(&self, base: &str) -> Vec<Candidate<'_>> {
        self.by_base
            .get(base)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|&&slot| !self.claimed[slot].load(Ordering::Acquire))
                    .map(|&slot| Candidate {
                        slot,
                        line: &self.lines[slot],
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn any_line(&self, base: &str, pred: impl Fn(&OrderLine) -> bool) -> bool {
        self.by_base
            .get(base)
            .is_some_and(|slots| slots.iter().any(|&slot| pred(&self.lines[slot])))
    }

    /// Atomically take a slot; false if someone else already holds it
    pub fn claim(&self, slot: usize) -> bool {
        self.claimed[slot]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn unclaimed(&self) -> impl Iterator<Item = &OrderLine> + '_ {
        self.lines
            .iter()
            .zip(&self.claimed)
            .filter(|(_, claimed)| !claimed.load(Ordering::Acquire))
            .map(|(line, _)| line)
    }
}

/// First occurrence of a key waiting for classification
struct Entry<'a> {
    position: usize,
    item: &'a VerificationItemInput,
    parsed: ParsedOrderNumber,
}

enum Classified {
    Matched(MatchedItem),
    Missing(MissingItem),
    NotFound(NotFoundItem),
}

impl Classified {
    fn position(&self) -> usize {
        match self {
            Classified::Matched(m) => m.position,
            Classified::Missing(m) => m.position,
            Classified::NotFound(n) => n.position,
        }
    }
}

/// Compares an external list with a delivery's order lines
pub struct VerificationListComparator {
    matcher: OrderNumberMatcher,
}

impl VerificationListComparator {
    pub fn new(matcher: OrderNumberMatcher) -> Self {
        Self { matcher }
    }

    /// Classify every list entry and every order line. In-memory only; the
    /// caller loads `lines` (and the matcher's known bases) beforehand.
    pub fn compare(
        &self,
        items: &[VerificationItemInput],
        delivery_id: i64,
        lines: Vec<OrderLine>,
    ) -> VerificationResult {
        let pool = LinePool::new(lines);

        // 1. duplicates + grouping by base (input order preserved)
        let mut seen: IndexMap<String, usize> = IndexMap::new();
        let mut duplicates: Vec<DuplicateItem> = Vec::new();
        let mut groups: IndexMap<String, Vec<Entry<'_>>> = IndexMap::new();
        let mut classified: Vec<Classified> = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let position = idx + 1;
            let parsed = parser::parse(&item.raw_order_number);
            let key = parser::duplicate_key(&item.raw_order_number, &parsed);

            if let Some(&first_position) = seen.get(&key) {
                tracing::debug!(
                    "Item {} ({}) duplicates item {}",
                    position,
                    item.raw_order_number,
                    first_position
                );
                duplicates.push(DuplicateItem {
                    position,
                    item: item.clone(),
                    key,
                    first_position,
                });
                continue;
            }
            seen.insert(key, position);

            if !parsed.is_parsable() {
                classified.push(Classified::NotFound(NotFoundItem {
                    position,
                    item: item.clone(),
                    parsed,
                    reason: NotFoundReason::Unparsable,
                }));
                continue;
            }

            groups
                .entry(parsed.base.clone())
                .or_default()
                .push(Entry {
                    position,
                    item,
                    parsed,
                });
        }

        // 2. bases are independent; entries of one base run in input order
        let groups: Vec<(String, Vec<Entry<'_>>)> = groups.into_iter().collect();
        let matched_groups: Vec<Vec<Classified>> = groups
            .par_iter()
            .map(|(base, entries)| {
                entries
                    .iter()
                    .map(|entry| self.classify(&pool, base, entry))
                    .collect()
            })
            .collect();
        classified.extend(matched_groups.into_iter().flatten());
        classified.sort_by_key(Classified::position);

        // 3. split
        let mut matched = Vec::new();
        let mut missing = Vec::new();
        let mut not_found = Vec::new();
        for c in classified {
            match c {
                Classified::Matched(m) => matched.push(m),
                Classified::Missing(m) => missing.push(m),
                Classified::NotFound(n) => not_found.push(n),
            }
        }

        // 4. whatever nobody claimed is excess
        let excess: Vec<ExcessItem> = pool
            .unclaimed()
            .map(|line| ExcessItem { line: line.clone() })
            .collect();

        let summary = VerificationSummary {
            total_items: items.len(),
            matched: matched.len(),
            inferred: matched
                .iter()
                .filter(|m| m.confidence == crate::models::MatchConfidence::Inferred)
                .count(),
            missing: missing.len(),
            ambiguous: missing
                .iter()
                .filter(|m| matches!(m.reason, MissingReason::Ambiguous { .. }))
                .count(),
            excess: excess.len(),
            not_found: not_found.len(),
            duplicates: duplicates.len(),
        };

        tracing::info!(
            "Delivery {} verified: items {}, matched {} (inferred {}), missing {} (ambiguous {}), excess {}, not found {}, duplicates {}",
            delivery_id,
            summary.total_items,
            summary.matched,
            summary.inferred,
            summary.missing,
            summary.ambiguous,
            summary.excess,
            summary.not_found,
            summary.duplicates
        );

        VerificationResult {
            delivery_id,
            matched,
            missing,
            excess,
            not_found,
            duplicates,
            summary,
            verified_at: Utc::now(),
        }
    }

    fn classify(&self, pool: &LinePool, base: &str, entry: &Entry<'_>) -> Classified {
        loop {
            let candidates = pool.candidates(base);
            match self.matcher.match_item(&entry.parsed, entry.item, &candidates) {
                MatchOutcome::Matched { slot, confidence } => {
                    if !pool.claim(slot) {
                        // lost the race for this line, look again
                        continue;
                    }
                    tracing::debug!(
                        "Item {} ({}) -> order line {} [{:?}]",
                        entry.position,
                        entry.item.raw_order_number,
                        pool.line(slot).label(),
                        confidence
                    );
                    return Classified::Matched(MatchedItem {
                        position: entry.position,
                        item: entry.item.clone(),
                        parsed: entry.parsed.clone(),
                        line: pool.line(slot).clone(),
                        confidence,
                    });
                }
                MatchOutcome::Ambiguous { slots } => {
                    let labels: Vec<String> = slots.iter().map(|&s| pool.line(s).label()).collect();
                    tracing::warn!(
                        "Item {} ({}) is ambiguous between {:?}, left for manual review",
                        entry.position,
                        entry.item.raw_order_number,
                        labels
                    );
                    return self.missing(entry, MissingReason::Ambiguous { candidates: labels });
                }
                MatchOutcome::NoMatch => return self.no_match(pool, base, entry),
            }
        }
    }

    fn no_match(&self, pool: &LinePool, base: &str, entry: &Entry<'_>) -> Classified {
        if !pool.has_base(base) {
            if self.matcher.exists_globally(base) {
                return self.missing(entry, MissingReason::NotInDelivery);
            }
            return Classified::NotFound(NotFoundItem {
                position: entry.position,
                item: entry.item.clone(),
                parsed: entry.parsed.clone(),
                reason: NotFoundReason::UnknownOrder,
            });
        }

        let reason = match entry.parsed.variant {
            Some(requested)
                if !pool.any_line(base, |l| l.variant == Some(requested) || l.variant.is_none()) =>
            {
                MissingReason::VariantNotInDelivery { requested }
            }
            _ => MissingReason::CandidatesClaimed,
        };
        self.missing(entry, reason)
    }

    fn missing(&self, entry: &Entry<'_>, reason: MissingReason) -> Classified {
        Classified::Missing(MissingItem {
            position: entry.position,
            item: entry.item.clone(),
            parsed: entry.parsed.clone(),
            reason,
        })
    }
}
