use crate::config::DisambiguationStrategy;
use crate::models::{MatchConfidence, OrderLine, ParsedOrderNumber, VerificationItemInput};
use std::collections::HashSet;

/// An unclaimed order line offered to the matcher; `slot` is its index in the line pool
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub slot: usize,
    pub line: &'a OrderLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched {
        slot: usize,
        confidence: MatchConfidence,
    },
    /// several candidates fit; correctness cannot be asserted
    Ambiguous { slots: Vec<usize> },
    NoMatch,
}

/// Picks the order line a list entry refers to. Pure: works on the candidate
/// slice it is handed plus a snapshot of the bases known to the store.
#[derive(Debug, Clone, Default)]
pub struct OrderNumberMatcher {
    strategy: DisambiguationStrategy,
    known_bases: HashSet<String>,
}

impl OrderNumberMatcher {
    pub fn new(strategy: DisambiguationStrategy, known_bases: HashSet<String>) -> Self {
        Self {
            strategy,
            known_bases,
        }
    }

    /// Whether the base exists anywhere in the store (per the loaded snapshot)
    pub fn exists_globally(&self, base: &str) -> bool {
        self.known_bases.contains(base)
    }

    /// `candidates` must already be restricted to the delivery and to `parsed.base`
    pub fn match_item(
        &self,
        parsed: &ParsedOrderNumber,
        item: &VerificationItemInput,
        candidates: &[Candidate<'_>],
    ) -> MatchOutcome {
        if candidates.is_empty() {
            return MatchOutcome::NoMatch;
        }

        let unvaried: Vec<&Candidate<'_>> =
            candidates.iter().filter(|c| c.line.variant.is_none()).collect();

        if let Some(variant) = parsed.variant {
            if let Some(c) = candidates.iter().find(|c| c.line.variant == Some(variant)) {
                return exact(c.slot);
            }
            // a variant-less order accepts any variant claim
            return match unvaried.as_slice() {
                [only] => exact(only.slot),
                _ => MatchOutcome::NoMatch,
            };
        }

        if let [only] = candidates {
            return exact(only.slot);
        }
        if let [only] = unvaried.as_slice() {
            return exact(only.slot);
        }

        self.disambiguate(item, candidates)
    }

    fn disambiguate(&self, item: &VerificationItemInput, candidates: &[Candidate<'_>]) -> MatchOutcome {
        let hits: Vec<usize> = match self.strategy {
            DisambiguationStrategy::Quantity => candidates
                .iter()
                .filter(|c| c.line.quantity == item.quantity)
                .map(|c| c.slot)
                .collect(),
            DisambiguationStrategy::Description => {
                let Some(wanted) = item.description.as_deref().map(normalize).filter(|d| !d.is_empty())
                else {
                    return ambiguous(candidates);
                };
                candidates
                    .iter()
                    .filter(|c| c.line.description.as_deref().map(normalize).as_deref() == Some(wanted.as_str()))
                    .map(|c| c.slot)
                    .collect()
            }
            DisambiguationStrategy::Disabled => Vec::new(),
        };

        match hits.as_slice() {
            [slot] => MatchOutcome::Matched {
                slot: *slot,
                confidence: MatchConfidence::Inferred,
            },
            [] => ambiguous(candidates),
            _ => MatchOutcome::Ambiguous { slots: hits },
        }
    }
}

fn exact(slot: usize) -> MatchOutcome {
    MatchOutcome::Matched {
        slot,
        confidence: MatchConfidence::Exact,
    }
}

fn ambiguous(candidates: &[Candidate<'_>]) -> MatchOutcome {
    MatchOutcome::Ambiguous {
        slots: candidates.iter().map(|c| c.slot).collect(),
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
