use crate::config::DisambiguationStrategy;
use crate::models::{MatchConfidence, OrderLine};
use crate::service::matcher::{Candidate, MatchOutcome, OrderNumberMatcher};
use crate::service::parser::parse;
use crate::tests::helpers::{bases, item, line};

fn candidates(lines: &[OrderLine]) -> Vec<Candidate<'_>> {
    lines
        .iter()
        .enumerate()
        .map(|(slot, line)| Candidate { slot, line })
        .collect()
}

fn matcher(strategy: DisambiguationStrategy) -> OrderNumberMatcher {
    OrderNumberMatcher::new(strategy, bases(&["53714", "53716"]))
}

fn exact(slot: usize) -> MatchOutcome {
    MatchOutcome::Matched {
        slot,
        confidence: MatchConfidence::Exact,
    }
}

#[test]
fn test_no_candidates_is_no_match() {
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714"), &item("53714", 1), &[]);
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn test_requested_variant_matches_exactly() {
    let lines = vec![line(1, "53714", Some('A'), 1), line(2, "53714", Some('B'), 1)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714b"), &item("53714b", 1), &candidates(&lines));
    assert_eq!(outcome, exact(1));
}

#[test]
fn test_variantless_order_accepts_any_variant_claim() {
    let lines = vec![line(1, "53714", None, 1)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714-C"), &item("53714-C", 1), &candidates(&lines));
    assert_eq!(outcome, exact(0));
}

#[test]
fn test_requested_variant_absent_is_no_match() {
    let lines = vec![line(1, "53714", Some('A'), 1), line(2, "53714", Some('B'), 1)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714C"), &item("53714C", 1), &candidates(&lines));
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn test_single_candidate_without_variant_claim_is_exact() {
    let lines = vec![line(1, "53714", Some('A'), 4)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714"), &item("53714", 9), &candidates(&lines));
    assert_eq!(outcome, exact(0));
}

#[test]
fn test_unvaried_candidate_preferred_for_unvaried_claim() {
    let lines = vec![line(1, "53714", Some('A'), 2), line(2, "53714", None, 5)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53714"), &item("53714", 2), &candidates(&lines));
    assert_eq!(outcome, exact(1));
}

#[test]
fn test_unique_quantity_is_inferred() {
    let lines = vec![line(1, "53716", Some('A'), 5), line(2, "53716", Some('B'), 3)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53716"), &item("53716", 3), &candidates(&lines));
    assert_eq!(
        outcome,
        MatchOutcome::Matched {
            slot: 1,
            confidence: MatchConfidence::Inferred
        }
    );
}

#[test]
fn test_quantity_tie_is_ambiguous_between_tied_lines() {
    let lines = vec![
        line(1, "53716", Some('A'), 3),
        line(2, "53716", Some('B'), 3),
        line(3, "53716", Some('C'), 7),
    ];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53716"), &item("53716", 3), &candidates(&lines));
    assert_eq!(outcome, MatchOutcome::Ambiguous { slots: vec![0, 1] });
}

#[test]
fn test_no_quantity_hit_is_ambiguous_between_all() {
    let lines = vec![line(1, "53716", Some('A'), 5), line(2, "53716", Some('B'), 3)];
    let m = matcher(DisambiguationStrategy::Quantity);
    let outcome = m.match_item(&parse("53716"), &item("53716", 1), &candidates(&lines));
    assert_eq!(outcome, MatchOutcome::Ambiguous { slots: vec![0, 1] });
}

#[test]
fn test_description_strategy() {
    let mut lines = vec![line(1, "53716", Some('A'), 3), line(2, "53716", Some('B'), 3)];
    lines[0].description = Some("Okno PCV  białe".to_string());
    lines[1].description = Some("Drzwi tarasowe".to_string());
    let m = matcher(DisambiguationStrategy::Description);

    let described = item("53716", 3).with_description("drzwi   TARASOWE");
    let outcome = m.match_item(&parse("53716"), &described, &candidates(&lines));
    assert_eq!(
        outcome,
        MatchOutcome::Matched {
            slot: 1,
            confidence: MatchConfidence::Inferred
        }
    );

    // without a description nothing can be inferred, quantity is ignored
    let outcome = m.match_item(&parse("53716"), &item("53716", 3), &candidates(&lines));
    assert_eq!(outcome, MatchOutcome::Ambiguous { slots: vec![0, 1] });
}

#[test]
fn test_disabled_strategy_never_infers() {
    let lines = vec![line(1, "53716", Some('A'), 5), line(2, "53716", Some('B'), 3)];
    let m = matcher(DisambiguationStrategy::Disabled);
    let outcome = m.match_item(&parse("53716"), &item("53716", 3), &candidates(&lines));
    assert_eq!(outcome, MatchOutcome::Ambiguous { slots: vec![0, 1] });
}

#[test]
fn test_exists_globally_uses_snapshot() {
    let m = matcher(DisambiguationStrategy::Quantity);
    assert!(m.exists_globally("53714"));
    assert!(!m.exists_globally("99999"));
}
