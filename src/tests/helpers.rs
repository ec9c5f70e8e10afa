use crate::config::{DisambiguationStrategy, MatchingConfig};
use crate::db::InMemoryOrderStore;
use crate::models::{OrderLine, VerificationItemInput, VerificationResult};
use crate::service::{OrderNumberMatcher, VerificationListComparator, VerificationService};
use std::collections::{HashSet, HashMap};
use std::sync::Arc;

pub const DELIVERY: i64 = 1;
pub const OTHER_DELIVERY: i64 = 2;

pub fn item(raw: &str, quantity: u32) -> VerificationItemInput {
    VerificationItemInput::new(raw, quantity)
}

pub fn line(order_id: i64, base: &str, variant: Option<char>, quantity: u32) -> OrderLine {
    OrderLine {
        order_id,
        order_number: base.to_string(),
        variant,
        quantity,
        description: None,
        delivery_id: DELIVERY,
        position: order_id as i32,
    }
}

pub fn bases(list: &[&str]) -> HashSet<String> {
    list.iter().map(|b| b.to_string()).collect()
}

pub fn comparator(known: &[&str]) -> VerificationListComparator {
    comparator_with(DisambiguationStrategy::Quantity, known)
}

pub fn comparator_with(strategy: DisambiguationStrategy, known: &[&str]) -> VerificationListComparator {
    VerificationListComparator::new(OrderNumberMatcher::new(strategy, bases(known)))
}

/// Store holding the given orders; those flagged `true` are linked to DELIVERY
pub fn store_with(orders: &[(&str, Option<char>, u32, bool)]) -> InMemoryOrderStore {
    let store = InMemoryOrderStore::new();
    for &(base, variant, quantity, linked) in orders {
        store.add_order(base, variant, quantity);
        if linked {
            store.link_now(DELIVERY, base, variant).unwrap();
        }
    }
    store
}

pub fn service(store: &InMemoryOrderStore) -> VerificationService<InMemoryOrderStore> {
    VerificationService::new(Arc::new(store.clone()), MatchingConfig::default())
}

/// Every input is primary-classified once or is a duplicate; every line is matched or excess
pub fn assert_partition(result: &VerificationResult, item_count: usize, lines: &[OrderLine]) {
    let mut primary: Vec<usize> = result
        .matched
        .iter()
        .map(|m| m.position)
        .chain(result.missing.iter().map(|m| m.position))
        .chain(result.not_found.iter().map(|n| n.position))
        .collect();
    let mut duplicates: Vec<usize> = result.duplicates.iter().map(|d| d.position).collect();
    primary.sort_unstable();
    duplicates.sort_unstable();

    let mut all: Vec<usize> = primary.iter().chain(duplicates.iter()).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (1..=item_count).collect::<Vec<_>>(), "every item classified once");

    let mut line_uses: HashMap<i64, usize> = HashMap::new();
    for m in &result.matched {
        *line_uses.entry(m.line.order_id).or_default() += 1;
    }
    for e in &result.excess {
        *line_uses.entry(e.line.order_id).or_default() += 1;
    }
    for l in lines {
        assert_eq!(
            line_uses.get(&l.order_id).copied(),
            Some(1),
            "order line {} must be matched or excess exactly once",
            l.label()
        );
    }
    assert_eq!(line_uses.len(), lines.len());
}
