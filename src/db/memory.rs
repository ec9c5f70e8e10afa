use crate::db::repository::{OrderRepository, OrderTransaction};
use crate::error::{StoreError, VerificationError};
use crate::models::OrderLine;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
    pub id: i64,
    pub order_number: String,
    pub variant: Option<char>,
    pub quantity: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    pub delivery_id: i64,
    pub order_id: i64,
    pub position: i32,
}

/// Full store contents; compared directly in tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub orders: Vec<StoredOrder>,
    pub links: Vec<StoredLink>,
}

impl StoreState {
    fn find_order(&self, base: &str, variant: Option<char>) -> Option<&StoredOrder> {
        self.orders
            .iter()
            .find(|o| o.order_number == base && o.variant == variant)
    }

    fn link(&mut self, delivery_id: i64, base: &str, variant: Option<char>) -> Result<(), StoreError> {
        let order_id = self
            .find_order(base, variant)
            .map(|o| o.id)
            .ok_or_else(|| StoreError::NotFound(format!("order {} does not exist", label(base, variant))))?;

        if self
            .links
            .iter()
            .any(|l| l.delivery_id == delivery_id && l.order_id == order_id)
        {
            return Err(StoreError::Conflict(format!(
                "order {} already linked to delivery {}",
                label(base, variant),
                delivery_id
            )));
        }

        let position = self
            .links
            .iter()
            .filter(|l| l.delivery_id == delivery_id)
            .map(|l| l.position)
            .max()
            .unwrap_or(0)
            + 1;
        self.links.push(StoredLink {
            delivery_id,
            order_id,
            position,
        });
        Ok(())
    }

    fn unlink(&mut self, delivery_id: i64, base: &str, variant: Option<char>) -> Result<(), StoreError> {
        let order_id = self.find_order(base, variant).map(|o| o.id);
        let before = self.links.len();
        self.links
            .retain(|l| !(l.delivery_id == delivery_id && Some(l.order_id) == order_id));
        if self.links.len() == before {
            return Err(StoreError::NotFound(format!(
                "order {} is not linked to delivery {}",
                label(base, variant),
                delivery_id
            )));
        }
        Ok(())
    }
}

fn label(base: &str, variant: Option<char>) -> String {
    match variant {
        Some(v) => format!("{base}{v}"),
        None => base.to_string(),
    }
}

/// In-process order store with snapshot transactions
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<StoreState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn check_available(&self) -> Result<(), VerificationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VerificationError::RepositoryUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    /// Simulate a transport failure on every subsequent call
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Register an order; returns its id
    pub fn add_order(&self, base: &str, variant: Option<char>, quantity: u32) -> i64 {
        self.add_order_with_description(base, variant, quantity, None)
    }

    pub fn add_order_with_description(
        &self,
        base: &str,
        variant: Option<char>,
        quantity: u32,
        description: Option<&str>,
    ) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let id = state.orders.len() as i64 + 1;
        state.orders.push(StoredOrder {
            id,
            order_number: base.to_string(),
            variant,
            quantity,
            description: description.map(str::to_string),
        });
        id
    }

    /// Link outside any transaction (fixture setup / concurrent writer)
    pub fn link_now(&self, delivery_id: i64, base: &str, variant: Option<char>) -> Result<(), StoreError> {
        self.lock()?.link(delivery_id, base, variant)
    }

    pub fn unlink_now(&self, delivery_id: i64, base: &str, variant: Option<char>) -> Result<(), StoreError> {
        self.lock()?.unlink(delivery_id, base, variant)
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    type Tx = InMemoryTransaction;

    async fn get_order_lines(&self, delivery_id: i64) -> Result<Vec<OrderLine>, VerificationError> {
        self.check_available()?;
        let state = self.lock()?;
        let mut links: Vec<&StoredLink> = state
            .links
            .iter()
            .filter(|l| l.delivery_id == delivery_id)
            .collect();
        links.sort_by_key(|l| (l.position, l.order_id));

        let lines = links
            .into_iter()
            .filter_map(|l| {
                state.orders.iter().find(|o| o.id == l.order_id).map(|o| OrderLine {
                    order_id: o.id,
                    order_number: o.order_number.clone(),
                    variant: o.variant,
                    quantity: o.quantity,
                    description: o.description.clone(),
                    delivery_id,
                    position: l.position,
                })
            })
            .collect();
        Ok(lines)
    }

    async fn exists_globally(&self, base: &str) -> Result<bool, VerificationError> {
        self.check_available()?;
        Ok(self.lock()?.orders.iter().any(|o| o.order_number == base))
    }

    async fn existing_bases(&self, bases: &[String]) -> Result<HashSet<String>, VerificationError> {
        self.check_available()?;
        let state = self.lock()?;
        Ok(bases
            .iter()
            .filter(|b| state.orders.iter().any(|o| &o.order_number == *b))
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<InMemoryTransaction, VerificationError> {
        self.check_available()?;
        let working = self.lock()?.clone();
        Ok(InMemoryTransaction {
            store: self.clone(),
            working,
            ops: Vec::new(),
        })
    }
}

#[derive(Debug, Clone)]
enum TxOp {
    Link(i64, String, Option<char>),
    Unlink(i64, String, Option<char>),
}

/// Works on a private copy; commit replays onto the live state, all or nothing
pub struct InMemoryTransaction {
    store: InMemoryOrderStore,
    working: StoreState,
    ops: Vec<TxOp>,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn link_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError> {
        self.working.link(delivery_id, base, variant)?;
        self.ops.push(TxOp::Link(delivery_id, base.to_string(), variant));
        Ok(())
    }

    async fn unlink_order(
        &mut self,
        delivery_id: i64,
        base: &str,
        variant: Option<char>,
    ) -> Result<(), StoreError> {
        self.working.unlink(delivery_id, base, variant)?;
        self.ops.push(TxOp::Unlink(delivery_id, base.to_string(), variant));
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.store.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        let mut live = self.store.lock()?;
        let mut next = live.clone();
        for op in &self.ops {
            match op {
                TxOp::Link(delivery_id, base, variant) => next.link(*delivery_id, base, *variant)?,
                TxOp::Unlink(delivery_id, base, variant) => next.unlink(*delivery_id, base, *variant)?,
            }
        }
        *live = next;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
