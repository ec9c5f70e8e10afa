pub mod memory;
pub mod pool;
pub mod queries;
pub mod repository;

pub use memory::InMemoryOrderStore;
pub use pool::create_pool;
pub use queries::{PgOrderRepository, PgOrderTransaction};
pub use repository::{OrderRepository, OrderTransaction};
