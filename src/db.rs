pub mod store;
pub use store::{CountingStore, InventoryStore};
pub mod counting_repo;
pub use counting_repo::CountingRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
