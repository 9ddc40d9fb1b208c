pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryPropertyStore;
pub use postgres::PgPropertyStore;
pub use store::PropertyStore;
