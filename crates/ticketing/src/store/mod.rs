//! Store module exports

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::{OrderQuery, OrderStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
