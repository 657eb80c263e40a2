//! Storage for chain projections.
//!
//! - [`UtxoRecord`] and [`OrderRecord`]: projected outputs keyed by creation slot
//! - [`ProjectionCheckpoint`]: the last block each projection committed
//! - [`ProjectionStore`] / [`UnitOfWork`]: the atomic read/write seam projectors use
//! - [`InMemoryProjectionStore`] and [`PostgresProjectionStore`] backends

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use checkpoint::ProjectionCheckpoint;
pub use error::{Result, StoreError};
pub use memory::InMemoryProjectionStore;
pub use postgres::PostgresProjectionStore;
pub use record::{OrderRecord, OrderStatus, OrderTerms, RecordKey, UtxoRecord, UtxoStatus};
pub use store::{ProjectionStore, UnitOfWork};
