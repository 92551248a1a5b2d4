//! SQLite persistence

pub mod booking_repository;
pub mod manager;
pub mod refund_repository;
mod rows;
pub mod slot_lock_ledger;

pub use booking_repository::{SqliteBookingRepository, SqliteCheckoutRepository};
pub use manager::{DbConnection, DbManager};
pub use refund_repository::SqliteRefundRepository;
pub use slot_lock_ledger::SqliteSlotLockLedger;
