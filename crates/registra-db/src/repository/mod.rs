//! # Repository Implementations
//!
//! SQLite implementations of the registra-engine repository contracts.
//!
//! Runtime queries with explicit row mapping; every mapper lives next
//! to the repository that owns the table. Decode failures surface as
//! `DbError::CorruptRow` naming the table, never as panics.

pub mod payment;
pub mod session;
pub mod transaction;

pub use payment::SqlitePaymentRepository;
pub use session::SqliteSessionRepository;
pub use transaction::SqliteTransactionRepository;
