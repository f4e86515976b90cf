//! # registra-db: SQLite Persistence for Registra
//!
//! Implements the registra-engine repository contracts on SQLite using
//! sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  registra-engine                                                        │
//! │    SessionRepository / TransactionRepository / PaymentRepository        │
//! │       │ (async traits)                                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   registra-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ session.rs    │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ transaction.rs│    │ 0001_init.sql│  │   │
//! │  │   │  WAL, FK on   │    │ payment.rs    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: in tests)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use registra_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/registra.db")).await?;
//! let sessions = db.sessions(); // implements SessionRepository
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    SqlitePaymentRepository, SqliteSessionRepository, SqliteTransactionRepository,
};
