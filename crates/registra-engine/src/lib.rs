//! # registra-engine: Session, Payment and Reporting Engine
//!
//! The stateful orchestration layer of Registra. registra-core holds the
//! pure rules; this crate applies them against repositories and external
//! collaborators, under per-entity locks.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        registra-engine                                  │
//! │                                                                         │
//! │   ┌────────────────┐ ┌──────────────────┐ ┌────────────────────────┐   │
//! │   │ SessionManager │ │ PaymentProcessor │ │ ZReportService/Mailer  │   │
//! │   └───────┬────────┘ └────────┬─────────┘ └──────────┬─────────────┘   │
//! │           │ LockRegistry (per location / transaction) │                 │
//! │           ▼                   ▼                       ▼                 │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │ repository traits          │ collaborator traits                │  │
//! │   │ Session/Transaction/Payment│ CardGateway, InventoryService,     │  │
//! │   │ (registra-db or memory)    │ AuditLog, PdfRenderer, Mail        │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - Session lifecycle (open/suspend/resume/close/review)
//! - [`payment`] - Settlement, void/refund and the stock-deduction saga
//! - [`report`] - Z-report generation and export
//! - [`mailer`] - Bounded-retry report delivery with escalation
//! - [`repository`] - Persistence contracts
//! - [`memory`] - In-memory repository doubles
//! - [`locks`] - Per-key async mutex registry
//! - [`gateway`], [`inventory`], [`audit`], [`pdf`] - Collaborator seams

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod locks;
pub mod mailer;
pub mod memory;
pub mod payment;
pub mod pdf;
pub mod report;
pub mod repository;
pub mod session;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{AuditEntry, AuditLog, TracingAuditLog};
pub use error::{EngineError, EngineResult, RepoError, RepoResult};
pub use gateway::{CardGateway, GatewayCharge, GatewayError};
pub use inventory::{DeductionReport, InventoryError, InventoryService, StockDeduction};
pub use locks::LockRegistry;
pub use mailer::{AdminNotifier, MailTransport, ReportMailer};
pub use payment::{PartialOutcome, PaymentProcessor, SettlementOutcome, TenderInput};
pub use pdf::{PdfError, PdfRenderer};
pub use report::ZReportService;
pub use repository::{PaymentRepository, SessionRepository, TransactionRepository};
pub use session::SessionManager;
