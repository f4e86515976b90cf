//! # registra-core: Pure Business Logic for Registra
//!
//! This crate is the **heart** of Registra. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Registra Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (API layer, desktop shell)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 registra-engine (Orchestration)                 │   │
//! │  │    SessionManager, PaymentProcessor, ZReportService, Mailer    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ registra-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌───────┐ ┌──────┐ ┌─────────┐ ┌────────┐        │   │
//! │  │   │ money  │ │  vat  │ │ cart │ │ session │ │ report │        │   │
//! │  │   │ Money  │ │VatRate│ │ Cart │ │  rules  │ │ZReport │        │   │
//! │  │   └────────┘ └───────┘ └──────┘ └─────────┘ └────────┘        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 registra-db (Persistence Adapter)               │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`vat`] - The closed set of supported VAT rates
//! - [`cart`] - Priced line items with derived money fields
//! - [`types`] - Domain types (Transaction, Payment, Session, etc.)
//! - [`session`] - Cash-register session state machine rules
//! - [`report`] - Z-report aggregation and text rendering
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are minor units (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use registra_core::money::Money;
//! use registra_core::vat::VatRate;
//!
//! // Create money from minor units (never from floats!)
//! let net = Money::from_minor(20000);
//!
//! // Standard rate, 27%
//! let tax = net.apply_vat(VatRate::Standard27);
//! assert_eq!(tax.minor(), 5400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod report;
pub mod session;
pub mod types;
pub mod validation;
pub mod vat;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use registra_core::Money` instead of
// `use registra_core::money::Money`

pub use cart::{Cart, CartLineItem, CartTotals, NewLineItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{build_z_report, render_text, CompanyInfo, ZReport};
pub use types::*;
pub use vat::VatRate;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line
///
/// Together with [`MAX_UNIT_PRICE_MINOR`] this bounds line math so every
/// rounded amount fits i64 with room to spare.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum unit price in minor currency units
pub const MAX_UNIT_PRICE_MINOR: i64 = 1_000_000_000;
