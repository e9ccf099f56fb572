//! Infrastructure Database Layer
//!
//! This crate provides the database infrastructure for the receivables
//! engine on PostgreSQL using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern, providing data access
//! abstractions that hide the database implementation details from the
//! domain layer. Invoice writes serialize on the invoice row so that
//! concurrent payment applications cannot lose updates.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, ReceivablesRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/receivables")).await?;
//! let repo = ReceivablesRepository::new(pool);
//! ```

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::ReceivablesRepository;
