//! Database layer
//!
//! SQLite persistence for universities, colleges, programs, FAQs and forms.
//! Repositories receive a `DynDatabasePool` and borrow the underlying
//! `SqlitePool` for their queries.
//!
//! # Usage
//!
//! ```ignore
//! use unicms::config::DatabaseConfig;
//! use unicms::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
