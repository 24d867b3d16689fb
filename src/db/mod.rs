//! Database layer
//!
//! SQLite is the default backend; MySQL is selected through
//! `database.driver`. Both sit behind the [`DatabasePool`] trait so services
//! and handlers never see the concrete driver.
//!
//! ```ignore
//! let pool = db::create_pool(&config.database).await?;
//! db::migrations::run_migrations(&pool).await?;
//! let users = SqlxUserRepository::boxed(pool.clone());
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Returns true if a unique constraint violation from the database appears
/// anywhere in the error chain.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}

/// Returns true if a foreign key violation from the database appears anywhere
/// in the error chain.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation()
        )
    })
}
