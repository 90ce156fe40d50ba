// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::common::error::AppError;
use crate::db::{Database, Transaction};

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A live Postgres transaction. sqlx rolls back on drop, so a cancelled
/// request never commits half of a workflow step.
pub struct PgTransaction {
    pub(crate) tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
