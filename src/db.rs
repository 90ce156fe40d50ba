// src/db.rs
//
// Storage collaborator. Every read and write goes through a `Transaction`
// opened from a `Database`; the per-area repository traits are supertraits
// of `Transaction`, so one unit of work can touch tasks, instances and the
// audit log atomically. Dropping a transaction without `commit` rolls it back.

use async_trait::async_trait;

use crate::common::error::AppError;

pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod storage_repo;
pub use storage_repo::StorageRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
pub mod tv_board_repo;
pub use tv_board_repo::TvBoardRepository;

pub mod memory;
pub use memory::MemoryDatabase;
pub mod postgres;
pub use postgres::PgDatabase;

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError>;
}

#[async_trait]
pub trait Transaction:
    RbacRepository
    + InventoryRepository
    + StorageRepository
    + TaskRepository
    + TvBoardRepository
    + AuditRepository
    + Send
{
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
