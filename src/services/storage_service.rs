// src/services/storage_service.rs

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Transaction,
    models::storage::{Cell, CellPathObjectType, CellPathSegment, OrganizationUnit},
};

// Deeper than any real warehouse; guards against a parent cycle.
const MAX_STORAGE_DEPTH: usize = 32;

#[derive(Clone, Default)]
pub struct StorageService;

impl StorageService {
    pub fn new() -> Self {
        Self
    }

    pub async fn require_unit(&self, tx: &mut dyn Transaction, org_id: Uuid, unit_id: Uuid) -> Result<OrganizationUnit, AppError> {
        tx.find_unit(org_id, unit_id)
            .await?
            .ok_or_else(|| AppError::not_found("unit"))
    }

    pub async fn require_cell(&self, tx: &mut dyn Transaction, org_id: Uuid, cell_id: Uuid) -> Result<Cell, AppError> {
        tx.find_cell(org_id, cell_id)
            .await?
            .ok_or_else(|| AppError::not_found("cell"))
    }

    /// Breadcrumb for a cell: unit, storage groups outermost first, then the
    /// cells group. Computed on every call from the current hierarchy.
    #[tracing::instrument(skip(self, tx))]
    pub async fn get_cell_path(&self, tx: &mut dyn Transaction, org_id: Uuid, cell_id: Uuid) -> Result<Vec<CellPathSegment>, AppError> {
        // 1. Cell and its cells group
        let cell = self.require_cell(tx, org_id, cell_id).await?;
        let cells_group = tx
            .find_cells_group(org_id, cell.cells_group_id)
            .await?
            .ok_or_else(|| AppError::not_found("cells group"))?;

        // 2. Storage groups, innermost first while walking up
        let mut groups = Vec::new();
        let mut seen = HashSet::new();
        let mut next = cells_group.storage_group_id;
        while let Some(group_id) = next {
            if !seen.insert(group_id) || seen.len() > MAX_STORAGE_DEPTH {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "storage group hierarchy above {group_id} is cyclic or too deep"
                )));
            }
            let group = tx
                .find_storage_group(org_id, group_id)
                .await?
                .ok_or_else(|| AppError::not_found("storage group"))?;
            next = group.parent_id;
            groups.push(group);
        }

        // 3. Unit
        let unit = self.require_unit(tx, org_id, cells_group.unit_id).await?;

        let mut path = Vec::with_capacity(groups.len() + 2);
        path.push(CellPathSegment {
            id: unit.id,
            name: unit.name,
            alias: unit.alias,
            object_type: CellPathObjectType::Unit,
        });
        path.extend(groups.into_iter().rev().map(|g| CellPathSegment {
            id: g.id,
            name: g.name,
            alias: g.alias,
            object_type: CellPathObjectType::StorageGroup,
        }));
        path.push(CellPathSegment {
            id: cells_group.id,
            name: cells_group.name,
            alias: cells_group.alias,
            object_type: CellPathObjectType::CellsGroup,
        });

        Ok(path)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::seed_warehouse;
    use super::*;
    use crate::db::{Database, MemoryDatabase};

    #[tokio::test]
    async fn path_of_nested_cell_is_unit_first() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        let wh = db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;

        let mut tx = db.begin().await.unwrap();
        let path = StorageService::new()
            .get_cell_path(&mut *tx, org, wh.cell_ids[0])
            .await
            .unwrap();

        assert_eq!(path.len(), 3);
        assert_eq!(path[0].id, wh.unit_id);
        assert_eq!(path[0].object_type, CellPathObjectType::Unit);
        assert_eq!(path[1].id, wh.storage_group_ids[0]);
        assert_eq!(path[1].object_type, CellPathObjectType::StorageGroup);
        assert_eq!(path[2].id, wh.cells_group_id);
        assert_eq!(path[2].object_type, CellPathObjectType::CellsGroup);
    }

    #[tokio::test]
    async fn storage_groups_are_listed_outermost_first() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        let wh = db.with_state(|s| seed_warehouse(s, org, 3, 1)).await;

        let mut tx = db.begin().await.unwrap();
        let path = StorageService::new()
            .get_cell_path(&mut *tx, org, wh.cell_ids[0])
            .await
            .unwrap();

        let groups: Vec<Uuid> = path[1..4].iter().map(|s| s.id).collect();
        assert_eq!(groups, wh.storage_group_ids);
    }

    #[tokio::test]
    async fn path_reflects_restructuring_between_calls() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        let wh = db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;
        let service = StorageService::new();

        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(service.get_cell_path(&mut *tx, org, wh.cell_ids[0]).await.unwrap().len(), 3);
        }

        db.with_state(|s| s.cells_groups[0].storage_group_id = None).await;

        let mut tx = db.begin().await.unwrap();
        assert_eq!(service.get_cell_path(&mut *tx, org, wh.cell_ids[0]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cell_of_another_org_is_not_found() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        let wh = db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;

        let mut tx = db.begin().await.unwrap();
        let err = StorageService::new()
            .get_cell_path(&mut *tx, Uuid::new_v4(), wh.cell_ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
