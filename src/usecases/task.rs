// src/usecases/task.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        rbac::AccessLevel,
        task::{NewTask, Task},
    },
    services::{
        auth::{AccessOptions, AuthService},
        task_service::TaskService,
    },
};

#[derive(Clone)]
pub struct TaskUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    tasks: TaskService,
}

impl TaskUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, tasks: TaskService) -> Self {
        Self { db, auth, tasks }
    }

    #[tracing::instrument(skip_all, fields(unit_id = %input.unit_id))]
    pub async fn create_task(&self, identity: &RequestIdentity, input: NewTask) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self.tasks.create_task(&mut *tx, grant.org_id, grant.user_id, &input).await?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn get_task(&self, identity: &RequestIdentity, task_id: Uuid) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.tasks.get_task(&mut *tx, grant.org_id, task_id).await
    }

    pub async fn list_tasks(&self, identity: &RequestIdentity) -> Result<Vec<Task>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.tasks.list_tasks(&mut *tx, grant.org_id).await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn assign_task(
        &self,
        identity: &RequestIdentity,
        task_id: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self
            .tasks
            .assign_task(&mut *tx, grant.org_id, grant.user_id, task_id, assignee)
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn pick_instance_from_cell(
        &self,
        identity: &RequestIdentity,
        task_id: Uuid,
        instance_id: Uuid,
    ) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self
            .tasks
            .pick_instance_from_cell(&mut *tx, grant.org_id, grant.user_id, task_id, instance_id)
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn return_instance_to_cell(
        &self,
        identity: &RequestIdentity,
        task_id: Uuid,
        instance_id: Uuid,
        cell_id: Option<Uuid>,
    ) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self
            .tasks
            .return_instance_to_cell(&mut *tx, grant.org_id, grant.user_id, task_id, instance_id, cell_id)
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn complete_task(&self, identity: &RequestIdentity, task_id: Uuid) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self.tasks.complete_task(&mut *tx, grant.org_id, grant.user_id, task_id).await?;

        tx.commit().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn cancel_task(&self, identity: &RequestIdentity, task_id: Uuid) -> Result<Task, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let task = self.tasks.cancel_task(&mut *tx, grant.org_id, grant.user_id, task_id).await?;

        tx.commit().await?;
        Ok(task)
    }

    /// TV-board read path; the only operation that admits the system identity.
    pub async fn list_board_tasks(&self, identity: &RequestIdentity, unit_id: Uuid) -> Result<Vec<Task>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::BOARD)
            .await?
            .ensure_allowed()?;

        self.tasks.list_board_tasks(&mut *tx, grant.org_id, unit_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            audit::ObjectType,
            inventory::{ItemInstance, ItemInstanceStatus},
            rbac::RoleName,
            task::{NewTaskItem, TaskItemStatus, TaskStatus, TaskType},
        },
        services::{
            audit_service::AuditService,
            completion::{CompletionStrategies, PickCompletion},
            inventory_service::{fixtures::seed_instance, InventoryService},
            storage_service::{
                fixtures::{seed_warehouse, Warehouse},
                StorageService,
            },
        },
        usecases::testing::{Harness, JWT_SECRET},
    };

    struct Fixture {
        h: Harness,
        uc: TaskUseCase,
        wh: Warehouse,
        manager: RequestIdentity,
        picker: RequestIdentity,
    }

    async fn fixture_with(pick: PickCompletion) -> Fixture {
        let h = Harness::new();
        let org = h.org_id;
        let wh = h.db.with_state(|s| seed_warehouse(s, org, 1, 3)).await;
        let manager = h.employee(RoleName::Manager).await;
        // Worker level admits owner/admin/manager; pickers here hold the manager role.
        let picker = h.employee(RoleName::Manager).await;

        let audit = AuditService::new();
        let storage = StorageService::new();
        let inventory = InventoryService::new(audit.clone(), storage.clone());
        let tasks = TaskService::new(audit, inventory, storage, CompletionStrategies::new(pick));
        let uc = TaskUseCase::new(h.database(), AuthService::new(JWT_SECRET.into()), tasks);

        Fixture { h, uc, wh, manager, picker }
    }

    async fn fixture() -> Fixture {
        fixture_with(PickCompletion::Consume).await
    }

    impl Fixture {
        async fn instance_at(&self, cell: usize) -> Uuid {
            let org = self.h.org_id;
            let cell_id = self.wh.cell_ids[cell];
            self.h.db.with_state(|s| seed_instance(s, org, Some(cell_id))).await
        }

        async fn instance(&self, id: Uuid) -> ItemInstance {
            self.h
                .db
                .with_state(|s| s.instances.iter().find(|i| i.id == id).cloned())
                .await
                .unwrap()
        }

        fn new_task(&self, task_type: TaskType, items: Vec<NewTaskItem>) -> NewTask {
            NewTask {
                unit_id: self.wh.unit_id,
                name: "Restock aisle 3".into(),
                description: None,
                task_type,
                assigned_to_user_id: None,
                items,
            }
        }

        fn movement(&self, instance_id: Uuid, target: usize) -> NewTaskItem {
            NewTaskItem {
                instance_id,
                target_cell_id: Some(self.wh.cell_ids[target]),
            }
        }
    }

    #[tokio::test]
    async fn worker_cannot_create_task() {
        let f = fixture().await;
        let worker = f.h.employee(RoleName::Worker).await;
        let instance = f.instance_at(0).await;

        let err = f
            .uc
            .create_task(&worker, f.new_task(TaskType::Movement, vec![f.movement(instance, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(f.h.db.with_state(|s| s.tasks.is_empty()).await);
        assert_eq!(f.h.audit_count().await, 0);
    }

    #[tokio::test]
    async fn worker_role_fails_worker_level_checks() {
        let f = fixture().await;
        let worker = f.h.employee(RoleName::Worker).await;
        let err = f.uc.list_tasks(&worker).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn picking_the_only_item_makes_the_task_ready() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.items[0].source_cell_id, Some(f.wh.cell_ids[0]));

        let task = f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();

        let instance = f.instance(instance_id).await;
        assert_eq!(instance.cell_id, None);
        assert_eq!(instance.status, ItemInstanceStatus::Reserved);
        assert_eq!(instance.affected_by_task_id, Some(task.id));
        assert_eq!(task.items[0].status, TaskItemStatus::Picked);
        assert_eq!(task.status, TaskStatus::Ready);

        let instance_changes = f
            .h
            .db
            .with_state(|s| {
                s.object_changes
                    .iter()
                    .filter(|c| c.target_object_type == ObjectType::ItemInstance.id() && c.target_object_id == instance_id)
                    .count()
            })
            .await;
        assert_eq!(instance_changes, 2);
    }

    #[tokio::test]
    async fn partial_pick_leaves_task_in_progress() {
        let f = fixture().await;
        let (a, b) = (f.instance_at(0).await, f.instance_at(1).await);
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(a, 2), f.movement(b, 2)]))
            .await
            .unwrap();

        let task = f.uc.pick_instance_from_cell(&f.picker, task.id, a).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let task = f.uc.pick_instance_from_cell(&f.picker, task.id, b).await.unwrap();
        assert_eq!(task.status, TaskStatus::Ready);
    }

    #[tokio::test]
    async fn second_pick_is_rejected_without_side_effects() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();

        f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();
        let after_first = f.instance(instance_id).await;
        let audits = f.h.audit_count().await;

        let err = f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(f.instance(instance_id).await, after_first);
        assert_eq!(f.h.audit_count().await, audits);
    }

    #[tokio::test]
    async fn instance_reserved_by_another_task_cannot_be_picked() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let first = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        let second = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 2)]))
            .await
            .unwrap();

        f.uc.pick_instance_from_cell(&f.picker, first.id, instance_id).await.unwrap();
        let err = f.uc.pick_instance_from_cell(&f.picker, second.id, instance_id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(f.instance(instance_id).await.affected_by_task_id, Some(first.id));
    }

    #[tokio::test]
    async fn failed_audit_rolls_back_the_pick() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        let before = f.instance(instance_id).await;

        f.h.db.with_state(|s| s.fail_audit_writes = true).await;
        let err = f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        assert_eq!(f.instance(instance_id).await, before);
        let item_status = f.h.db.with_state(|s| s.task_items[0].status).await;
        assert_eq!(item_status, TaskItemStatus::Pending);
    }

    #[tokio::test]
    async fn completing_a_movement_task_shelves_at_target() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 2)]))
            .await
            .unwrap();

        let err = f.uc.complete_task(&f.picker, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();
        let task = f.uc.complete_task(&f.picker, task.id).await.unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert_eq!(task.items[0].status, TaskItemStatus::Done);
        let instance = f.instance(instance_id).await;
        assert_eq!(instance.cell_id, Some(f.wh.cell_ids[2]));
        assert_eq!(instance.status, ItemInstanceStatus::Available);
        assert_eq!(instance.affected_by_task_id, None);
    }

    #[tokio::test]
    async fn pick_task_completion_follows_configured_strategy() {
        for (mode, expected) in [
            (PickCompletion::Consume, ItemInstanceStatus::Consumed),
            (PickCompletion::Release, ItemInstanceStatus::Available),
        ] {
            let f = fixture_with(mode).await;
            let instance_id = f.instance_at(0).await;
            let item = NewTaskItem {
                instance_id,
                target_cell_id: None,
            };
            let task = f.uc.create_task(&f.manager, f.new_task(TaskType::Pick, vec![item])).await.unwrap();
            f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();
            f.uc.complete_task(&f.picker, task.id).await.unwrap();

            let instance = f.instance(instance_id).await;
            assert_eq!(instance.status, expected, "{mode:?}");
            assert_eq!(instance.cell_id, None);
        }
    }

    #[tokio::test]
    async fn returned_item_goes_back_and_stays_returned_on_completion() {
        let f = fixture().await;
        let (a, b) = (f.instance_at(0).await, f.instance_at(1).await);
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(a, 2), f.movement(b, 2)]))
            .await
            .unwrap();
        f.uc.pick_instance_from_cell(&f.picker, task.id, a).await.unwrap();
        f.uc.pick_instance_from_cell(&f.picker, task.id, b).await.unwrap();

        let task = f.uc.return_instance_to_cell(&f.picker, task.id, b, None).await.unwrap();
        assert_eq!(task.items[1].status, TaskItemStatus::Returned);
        let returned = f.instance(b).await;
        assert_eq!(returned.cell_id, Some(f.wh.cell_ids[1]));
        assert_eq!(returned.status, ItemInstanceStatus::Available);

        let task = f.uc.complete_task(&f.picker, task.id).await.unwrap();
        assert_eq!(task.items[0].status, TaskItemStatus::Done);
        assert_eq!(task.items[1].status, TaskItemStatus::Returned);
        assert_eq!(f.instance(b).await.cell_id, Some(f.wh.cell_ids[1]));
    }

    #[tokio::test]
    async fn task_with_every_item_returned_cannot_complete() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();
        f.uc.return_instance_to_cell(&f.picker, task.id, instance_id, None).await.unwrap();
        let audits = f.h.audit_count().await;

        let err = f.uc.complete_task(&f.picker, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(f.h.audit_count().await, audits);

        // still open, so it can be cancelled
        let task = f.uc.cancel_task(&f.manager, task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.items[0].status, TaskItemStatus::Returned);
        assert_eq!(f.instance(instance_id).await.status, ItemInstanceStatus::Available);
    }

    #[tokio::test]
    async fn cancel_puts_picked_instances_back() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap();

        let task = f.uc.cancel_task(&f.manager, task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        let instance = f.instance(instance_id).await;
        assert_eq!(instance.cell_id, Some(f.wh.cell_ids[0]));
        assert_eq!(instance.status, ItemInstanceStatus::Available);

        let err = f.uc.cancel_task(&f.manager, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        let err = f.uc.pick_instance_from_cell(&f.picker, task.id, instance_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn creation_validates_items() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;

        let cases = vec![
            f.new_task(TaskType::Movement, vec![]),
            f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1), f.movement(instance_id, 2)]),
            f.new_task(
                TaskType::Movement,
                vec![NewTaskItem {
                    instance_id,
                    target_cell_id: None,
                }],
            ),
            NewTask {
                name: "   ".into(),
                ..f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)])
            },
        ];
        for input in cases {
            let err = f.uc.create_task(&f.manager, input).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn creation_tolerates_unknown_instances_until_pick() {
        let f = fixture().await;
        let ghost = Uuid::new_v4();
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(ghost, 1)]))
            .await
            .unwrap();
        assert_eq!(task.items[0].source_cell_id, None);

        let err = f.uc.pick_instance_from_cell(&f.picker, task.id, ghost).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn tasks_are_invisible_to_other_organizations() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();

        let other = Harness { db: f.h.db.clone(), org_id: Uuid::new_v4() };
        let outsider = other.employee(RoleName::Owner).await;

        let err = f.uc.get_task(&outsider, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = f.uc.pick_instance_from_cell(&outsider, task.id, instance_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(f.uc.list_tasks(&outsider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assignment_requires_an_employee() {
        let f = fixture().await;
        let instance_id = f.instance_at(0).await;
        let task = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();

        let err = f.uc.assign_task(&f.manager, task.id, Some(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let assignee = f.picker.user_id;
        let task = f.uc.assign_task(&f.manager, task.id, assignee).await.unwrap();
        assert_eq!(task.assigned_to_user_id, assignee);
        assert!(task.assigned_at.is_some());
    }

    #[tokio::test]
    async fn board_shows_open_tasks_to_the_system_identity_only() {
        let f = fixture().await;
        let (a, b) = (f.instance_at(0).await, f.instance_at(1).await);
        let open = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(a, 2)]))
            .await
            .unwrap();
        let closed = f
            .uc
            .create_task(&f.manager, f.new_task(TaskType::Movement, vec![f.movement(b, 2)]))
            .await
            .unwrap();
        f.uc.cancel_task(&f.manager, closed.id).await.unwrap();

        let board = RequestIdentity::system(f.h.org_id);
        let tasks = f.uc.list_board_tasks(&board, f.wh.unit_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, open.id);
        assert_eq!(tasks[0].items.len(), 1);

        let err = f.uc.list_tasks(&board).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn api_token_drives_tasks_without_a_user() {
        let f = fixture().await;
        let token = f.h.api_token("svc", false).await;
        let instance_id = f.instance_at(0).await;

        let task = f
            .uc
            .create_task(&token, f.new_task(TaskType::Movement, vec![f.movement(instance_id, 1)]))
            .await
            .unwrap();
        f.uc.pick_instance_from_cell(&token, task.id, instance_id).await.unwrap();
        assert_eq!(f.uc.list_tasks(&token).await.unwrap().len(), 1);

        let users = f.h.db.with_state(|s| s.object_changes.iter().map(|c| c.user_id).collect::<Vec<_>>()).await;
        assert!(!users.is_empty());
        assert!(users.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn revoked_token_is_not_authorized() {
        let f = fixture().await;
        let token = f.h.api_token("old", true).await;
        let err = f.uc.list_tasks(&token).await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized));
    }
}
