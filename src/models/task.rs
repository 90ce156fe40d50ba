// src/models/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Pick,
    Movement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Ready,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// pending -> in_progress -> ready -> completed, cancelled from any
    /// non-terminal state. pending -> ready covers a single-item task whose
    /// only item is picked.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, InProgress) | (Pending, Ready) => true,
            (InProgress, Ready) => true,
            (Ready, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskItemStatus {
    Pending,
    Picked,
    Done,
    Returned,
}

impl TaskItemStatus {
    /// Monotonic: pending -> picked -> done, or picked -> returned.
    pub fn can_transition_to(self, next: TaskItemStatus) -> bool {
        use TaskItemStatus::*;
        matches!((self, next), (Pending, Picked) | (Picked, Done) | (Picked, Returned))
    }
}

// --- Entities ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub org_id: Uuid,
    pub unit_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub assigned_to_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<TaskItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub task_id: Uuid,
    pub instance_id: Uuid,
    pub source_cell_id: Option<Uuid>,
    pub target_cell_id: Option<Uuid>,
    pub status: TaskItemStatus,
    pub position: i32,
}

// --- Inputs ---

#[derive(Debug, Clone)]
pub struct NewTask {
    pub unit_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub assigned_to_user_id: Option<Uuid>,
    pub items: Vec<NewTaskItem>,
}

#[derive(Debug, Clone)]
pub struct NewTaskItem {
    pub instance_id: Uuid,
    pub target_cell_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_admit_no_transition() {
        for next in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Ready,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert!(!TaskStatus::Completed.can_transition_to(next));
            assert!(!TaskStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn cancel_allowed_from_every_open_state() {
        for from in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Ready] {
            assert!(from.can_transition_to(TaskStatus::Cancelled));
        }
    }

    #[test]
    fn completion_requires_ready() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Ready.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn task_item_status_never_goes_back() {
        use TaskItemStatus::*;
        assert!(Pending.can_transition_to(Picked));
        assert!(Picked.can_transition_to(Done));
        assert!(Picked.can_transition_to(Returned));
        assert!(!Picked.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Picked));
        assert!(!Returned.can_transition_to(Picked));
        assert!(!Pending.can_transition_to(Done));
    }
}
