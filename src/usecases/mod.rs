// src/usecases/mod.rs
//
// Entry points called by the HTTP handlers. Each public method opens one
// transaction, passes the access gate inside it, and only then reads or
// mutates anything.

pub mod api_token;
pub mod audit;
pub mod employee;
pub mod item;
pub mod task;
pub mod tv_board;

pub use api_token::ApiTokenUseCase;
pub use audit::AuditUseCase;
pub use employee::EmployeeUseCase;
pub use item::ItemUseCase;
pub use task::TaskUseCase;
pub use tv_board::TvBoardUseCase;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::{
        common::identity::RequestIdentity,
        db::MemoryDatabase,
        models::rbac::{ApiToken, Employee, RoleName},
    };

    pub const JWT_SECRET: &str = "test-secret";

    /// One organization in a fresh in-memory store.
    pub struct Harness {
        pub db: MemoryDatabase,
        pub org_id: Uuid,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                db: MemoryDatabase::new(),
                org_id: Uuid::new_v4(),
            }
        }

        pub fn database(&self) -> Arc<dyn crate::db::Database> {
            Arc::new(self.db.clone())
        }

        /// Adds an employee with `role` and returns their identity.
        pub async fn employee(&self, role: RoleName) -> RequestIdentity {
            let user_id = Uuid::new_v4();
            let org_id = self.org_id;
            self.db
                .with_state(|s| {
                    s.employees.push(Employee {
                        org_id,
                        user_id,
                        role_id: role.id(),
                        created_at: Utc::now(),
                    })
                })
                .await;
            RequestIdentity::user(org_id, user_id)
        }

        pub async fn api_token(&self, secret: &str, revoked: bool) -> RequestIdentity {
            let org_id = self.org_id;
            let token = ApiToken {
                id: Uuid::new_v4(),
                org_id,
                name: "integration".into(),
                token: secret.into(),
                created_at: Utc::now(),
                revoked_at: revoked.then(Utc::now),
            };
            self.db.with_state(|s| s.api_tokens.push(token)).await;
            RequestIdentity::api_token(org_id, secret)
        }

        pub async fn audit_count(&self) -> usize {
            self.db.with_state(|s| s.object_changes.len()).await
        }
    }
}
