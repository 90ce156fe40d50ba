// src/db/rbac_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::rbac::{ApiToken, Employee, Role};

#[async_trait]
pub trait RbacRepository {
    async fn list_roles(&mut self) -> Result<Vec<Role>, AppError>;

    async fn find_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<Option<Employee>, AppError>;

    async fn list_employees(&mut self, org_id: Uuid) -> Result<Vec<Employee>, AppError>;

    /// Creates the binding or replaces the role of an existing one.
    async fn upsert_employee_role(&mut self, org_id: Uuid, user_id: Uuid, role_id: i32) -> Result<Employee, AppError>;

    /// Deletes the role binding only; the user itself is untouched.
    async fn delete_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Organization owning a non-revoked token.
    async fn find_org_by_api_token(&mut self, token: &str) -> Result<Option<Uuid>, AppError>;

    async fn insert_api_token(&mut self, org_id: Uuid, name: &str, token: &str) -> Result<ApiToken, AppError>;

    async fn list_api_tokens(&mut self, org_id: Uuid) -> Result<Vec<ApiToken>, AppError>;

    async fn find_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ApiToken>, AppError>;

    async fn revoke_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<ApiToken, AppError>;
}

#[async_trait]
impl RbacRepository for PgTransaction {
    async fn list_roles(&mut self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, display_name, description FROM app_role ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(roles)
    }

    async fn find_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT org_id, user_id, role_id, created_at
            FROM app_employee
            WHERE org_id = $1 AND user_id = $2
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(employee)
    }

    async fn list_employees(&mut self, org_id: Uuid) -> Result<Vec<Employee>, AppError> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT org_id, user_id, role_id, created_at
            FROM app_employee
            WHERE org_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(employees)
    }

    async fn upsert_employee_role(&mut self, org_id: Uuid, user_id: Uuid, role_id: i32) -> Result<Employee, AppError> {
        sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO app_employee (org_id, user_id, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (org_id, user_id) DO UPDATE SET role_id = EXCLUDED.role_id
            RETURNING org_id, user_id, role_id, created_at
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_db(e, "employee"))
    }

    async fn delete_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM app_employee WHERE org_id = $1 AND user_id = $2")
            .bind(org_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_org_by_api_token(&mut self, token: &str) -> Result<Option<Uuid>, AppError> {
        let org_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT org_id FROM app_api_token WHERE token = $1 AND revoked_at IS NULL",
        )
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(org_id)
    }

    async fn insert_api_token(&mut self, org_id: Uuid, name: &str, token: &str) -> Result<ApiToken, AppError> {
        sqlx::query_as::<_, ApiToken>(
            r#"
            INSERT INTO app_api_token (org_id, name, token)
            VALUES ($1, $2, $3)
            RETURNING id, org_id, name, token, created_at, revoked_at
            "#,
        )
        .bind(org_id)
        .bind(name)
        .bind(token)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_db(e, "api token"))
    }

    async fn list_api_tokens(&mut self, org_id: Uuid) -> Result<Vec<ApiToken>, AppError> {
        let tokens = sqlx::query_as::<_, ApiToken>(
            r#"
            SELECT id, org_id, name, token, created_at, revoked_at
            FROM app_api_token
            WHERE org_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(org_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(tokens)
    }

    async fn find_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ApiToken>, AppError> {
        let token = sqlx::query_as::<_, ApiToken>(
            r#"
            SELECT id, org_id, name, token, created_at, revoked_at
            FROM app_api_token
            WHERE org_id = $1 AND id = $2
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(token)
    }

    async fn revoke_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<ApiToken, AppError> {
        // COALESCE keeps the first revocation timestamp.
        sqlx::query_as::<_, ApiToken>(
            r#"
            UPDATE app_api_token
            SET revoked_at = COALESCE(revoked_at, now())
            WHERE org_id = $1 AND id = $2
            RETURNING id, org_id, name, token, created_at, revoked_at
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_db(e, "api token"))
    }
}
