// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{Database, PgDatabase},
    services::{
        audit_service::AuditService,
        auth::AuthService,
        completion::{CompletionStrategies, PickCompletion},
        inventory_service::InventoryService,
        storage_service::StorageService,
        task_service::TaskService,
    },
    usecases::{ApiTokenUseCase, AuditUseCase, EmployeeUseCase, ItemUseCase, TaskUseCase, TvBoardUseCase},
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub pick_completion: PickCompletion,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}"))?,
            Err(_) => 5,
        };
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let pick_completion = match env::var("PICK_COMPLETION") {
            Ok(raw) => raw.parse()?,
            Err(_) => PickCompletion::default(),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            log_level,
            pick_completion,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub employees: EmployeeUseCase,
    pub api_tokens: ApiTokenUseCase,
    pub items: ItemUseCase,
    pub tasks: TaskUseCase,
    pub tv_boards: TvBoardUseCase,
    pub audit: AuditUseCase,
}

impl AppState {
    /// Connects to PostgreSQL, runs pending migrations and wires the use cases.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;
        tracing::info!("database connection established");

        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to run database migrations")?;
        tracing::info!("database migrations applied");

        Ok(Self::with_database(
            Arc::new(PgDatabase::new(pool)),
            config.jwt_secret.clone(),
            config.pick_completion,
        ))
    }

    // --- Dependency graph ---
    pub fn with_database(db: Arc<dyn Database>, jwt_secret: String, pick: PickCompletion) -> Self {
        let auth_service = AuthService::new(jwt_secret);
        let audit = AuditService::new();
        let storage = StorageService::new();
        let inventory = InventoryService::new(audit.clone(), storage.clone());
        let tasks = TaskService::new(
            audit.clone(),
            inventory.clone(),
            storage.clone(),
            CompletionStrategies::new(pick),
        );

        Self {
            employees: EmployeeUseCase::new(db.clone(), auth_service.clone(), audit.clone()),
            api_tokens: ApiTokenUseCase::new(db.clone(), auth_service.clone(), audit.clone()),
            items: ItemUseCase::new(db.clone(), auth_service.clone(), inventory, storage.clone()),
            tasks: TaskUseCase::new(db.clone(), auth_service.clone(), tasks),
            tv_boards: TvBoardUseCase::new(db.clone(), auth_service.clone(), audit.clone(), storage),
            audit: AuditUseCase::new(db, auth_service.clone(), audit),
            auth_service,
        }
    }
}
