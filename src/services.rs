// src/services.rs

pub mod access_policy;
pub mod audit_service;
pub mod auth;
pub mod completion;
pub mod inventory_service;
pub mod storage_service;
pub mod task_service;
