pub mod audit;
pub mod auth;
pub mod inventory;
pub mod rbac;
pub mod storage;
pub mod task;
pub mod tv_board;
