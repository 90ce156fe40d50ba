// src/handlers.rs

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::config::AppState;

pub mod audit;
pub mod inventory;
pub mod rbac;
pub mod tasks;
pub mod tv_boards;

pub fn router(app_state: AppState) -> Router {
    let employee_routes = Router::new()
        .route("/", get(rbac::list_employees))
        .route("/{user_id}", get(rbac::get_employee).delete(rbac::remove_employee))
        .route("/{user_id}/role", put(rbac::set_employee_role));

    let api_token_routes = Router::new()
        .route("/", post(rbac::create_api_token).get(rbac::list_api_tokens))
        .route("/{id}/revoke", post(rbac::revoke_api_token));

    let inventory_routes = Router::new()
        .route("/api/items", post(inventory::create_item).get(inventory::list_items))
        .route("/api/items/{id}", get(inventory::get_item))
        .route(
            "/api/items/{id}/instances",
            post(inventory::create_item_instance).get(inventory::list_item_instances),
        )
        .route("/api/instances/{id}", get(inventory::get_item_instance))
        .route("/api/cells/{id}/path", get(inventory::get_cell_path));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task).get(tasks::list_tasks))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/assignee", put(tasks::assign_task))
        .route("/{id}/pick", post(tasks::pick_instance))
        .route("/{id}/return", post(tasks::return_instance))
        .route("/{id}/complete", post(tasks::complete_task))
        .route("/{id}/cancel", post(tasks::cancel_task));

    let tv_board_routes = Router::new()
        .route("/", post(tv_boards::create_tv_board).get(tv_boards::list_tv_boards))
        .route("/{id}", get(tv_boards::get_tv_board).delete(tv_boards::delete_tv_board));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/roles", get(rbac::list_roles))
        .nest("/api/employees", employee_routes)
        .nest("/api/api-tokens", api_token_routes)
        .merge(inventory_routes)
        .nest("/api/tasks", task_routes)
        .nest("/api/tv-boards", tv_board_routes)
        .route("/api/board/tasks", get(tasks::list_board_tasks))
        .route("/api/audit/{object_type}/{object_id}", get(audit::get_object_changes))
        .with_state(app_state)
}
