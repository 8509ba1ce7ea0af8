use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn class_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::get_classes))
        .route("/", post(handler::create_class))
        .route("/:class_id", put(handler::update_class))
        .route("/:class_id", delete(handler::delete_class))
}

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::get_students))
        .route("/", post(handler::create_student))
        .route("/:student_id", get(handler::get_student))
        .route("/:student_id", put(handler::update_student))
        .route("/:student_id", delete(handler::delete_student))
}
