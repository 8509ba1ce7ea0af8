use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/book", get(handler::get_books))
        .route("/book", post(handler::create_book))
        .route("/book/:book_id", put(handler::update_book))
        .route("/book/:book_id", delete(handler::delete_book))
        .route("/book/:book_id/student_options", get(handler::student_options))
        .route("/book/:book_id/borrow_records", get(handler::book_borrow_records))
        .route("/borrow_records", get(handler::get_borrow_records))
        .route("/borrow_records", post(handler::lend))
        .route("/borrow_records/:record_id", put(handler::return_book))
        .route("/unreturned_borrow_records", get(handler::unreturned))
        .route("/borrow_report", get(handler::borrow_report))
}
