//! HTTP handlers for the library API: book inventory and the borrow ledger.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::report::build_report;
use super::{BookInput, LendRequest, Library, ReturnRequest};
use crate::api::{Ack, BooksResponse, BorrowRecordsResponse, UnreturnedResponse};
use crate::error::AppResult;
use crate::handler::AppState;
use crate::roster::Roster;

pub async fn get_books(State(state): State<AppState>) -> AppResult<Response> {
    let books = Library::new(&state.db).list_books().await?;
    Ok(Json(BooksResponse { books }).into_response())
}

pub async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<BookInput>,
) -> AppResult<Response> {
    let book = Library::new(&state.db).create_book(payload).await?;
    tracing::info!(book_id = book.id, "created book");
    Ok(Json(Ack::new("New Book created")).into_response())
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Json(payload): Json<BookInput>,
) -> AppResult<Response> {
    Library::new(&state.db).update_book(book_id, payload).await?;
    Ok(Json(Ack::new(format!("Book id={book_id} updated"))).into_response())
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> AppResult<Response> {
    Library::new(&state.db).delete_book(book_id).await?;
    Ok(Json(Ack::new(format!("Book id={book_id} deleted"))).into_response())
}

pub async fn lend(
    State(state): State<AppState>,
    Json(payload): Json<LendRequest>,
) -> AppResult<Response> {
    let (book_id, borrower_id) = (payload.book_id, payload.borrower_id);
    Library::new(&state.db).lend(payload).await?;
    tracing::info!(book_id, borrower_id, "lent book");
    Ok(Json(Ack::new("New BorrowRecord created")).into_response())
}

pub async fn return_book(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
    Json(payload): Json<ReturnRequest>,
) -> AppResult<Response> {
    Library::new(&state.db).return_book(record_id, payload).await?;
    tracing::info!(record_id, "returned book");
    Ok(Json(Ack::new("Book returned")).into_response())
}

pub async fn student_options(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> AppResult<Response> {
    let options = Library::new(&state.db).student_options(book_id).await?;
    Ok(Json(options).into_response())
}

pub async fn book_borrow_records(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> AppResult<Response> {
    let borrow_records = Library::new(&state.db).history_by_book(book_id).await?;
    Ok(Json(BorrowRecordsResponse { borrow_records }).into_response())
}

pub async fn get_borrow_records(State(state): State<AppState>) -> AppResult<Response> {
    let borrow_records = Library::new(&state.db).all_records().await?;
    Ok(Json(BorrowRecordsResponse { borrow_records }).into_response())
}

pub async fn unreturned(State(state): State<AppState>) -> AppResult<Response> {
    let unreturned_books = Library::new(&state.db)
        .unreturned(Utc::now().date_naive())
        .await?;
    Ok(Json(UnreturnedResponse { unreturned_books }).into_response())
}

pub async fn borrow_report(State(state): State<AppState>) -> AppResult<Response> {
    let library = Library::new(&state.db);
    let books = library.list_books().await?;
    let students: Vec<_> = Roster::new(&state.db)
        .list_students()
        .await?
        .into_iter()
        .map(|s| s.student)
        .collect();
    let records: Vec<_> = library
        .all_records()
        .await?
        .into_iter()
        .map(|e| e.record)
        .collect();

    let report = build_report(&books, &students, &records, Utc::now().date_naive());
    Ok(Json(report).into_response())
}
