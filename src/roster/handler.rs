//! HTTP handlers for class and student administration.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use super::{ClassInput, Roster, StudentInput};
use crate::api::{Ack, ClassesResponse, StudentsResponse};
use crate::error::{AppError, AppResult};
use crate::handler::AppState;

pub async fn get_classes(State(state): State<AppState>) -> AppResult<Response> {
    let classes = Roster::new(&state.db).list_classes().await?;
    Ok(Json(ClassesResponse { classes }).into_response())
}

pub async fn create_class(
    State(state): State<AppState>,
    Json(payload): Json<ClassInput>,
) -> AppResult<Response> {
    Roster::new(&state.db).create_class(payload).await?;
    Ok(Json(Ack::new("New class created")).into_response())
}

pub async fn update_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    Json(payload): Json<ClassInput>,
) -> AppResult<Response> {
    Roster::new(&state.db).update_class(class_id, payload).await?;
    Ok(Json(Ack::new(format!("Class id={class_id} updated"))).into_response())
}

pub async fn delete_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> AppResult<Response> {
    let avatar_urls = Roster::new(&state.db).delete_class(class_id).await?;
    remove_avatars(&state, avatar_urls).await;
    Ok(Json(Ack::new(format!("Class id={class_id} deleted"))).into_response())
}

pub async fn get_students(State(state): State<AppState>) -> AppResult<Response> {
    let students = Roster::new(&state.db).list_students().await?;
    Ok(Json(StudentsResponse { students }).into_response())
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> AppResult<Response> {
    let student = Roster::new(&state.db)
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student id={student_id} not found")))?;
    Ok(Json(student).into_response())
}

pub async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<StudentInput>,
) -> AppResult<Response> {
    Roster::new(&state.db).create_student(payload).await?;
    Ok(Json(Ack::new("New student created")).into_response())
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    Json(payload): Json<StudentInput>,
) -> AppResult<Response> {
    Roster::new(&state.db)
        .update_student(student_id, payload)
        .await?;
    Ok(Json(Ack::new(format!("Student id={student_id} updated"))).into_response())
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> AppResult<Response> {
    let avatar_url = Roster::new(&state.db).delete_student(student_id).await?;
    remove_avatars(&state, avatar_url).await;
    Ok(Json(Ack::new(format!("Student id={student_id} deleted"))).into_response())
}

/// Avatar files are a best-effort side effect: the rows are already gone, a
/// failure here only leaves an orphaned file behind.
async fn remove_avatars(state: &AppState, urls: impl IntoIterator<Item = String>) {
    for url in urls {
        let Some(filename) = url.rsplit('/').next() else {
            continue;
        };
        if let Err(e) = state.avatars.delete(filename).await {
            tracing::warn!(url = %url, error = %e, "failed to remove avatar file");
        }
    }
}
